//! Error types for the HTTP layer and the user-facing failure shape.
//!
//! ERROR HANDLING
//! ==============
//! `ApiError` is what the transport and interceptor pipeline produce. It is
//! `Clone` so a single refresh failure can be handed to every request that was
//! waiting on that refresh.
//!
//! Session operations never surface `ApiError` directly: they convert it into
//! a [`Failure`] carrying a human-readable message (and, for validation
//! errors, the server's detail list) so callers can render it inline.

use serde::Serialize;
use serde_json::Value;

use crate::credentials::StoreError;

/// Message shown when the server could not be reached at all.
pub const UNREACHABLE_MESSAGE: &str = "Unable to reach the server";

// =============================================================================
// API ERROR
// =============================================================================

/// Errors produced by the HTTP client pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, connect, reset...).
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("server returned status {status}")]
    Status { status: u16, body: String },

    /// A request body could not be serialized.
    #[error("request encode failed: {0}")]
    Encode(String),

    /// A success response body could not be deserialized.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// The credential store could not be read or written.
    #[error("credential store error: {0}")]
    Store(String),

    /// The session was signed out or replaced while a token refresh was in
    /// flight; the refreshed pair was discarded.
    #[error("session changed during token refresh")]
    SessionChanged,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    /// HTTP status of the failed response, if the server produced one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the server rejected the request's credentials (HTTP 401).
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Parse the error body as JSON, if there is one.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        match self {
            Self::Status { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

// =============================================================================
// FAILURE
// =============================================================================

/// User-facing failure returned by every session operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Human-readable message, safe to render as-is.
    pub message: String,
    /// Field-level validation details, passed through from the server untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Value>>,
}

/// Result shape of session operations: `Ok` payload or a renderable [`Failure`].
pub type Outcome<T> = Result<T, Failure>;

impl Failure {
    /// Failure with a message and no details.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), details: None }
    }

    /// Convert a pipeline error into a renderable failure.
    ///
    /// Server bodies of the form `{"error": "...", "details": [...]}` (or
    /// `{"message": "..."}`) provide the message; anything else falls back to
    /// `fallback`. Transport errors always use [`UNREACHABLE_MESSAGE`].
    #[must_use]
    pub fn from_api(err: &ApiError, fallback: &str) -> Self {
        if matches!(err, ApiError::Transport(_)) {
            return Self::new(UNREACHABLE_MESSAGE);
        }

        let Some(body) = err.body_json() else {
            return Self::new(fallback);
        };

        let message = ["error", "message"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(fallback)
            .to_owned();
        let details = body.get("details").and_then(Value::as_array).cloned();

        Self { message, details }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Failure {}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
