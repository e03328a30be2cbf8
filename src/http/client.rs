//! Shared API client: credential injection and transparent session renewal.
//!
//! ARCHITECTURE
//! ============
//! Every authenticated call goes through one pipeline:
//!
//! 1. request hook: read the store, attach `Authorization: Bearer <access>`
//!    when a token exists, otherwise send unauthenticated.
//! 2. send through the transport; non-2xx becomes [`ApiError::Status`].
//! 3. response hook: a 401 on the *first* attempt triggers renewal (single
//!    flight refresh, see [`super::refresh`]) and one replay. The replay runs
//!    the request hook again, picking up the new access token. A 401 on the
//!    replay propagates.
//!
//! The attempt number travels beside the request as [`Attempt`] instead of a
//! flag mutated on the request, so the one-replay bound is visible in the
//! loop that enforces it.
//!
//! Pre-authentication endpoints (login, register, password recovery) use the
//! anonymous path, which skips both hooks: a wrong password must surface as
//! the server's 401, not kick off a refresh of some stale stored session.

use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use super::refresh::{ExpiryListener, RefreshCoordinator};
use super::transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
use crate::config::ClientConfig;
use crate::credentials::SharedCredentials;
use crate::error::ApiError;
use crate::navigation::Navigator;

/// Which send of a logical request this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// Original send; a 401 here may be recovered by refreshing.
    First,
    /// Replay after a refresh; a 401 here is final.
    Replay,
}

impl Attempt {
    #[must_use]
    pub fn may_refresh(self) -> bool {
        matches!(self, Self::First)
    }
}

/// Cloneable handle to the single shared client.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn HttpTransport>,
    credentials: SharedCredentials,
    navigator: Arc<dyn Navigator>,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credentials: SharedCredentials,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let refresh = RefreshCoordinator::new(Arc::clone(&transport), credentials.clone(), Arc::clone(&navigator));
        Self { inner: Arc::new(ClientInner { transport, credentials, navigator, refresh }) }
    }

    /// Client over a `reqwest` transport built from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(
        config: &ClientConfig,
        credentials: SharedCredentials,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), credentials, navigator))
    }

    #[must_use]
    pub fn credentials(&self) -> &SharedCredentials {
        &self.inner.credentials
    }

    #[must_use]
    pub fn navigator(&self) -> &dyn Navigator {
        self.inner.navigator.as_ref()
    }

    /// Register a callback run whenever a failed refresh drops the session.
    pub fn on_session_expired(&self, listener: ExpiryListener) {
        self.inner.refresh.add_expiry_listener(listener);
    }

    /// Number of refresh calls this client has started.
    #[must_use]
    pub fn refreshes_started(&self) -> u64 {
        self.inner.refresh.flights_started()
    }

    // =========================================================================
    // AUTHENTICATED PIPELINE
    // =========================================================================

    /// Send through the full pipeline: attach credentials, renew once on 401.
    ///
    /// # Errors
    ///
    /// Returns the transport or status error of the final attempt, or the
    /// refresh error if renewal failed.
    pub async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<ApiResponse, ApiError> {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!("api_request", %request_id, %method, path);
        let request = ApiRequest::new(method, path, body).with_request_id(request_id);
        self.dispatch(request).instrument(span).await
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut attempt = Attempt::First;
        loop {
            let mut outgoing = request.clone();
            let sent_token = self.attach_credentials(&mut outgoing);
            match self.execute(&outgoing).await {
                Err(err) if err.is_unauthorized() && attempt.may_refresh() => {
                    self.renew(sent_token.as_deref(), err).await?;
                    tracing::debug!("replaying request with renewed credentials");
                    attempt = Attempt::Replay;
                }
                result => return result,
            }
        }
    }

    /// Request hook. Returns the access token that was attached, if any.
    fn attach_credentials(&self, request: &mut ApiRequest) -> Option<String> {
        request.clear_bearer();
        let token = self.inner.credentials.access_token()?;
        if request.set_bearer(&token) {
            Some(token)
        } else {
            tracing::warn!("stored access token is not a valid header value; sending unauthenticated");
            None
        }
    }

    /// Response hook for a first-attempt 401.
    ///
    /// Fails with `original` when there is no refresh token, and with the
    /// refresh error when renewal fails. If the stored access token already
    /// differs from the one the request carried, someone else renewed in the
    /// meantime and the request is replayed without another refresh.
    async fn renew(&self, sent_token: Option<&str>, original: ApiError) -> Result<(), ApiError> {
        let Some(current) = self.inner.credentials.get() else {
            tracing::debug!("401 without stored refresh token; not refreshing");
            return Err(original);
        };
        if sent_token != Some(current.access_token.as_str()) {
            tracing::debug!("credentials rotated while request was in flight");
            return Ok(());
        }
        self.inner
            .refresh
            .refresh(current.refresh_token)
            .await
            .map(|_| ())
    }

    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self.inner.transport.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(response.into_error())
        }
    }

    // =========================================================================
    // ANONYMOUS PATH
    // =========================================================================

    /// Send without credentials and without refresh handling.
    ///
    /// # Errors
    ///
    /// Returns the transport error or the non-success status.
    pub async fn send_anonymous(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiResponse, ApiError> {
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!("api_request", %request_id, %method, path, anonymous = true);
        let request = ApiRequest::new(method, path, body).with_request_id(request_id);
        self.execute(&request).instrument(span).await
    }

    /// `GET` without credentials, decoding the JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_anonymous`]; also fails if the body does not decode.
    pub async fn get_anonymous<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_anonymous(Method::GET, path, None).await?.json()
    }

    /// `POST` a JSON body without credentials, decoding the JSON reply.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send_anonymous`]; also fails if either body does not (de)serialize.
    pub async fn post_anonymous<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(body)?;
        self.send_anonymous(Method::POST, path, Some(body)).await?.json()
    }

    // =========================================================================
    // TYPED HELPERS
    // =========================================================================

    /// # Errors
    ///
    /// See [`ApiClient::send`]; also fails if the body does not decode.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(Method::GET, path, None).await?.json()
    }

    /// # Errors
    ///
    /// See [`ApiClient::send`]; also fails if either body does not (de)serialize.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(body)?;
        self.send(Method::POST, path, Some(body)).await?.json()
    }

    /// # Errors
    ///
    /// See [`ApiClient::send`]; also fails if either body does not (de)serialize.
    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(body)?;
        self.send(Method::PUT, path, Some(body)).await?.json()
    }

    /// # Errors
    ///
    /// See [`ApiClient::send`]; also fails if either body does not (de)serialize.
    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode(body)?;
        self.send(Method::PATCH, path, Some(body)).await?.json()
    }

    /// `DELETE`, discarding any response body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None).await.map(|_| ())
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
