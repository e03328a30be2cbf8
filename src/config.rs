//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_SITE_NAME: &str = "Bufete";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const CREDENTIALS_FILE: &str = "credentials.json";
const FALLBACK_CREDENTIALS_PATH: &str = ".bufete-credentials.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every API path is appended to, without a trailing slash.
    pub api_url: String,
    /// Display name of the site. Cosmetic.
    pub site_name: String,
    /// Where the file-backed credential store lives.
    pub credentials_path: PathBuf,
    pub connect_timeout: Duration,
    /// Whole-request timeout; `None` lets requests run to completion.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            site_name: DEFAULT_SITE_NAME.to_owned(),
            credentials_path: default_credentials_path(None),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `BUFETE_API_URL`: default `http://localhost:5000/api`
    /// - `BUFETE_SITE_NAME`: default `Bufete`
    /// - `BUFETE_CREDENTIALS_PATH`: default `$HOME/.config/bufete/credentials.json`
    /// - `BUFETE_CONNECT_TIMEOUT_SECS`: default 10
    /// - `BUFETE_REQUEST_TIMEOUT_SECS`: unset means no request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if `BUFETE_API_URL` is not an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is not an http(s) URL.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = normalize_api_url(var("BUFETE_API_URL").as_deref().unwrap_or(DEFAULT_API_URL))?;
        let site_name = var("BUFETE_SITE_NAME")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SITE_NAME.to_owned());
        let credentials_path = var("BUFETE_CREDENTIALS_PATH")
            .filter(|s| !s.trim().is_empty())
            .map_or_else(|| default_credentials_path(var("HOME").as_deref()), PathBuf::from);
        let connect_timeout = Duration::from_secs(
            parse_secs(var("BUFETE_CONNECT_TIMEOUT_SECS").as_deref()).unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        );
        let request_timeout = parse_secs(var("BUFETE_REQUEST_TIMEOUT_SECS").as_deref()).map(Duration::from_secs);

        Ok(Self { api_url, site_name, credentials_path, connect_timeout, request_timeout })
    }

    /// Replace the API URL, validating and normalizing it.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not an http(s) URL.
    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_url = normalize_api_url(url)?;
        Ok(self)
    }
}

/// Validate an http(s) base URL and drop trailing slashes.
///
/// # Errors
///
/// Returns an error if `raw` does not parse or uses another scheme.
pub fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = reqwest::Url::parse(trimmed)
        .map_err(|e| ConfigError::InvalidUrl { url: raw.to_owned(), reason: e.to_string() })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl { url: raw.to_owned(), reason: "scheme must be http or https".into() });
    }
    Ok(trimmed.to_owned())
}

/// Positive whole seconds; zero and garbage read as unset.
fn parse_secs(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|v| v.trim().parse::<u64>().ok()).filter(|secs| *secs > 0)
}

fn default_credentials_path(home: Option<&str>) -> PathBuf {
    match home.filter(|h| !h.is_empty()) {
        Some(home) => PathBuf::from(home)
            .join(".config")
            .join("bufete")
            .join(CREDENTIALS_FILE),
        None => PathBuf::from(FALLBACK_CREDENTIALS_PATH),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
