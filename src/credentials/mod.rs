//! Credential storage: the persisted access/refresh token pair.
//!
//! ARCHITECTURE
//! ============
//! `CredentialStore` is a dumb key/value port (`get`/`set`/`clear`) with no
//! expiry bookkeeping; token validity is discovered from server responses.
//! Backends persist the two keys independently, so `get` treats a partial
//! pair as absent.
//!
//! Both the session controller and the refresh hook write credentials. They
//! do so through [`SharedCredentials`], which serializes every read and write
//! behind one mutex so no caller can observe an old access token next to a
//! new refresh token.

mod file;
mod memory;

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

pub use file::FileStore;
pub use memory::MemoryStore;

/// Storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

// =============================================================================
// TYPES
// =============================================================================

/// A complete access/refresh token pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl CredentialPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
    }
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Raw persisted form: both keys are optional on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredKeys {
    #[serde(rename = "accessToken", default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl StoredKeys {
    /// Collapse to a pair; a missing or empty key makes the whole pair absent.
    #[must_use]
    pub fn into_pair(self) -> Option<CredentialPair> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        let refresh_token = self.refresh_token.filter(|t| !t.is_empty())?;
        Some(CredentialPair { access_token, refresh_token })
    }
}

impl From<&CredentialPair> for StoredKeys {
    fn from(pair: &CredentialPair) -> Self {
        Self { access_token: Some(pair.access_token.clone()), refresh_token: Some(pair.refresh_token.clone()) }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential file is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("credential store lock poisoned")]
    Poisoned,
}

// =============================================================================
// STORE PORT
// =============================================================================

/// Persistence port for the credential pair.
pub trait CredentialStore: Send + Sync {
    /// Read the stored pair. Partial pairs read as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self) -> Result<Option<CredentialPair>, StoreError>;

    /// Overwrite both tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, pair: &CredentialPair) -> Result<(), StoreError>;

    /// Remove both tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

// =============================================================================
// SHARED CREDENTIALS
// =============================================================================

/// Cloneable handle over a store that serializes all access through one lock.
#[derive(Clone)]
pub struct SharedCredentials {
    store: Arc<dyn CredentialStore>,
    lock: Arc<Mutex<()>>,
}

impl SharedCredentials {
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store, lock: Arc::new(Mutex::new(())) }
    }

    /// In-memory credentials, mostly useful for tests and short-lived tools.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Current pair. Storage failures read as "no credentials" and are logged.
    #[must_use]
    pub fn get(&self) -> Option<CredentialPair> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.store.get() {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "credential store read failed; treating as signed out");
                None
            }
        }
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.get().map(|pair| pair.access_token)
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.get().map(|pair| pair.refresh_token)
    }

    /// Overwrite both tokens as one serialized write.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or the store write fails.
    pub fn set(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        self.store.set(pair)
    }

    /// Remove both tokens.
    ///
    /// Clearing still proceeds on a poisoned lock: forgetting credentials must
    /// not be blocked by an unrelated panic.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.clear()
    }

    /// Write `pair` only if the stored refresh token is still `expected_refresh`.
    ///
    /// Returns `false` without writing when the session was replaced or
    /// cleared since `expected_refresh` was read.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned or the store read or write fails.
    pub fn replace_if_current(&self, expected_refresh: &str, pair: &CredentialPair) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        if !self.holds_refresh(expected_refresh)? {
            return Ok(false);
        }
        self.store.set(pair)?;
        Ok(true)
    }

    /// Remove both tokens only if the stored refresh token is still `expected_refresh`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read or write fails.
    pub fn clear_if_current(&self, expected_refresh: &str) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.holds_refresh(expected_refresh)? {
            return Ok(false);
        }
        self.store.clear()?;
        Ok(true)
    }

    // Caller holds the lock.
    fn holds_refresh(&self, expected_refresh: &str) -> Result<bool, StoreError> {
        Ok(self
            .store
            .get()?
            .is_some_and(|pair| pair.refresh_token == expected_refresh))
    }
}

impl std::fmt::Debug for SharedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCredentials").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
