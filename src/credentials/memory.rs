//! In-process credential store.

use std::sync::Mutex;

use super::{CredentialPair, CredentialStore, StoreError, StoredKeys};

/// Credential store held in process memory. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: Mutex<StoredKeys>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with raw keys, including partial pairs.
    #[must_use]
    pub fn with_keys(keys: StoredKeys) -> Self {
        Self { keys: Mutex::new(keys) }
    }

    /// Store seeded with a complete pair.
    #[must_use]
    pub fn with_pair(pair: &CredentialPair) -> Self {
        Self::with_keys(StoredKeys::from(pair))
    }

    /// Raw keys as currently held.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn keys(&self) -> Result<StoredKeys, StoreError> {
        Ok(self.keys.lock().map_err(|_| StoreError::Poisoned)?.clone())
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self) -> Result<Option<CredentialPair>, StoreError> {
        Ok(self.keys()?.into_pair())
    }

    fn set(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        *self.keys.lock().map_err(|_| StoreError::Poisoned)? = StoredKeys::from(pair);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.keys.lock().map_err(|_| StoreError::Poisoned)? = StoredKeys::default();
        Ok(())
    }
}
