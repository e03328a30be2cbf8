//! JSON-file credential store.
//!
//! DESIGN
//! ======
//! The file holds a flat object keyed by `accessToken` / `refreshToken`, the
//! same two keys the browser portal keeps in local storage. Writes go to a
//! sibling temp file first and are renamed into place, so a crash mid-write
//! leaves either the old pair or the new pair on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{CredentialPair, CredentialStore, StoreError, StoredKeys};

#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw keys on disk. A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read_keys(&self) -> Result<StoredKeys, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(StoredKeys::default()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoredKeys::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_keys(&self, keys: &StoredKeys) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(keys)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn get(&self) -> Result<Option<CredentialPair>, StoreError> {
        Ok(self.read_keys()?.into_pair())
    }

    fn set(&self, pair: &CredentialPair) -> Result<(), StoreError> {
        self.write_keys(&StoredKeys::from(pair))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
