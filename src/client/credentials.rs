use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

/// Name of the file (and historical storage key) holding the current token.
pub const TOKEN_KEY: &str = "krist-app-token";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for the single bearer token of the current session.
///
/// Absence of a token means "logged out". The store enforces nothing about
/// the token's validity or expiration; it is purely a container.
pub trait CredentialStore: Send + Sync {
    /// Read the current token, `None` when logged out.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self) -> Result<Option<String>, StoreError>;

    /// Replace the current token.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, token: &str) -> Result<(), StoreError>;

    /// Remove the current token.
    ///
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), StoreError>;
}

/// File-backed store: one token string in one file, scoped to the client
/// installation. Survives restarts, not shared across installations.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store the token under `dir/krist-app-token`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            path: dir.into().join(TOKEN_KEY),
        }
    }
}

impl CredentialStore for FileStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(token.to_string()))
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Unavailable(err.to_string())),
        }
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| StoreError::Unavailable(err.to_string()))?;
        }
        fs::write(&self.path, token).map_err(|err| StoreError::Unavailable(err.to_string()))
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Unavailable(err.to_string())),
        }
    }
}

/// In-memory store for tests and embedders that do not want durable state.
#[derive(Debug, Default)]
pub struct MemoryStore {
    token: Mutex<Option<String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self) -> Result<Option<String>, StoreError> {
        Ok(self
            .token
            .lock()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?
            .clone())
    }

    fn set(&self, token: &str) -> Result<(), StoreError> {
        *self
            .token
            .lock()
            .map_err(|err| StoreError::Unavailable(err.to_string()))? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self
            .token
            .lock()
            .map_err(|err| StoreError::Unavailable(err.to_string()))? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("krist-test-{}", Ulid::new()))
    }

    #[test]
    fn file_store_roundtrip() {
        let dir = scratch_dir();
        let store = FileStore::new(&dir);

        assert_eq!(store.get().unwrap(), None);

        store.set("tok-1").unwrap();
        assert_eq!(store.get().unwrap(), Some("tok-1".to_string()));

        store.set("tok-2").unwrap();
        assert_eq!(store.get().unwrap(), Some("tok-2".to_string()));

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);

        // clearing twice is fine
        store.clear().unwrap();

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = scratch_dir();
        FileStore::new(&dir).set("persisted").unwrap();

        let reopened = FileStore::new(&dir);
        assert_eq!(reopened.get().unwrap(), Some("persisted".to_string()));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get().unwrap(), None);
        store.set("tok").unwrap();
        assert_eq!(store.get().unwrap(), Some("tok".to_string()));
        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }
}
