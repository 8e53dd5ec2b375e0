//! Session token storage.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use crate::error::ClientError;

/// Storage for the session token presented in the gateway hello.
pub trait TokenStore: Send + Sync {
    /// Current token, if any.
    fn get(&self) -> Option<String>;

    /// Replace the stored token.
    fn set(&self, token: &str) -> Result<(), ClientError>;

    /// Forget the stored token.
    fn remove(&self) -> Result<(), ClientError>;
}

/// Token store held in memory.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set(&self, token: &str) -> Result<(), ClientError> {
        *self.token.write() = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), ClientError> {
        *self.token.write() = None;
        Ok(())
    }
}

/// Token store backed by a single file.
///
/// A missing or blank file means there is no token.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default token location: `<config dir>/spherical/token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no configuration directory.
    pub fn default_path() -> Result<PathBuf, ClientError> {
        dirs::config_dir()
            .map(|dir| dir.join("spherical").join("token"))
            .ok_or_else(|| ClientError::TokenStore("no configuration directory".to_string()))
    }

    /// Path of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    debug!(path = %self.path.display(), error = %e, "failed to read token file");
                }
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<(), ClientError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        // The mode above only applies to new files.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }
        file.write_all(token.trim().as_bytes())?;
        Ok(())
    }

    fn remove(&self) -> Result<(), ClientError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemoryTokenStore::new();
        assert!(store.get().is_none());

        store.set("abc").expect("set");
        assert_eq!(store.get().as_deref(), Some("abc"));

        store.remove().expect("remove");
        assert!(store.get().is_none());
    }

    #[test]
    fn test_memory_store_with_token() {
        let store = MemoryTokenStore::with_token("preset");
        assert_eq!(store.get().as_deref(), Some("preset"));
    }

    #[test]
    fn test_file_store_missing_file_has_no_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join("token"));
        assert!(store.get().is_none());
    }

    #[test]
    fn test_file_store_persists_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("token");

        FileTokenStore::new(&path).set("session-token\n").expect("set");

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get().as_deref(), Some("session-token"));
        assert_eq!(reopened.path(), path.as_path());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_token_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("token");
        fs::write(&path, "old").expect("seed");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).expect("chmod");

        FileTokenStore::new(&path).set("session-token").expect("set");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(fs::read_to_string(&path).expect("read"), "session-token");
    }

    #[test]
    fn test_file_store_blank_file_has_no_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("token");
        std::fs::write(&path, "  \n").expect("write");

        assert!(FileTokenStore::new(path).get().is_none());
    }

    #[test]
    fn test_file_store_remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join("token"));

        store.set("abc").expect("set");
        store.remove().expect("first remove");
        store.remove().expect("second remove");
        assert!(store.get().is_none());
    }
}
