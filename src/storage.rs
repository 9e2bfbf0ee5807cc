//! Key-value storage backends
//!
//! The onboarding store persists exactly one named entry. This module provides
//! the narrow key-value seam it is persisted through, standing in for the
//! platform preferences API, together with two backends:
//!
//! - [`MemoryKeyValueStore`]: process-local map, shared between clones
//! - [`FileKeyValueStore`]: one `<key>.json` file per key in a directory,
//!   replaced atomically via write-then-rename

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::PersistenceError;

/// Byte-oriented key-value storage.
///
/// Methods take `&self`; backends use interior mutability so a handle can be
/// shared between the persistence adapter and the host.
pub trait KeyValueStore {
    /// Read the value for `key`, `None` if absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Replace the value for `key`
    fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError>;

    /// Remove `key`; removing an absent key succeeds
    fn remove(&self, key: &str) -> Result<(), PersistenceError>;

    /// Whether `key` currently holds a value
    fn contains(&self, key: &str) -> Result<bool, PersistenceError>;
}

/// In-memory backend. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Rc<RefCell<HashMap<String, Vec<u8>>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> Result<bool, PersistenceError> {
        Ok(self.entries.borrow().contains_key(key))
    }
}

/// File-backed store rooted at a directory
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, PersistenceError> {
        let invalid = key.is_empty()
            || key == "."
            || key == ".."
            || key.contains(['/', '\\', '\0']);
        if invalid {
            return Err(PersistenceError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn storage_error(key: &str, source: std::io::Error) -> PersistenceError {
        PersistenceError::Storage {
            key: key.to_string(),
            source,
        }
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        let path = self.entry_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::storage_error(key, e)),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), PersistenceError> {
        let path = self.entry_path(key)?;
        fs::create_dir_all(&self.root).map_err(|e| Self::storage_error(key, e))?;

        // Readers only ever see the old or the new value
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).map_err(|e| Self::storage_error(key, e))?;
        fs::rename(&tmp_path, &path).map_err(|e| Self::storage_error(key, e))
    }

    fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::storage_error(key, e)),
        }
    }

    fn contains(&self, key: &str) -> Result<bool, PersistenceError> {
        let path = self.entry_path(key)?;
        path.try_exists().map_err(|e| Self::storage_error(key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_shared_between_clones() {
        let store = MemoryKeyValueStore::new();
        let handle = store.clone();

        store.set("UserInformation", b"{}").unwrap();
        assert!(handle.contains("UserInformation").unwrap());
        assert_eq!(handle.get("UserInformation").unwrap(), Some(b"{}".to_vec()));

        handle.remove("UserInformation").unwrap();
        assert!(store.is_empty());
        // Removing again is fine
        store.remove("UserInformation").unwrap();
    }

    #[test]
    fn test_file_store_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("prefs"));

        assert_eq!(store.get("profile").unwrap(), None);
        assert!(!store.contains("profile").unwrap());

        store.set("profile", b"first").unwrap();
        store.set("profile", b"second").unwrap();
        assert_eq!(store.get("profile").unwrap(), Some(b"second".to_vec()));
        assert!(store.contains("profile").unwrap());
        assert!(!dir.path().join("prefs/profile.json.tmp").exists());

        store.remove("profile").unwrap();
        assert!(!store.contains("profile").unwrap());
        store.remove("profile").unwrap();
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        for key in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(
                store.set(key, b"x"),
                Err(PersistenceError::InvalidKey(_))
            ));
        }
    }
}
