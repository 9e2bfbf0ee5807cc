//! Persistence adapter
//!
//! Encodes [`UserInformation`] as a JSON object of its five base fields and
//! stores it under one key. Derived values (full name, BMI, validity) are
//! never written; they are recomputed from the restored record.

use crate::error::PersistenceError;
use crate::storage::KeyValueStore;
use crate::types::UserInformation;

/// Default storage key for the onboarding record
pub const DEFAULT_STORAGE_KEY: &str = "UserInformation";

/// Saves and restores the onboarding record through a [`KeyValueStore`]
pub struct PersistenceAdapter {
    storage: Box<dyn KeyValueStore>,
    key: String,
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl PersistenceAdapter {
    /// Create an adapter using the default key
    pub fn new(storage: impl KeyValueStore + 'static) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    /// Create an adapter using a specific key
    pub fn with_key(storage: impl KeyValueStore + 'static, key: impl Into<String>) -> Self {
        Self {
            storage: Box::new(storage),
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Encode a record to its stored form
    pub fn encode(record: &UserInformation) -> Result<Vec<u8>, PersistenceError> {
        serde_json::to_vec(record).map_err(PersistenceError::Encode)
    }

    /// Decode a record from its stored form
    pub fn decode(bytes: &[u8]) -> Result<UserInformation, PersistenceError> {
        serde_json::from_slice(bytes).map_err(PersistenceError::Decode)
    }

    /// Replace the stored record
    pub fn save(&self, record: &UserInformation) -> Result<(), PersistenceError> {
        let bytes = Self::encode(record)?;
        self.storage.set(&self.key, &bytes)
    }

    /// Restore the stored record, `None` if nothing was saved
    pub fn load(&self) -> Result<Option<UserInformation>, PersistenceError> {
        match self.storage.get(&self.key)? {
            Some(bytes) => Self::decode(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Erase the stored record
    pub fn clear(&self) -> Result<(), PersistenceError> {
        self.storage.remove(&self.key)
    }

    /// Whether a record is currently stored
    pub fn exists(&self) -> Result<bool, PersistenceError> {
        self.storage.contains(&self.key)
    }
}
