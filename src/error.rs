//! Error types for Synheart Onboard

use thiserror::Error;

/// Errors raised by the persistence adapter and the key-value layer.
///
/// None of these are fatal: the store logs them and keeps operating on its
/// in-memory state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Failed to encode user information: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode stored user information: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Storage error for key '{key}': {source}")]
    Storage {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Crate-level errors surfaced to hosts (configuration, FFI, action parsing).
#[derive(Debug, Error)]
pub enum OnboardError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown user field: {0}")]
    UnknownField(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
