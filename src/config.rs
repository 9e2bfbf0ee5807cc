//! Store and binder configuration

use serde::{Deserialize, Serialize};

use crate::error::OnboardError;
use crate::persistence::DEFAULT_STORAGE_KEY;

/// Default quiet interval before a text edit is forwarded (milliseconds)
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Longest accepted quiet interval (milliseconds)
pub const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Configuration for a store and its input bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key the record is persisted under
    pub storage_key: String,
    /// Quiet interval for debounced text inputs
    pub debounce_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different storage key
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Use a different debounce interval
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Debounce interval as a duration, capped at [`MAX_DEBOUNCE_MS`]
    pub fn debounce_interval(&self) -> chrono::Duration {
        let millis = i64::try_from(self.debounce_ms.min(MAX_DEBOUNCE_MS)).unwrap_or(0);
        chrono::Duration::milliseconds(millis)
    }

    /// Load configuration from JSON; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, OnboardError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn validate(&self) -> Result<(), OnboardError> {
        if self.storage_key.trim().is_empty() {
            return Err(OnboardError::InvalidConfig(
                "storage_key must not be empty".to_string(),
            ));
        }
        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(OnboardError::InvalidConfig(format!(
                "debounce_ms must be at most {}, got {}",
                MAX_DEBOUNCE_MS, self.debounce_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.storage_key, "UserInformation");
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.debounce_interval(), chrono::Duration::milliseconds(300));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = StoreConfig::from_json(r#"{"debounce_ms": 150}"#).unwrap();
        assert_eq!(config.debounce_ms, 150);
        assert_eq!(config.storage_key, "UserInformation");
    }

    #[test]
    fn test_rejects_empty_key() {
        let result = StoreConfig::from_json(r#"{"storage_key": "  "}"#);
        assert!(matches!(result, Err(OnboardError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_out_of_range_debounce() {
        let result = StoreConfig::from_json(r#"{"debounce_ms": 9223372036854775807}"#);
        assert!(matches!(result, Err(OnboardError::InvalidConfig(_))));

        let result = StoreConfig::from_json(r#"{"debounce_ms": 60001}"#);
        assert!(matches!(result, Err(OnboardError::InvalidConfig(_))));
        assert!(StoreConfig::from_json(r#"{"debounce_ms": 60000}"#).is_ok());
    }

    #[test]
    fn test_builder_interval_is_capped() {
        let config = StoreConfig::new().with_debounce_ms(u64::MAX);
        assert_eq!(config.debounce_interval(), chrono::Duration::milliseconds(60_000));
    }

    #[test]
    fn test_builder_round_trip() {
        let config = StoreConfig::new()
            .with_storage_key("profile")
            .with_debounce_ms(0);
        let loaded = StoreConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(loaded, config);
    }
}
