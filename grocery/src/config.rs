//! Configuration for the grocery list.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::gesture::SwipeConfig;
use basket_runtime::StoreConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Key the list record is stored under
pub const DEFAULT_STORAGE_KEY: &str = "GROCERY_LIST";

/// Quiet period before a change is written
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Errors raised while reading configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that could not be used
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The storage key was empty
    #[error("storage key must not be empty")]
    EmptyStorageKey,
}

/// Grocery list configuration
#[derive(Debug, Clone)]
pub struct ListConfig {
    /// Key the record is persisted under
    pub storage_key: String,
    /// Quiet period before a write
    pub debounce: Duration,
    /// Whether the draft text is persisted with the list
    pub persist_draft: bool,
    /// Directory used by file-backed storage
    pub data_dir: PathBuf,
    /// Swipe-to-delete behaviour
    pub swipe: SwipeConfig,
    /// Runtime settings
    pub store: StoreConfig,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            persist_draft: true,
            data_dir: PathBuf::from(".grocery"),
            swipe: SwipeConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl ListConfig {
    /// Load configuration from environment variables
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GROCERY_STORAGE_KEY` | `GROCERY_LIST` |
    /// | `GROCERY_DEBOUNCE_MS` | `500` |
    /// | `GROCERY_PERSIST_DRAFT` | `true` |
    /// | `GROCERY_DATA_DIR` | `.grocery` |
    /// | `GROCERY_DELETE_THRESHOLD` | `0.4` |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an unusable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(key) = lookup("GROCERY_STORAGE_KEY") {
            if key.trim().is_empty() {
                return Err(ConfigError::EmptyStorageKey);
            }
            config.storage_key = key;
        }

        if let Some(raw) = lookup("GROCERY_DEBOUNCE_MS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid("GROCERY_DEBOUNCE_MS", &raw, e.to_string()))?;
            config.debounce = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup("GROCERY_PERSIST_DRAFT") {
            config.persist_draft = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(invalid(
                        "GROCERY_PERSIST_DRAFT",
                        &raw,
                        "expected a boolean".to_string(),
                    ))
                },
            };
        }

        if let Some(dir) = lookup("GROCERY_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup("GROCERY_DELETE_THRESHOLD") {
            let threshold = raw
                .trim()
                .parse::<f64>()
                .map_err(|e| invalid("GROCERY_DELETE_THRESHOLD", &raw, e.to_string()))?;
            if !(threshold > 0.0 && threshold < 1.0) {
                return Err(invalid(
                    "GROCERY_DELETE_THRESHOLD",
                    &raw,
                    "must be between 0 and 1".to_string(),
                ));
            }
            config.swipe.delete_threshold = threshold;
        }

        Ok(config)
    }

    /// Set the storage key
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Set the debounce window
    #[must_use]
    pub const fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Enable or disable draft persistence
    #[must_use]
    pub const fn with_persist_draft(mut self, persist: bool) -> Self {
        self.persist_draft = persist;
        self
    }

    /// Set the data directory
    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Set the swipe configuration
    #[must_use]
    pub fn with_swipe(mut self, swipe: SwipeConfig) -> Self {
        self.swipe = swipe;
        self
    }

    /// Set the runtime configuration
    #[must_use]
    pub fn with_store_config(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }
}

fn invalid(var: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason,
    }
}
