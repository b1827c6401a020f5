//! Error types for dispomail-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.

use thiserror::Error;

/// Main error type for dispomail-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Cache store operation failed
    #[error("Store error for key '{key}': {message}")]
    Store {
        /// Key being accessed
        key: String,
        /// Error message
        message: String,
    },

    /// Value exceeds the per-entry ceiling of the cache backend
    #[error("Entry '{key}' is {size} bytes, backend limit is {limit} bytes")]
    EntryTooLarge {
        /// Key being written
        key: String,
        /// Serialized size of the value
        size: usize,
        /// Backend limit
        limit: usize,
    },

    /// Key contains characters the backend cannot store
    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    /// Remote blocklist fetch failed
    #[error("Fetch from '{url}' failed: {message}")]
    Fetch {
        /// Provider URL
        url: String,
        /// Error message
        message: String,
    },

    /// Provider payload is not a JSON array of strings
    #[error("Invalid blocklist payload: {0}")]
    InvalidPayload(String),

    /// Audit log operation failed
    #[error("Audit log error: {0}")]
    AuditLog(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a fetch error
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::store("dispomail_chunk_1_0", "disk full");
        assert!(err.to_string().contains("dispomail_chunk_1_0"));
        assert!(err.to_string().contains("disk full"));

        let err = Error::config_value("refresh.provider", "Must be 1 or 2");
        assert!(err.to_string().contains("refresh.provider"));
    }

    #[test]
    fn test_entry_too_large_fields() {
        let err = Error::EntryTooLarge {
            key: "k".to_string(),
            size: 2048,
            limit: 1024,
        };
        match err {
            Error::EntryTooLarge { size, limit, .. } => {
                assert_eq!(size, 2048);
                assert_eq!(limit, 1024);
            }
            _ => panic!("Wrong error type"),
        }
    }
}
