//! Configuration management for dispomail
//!
//! Provides a strongly-typed configuration system with TOML support.
//! Each section maps onto one component: `refresh` drives the scheduler,
//! `source` the remote client, `store` the chunked cache, `gate` the
//! admission checks and `audit` the blocked-attempt log.

mod provider;

pub use provider::Provider;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seconds in one day, the unit of `refresh.interval_days`
pub const SECS_PER_DAY: i64 = 86_400;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduled refresh settings
    pub refresh: RefreshConfig,

    /// Remote source client settings
    pub source: SourceConfig,

    /// Chunked cache settings
    pub store: StoreConfig,

    /// Login/registration gate settings
    pub gate: GateConfig,

    /// Audit log settings
    pub audit: AuditConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Error::from)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.refresh.interval_days == 0 {
            return Err(Error::config_value(
                "refresh.interval_days",
                "Must be at least 1 day",
            ));
        }

        if self.refresh.provider().is_none() {
            return Err(Error::config_value(
                "refresh.provider",
                format!("Unknown provider id {}. Must be 1 or 2", self.refresh.provider),
            ));
        }

        if self.refresh.tick_interval_secs == 0 {
            return Err(Error::config_value(
                "refresh.tick_interval_secs",
                "Must be greater than 0",
            ));
        }

        if self.store.chunk_size == 0 {
            return Err(Error::config_value("store.chunk_size", "Must be greater than 0"));
        }

        let prefix = &self.store.key_prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::config_value(
                "store.key_prefix",
                "Must be non-empty and contain only ASCII letters, digits, '_' or '-'",
            ));
        }

        if self.audit.per_page == 0 {
            return Err(Error::config_value("audit.per_page", "Must be greater than 0"));
        }

        Ok(())
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Scheduled refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Run the refresh task at all
    pub enabled: bool,
    /// Days between refreshes
    pub interval_days: u32,
    /// Provider id (1 = ivolo, 2 = RevertIT)
    pub provider: u8,
    /// Seconds after which an abandoned refresh lock is considered stale (0 = never)
    pub lock_lease_secs: u64,
    /// Seconds between scheduler ticks in `watch` mode
    pub tick_interval_secs: u64,
}

impl RefreshConfig {
    /// Resolved provider, `None` when the id is not in the provider map
    pub fn provider(&self) -> Option<Provider> {
        Provider::from_id(self.provider)
    }

    /// Staleness interval in seconds
    pub fn interval_secs(&self) -> i64 {
        i64::from(self.interval_days) * SECS_PER_DAY
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_days: 30,
            provider: Provider::RevertIt.id(),
            lock_lease_secs: 600,
            tick_interval_secs: 3600,
        }
    }
}

/// Remote source client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Transport timeout for one fetch
    pub timeout_secs: u64,
    /// User-Agent header sent to the provider
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("dispomail/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Chunked cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory of the file-backed cache (None = platform data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Prefix of every cache key written by dispomail
    pub key_prefix: String,
    /// Maximum entries per chunk
    pub chunk_size: usize,
    /// Per-entry byte ceiling of the backend (0 = unlimited)
    pub max_entry_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            key_prefix: "dispomail".to_string(),
            chunk_size: 2000,
            max_entry_bytes: 0,
        }
    }
}

/// Admission gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Reject registrations using a disposable address
    pub block_on_register: bool,
    /// Reject logins using a disposable address
    pub block_on_login: bool,
    /// Record every rejected attempt in the audit log
    pub log_actions: bool,
    /// Report the site as degraded while a refresh holds the lock
    pub close_site_while_refreshing: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            block_on_register: true,
            block_on_login: false,
            log_actions: true,
            close_site_while_refreshing: false,
        }
    }
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// JSON-lines log file (None = platform data dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Entries per listing page
    pub per_page: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: None,
            per_page: 20,
        }
    }
}
