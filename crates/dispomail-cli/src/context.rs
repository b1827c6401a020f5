//! Host wiring
//!
//! Resolves the configuration file and data directories and builds the
//! core components on top of a file-backed cache and audit log.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use dispomail_core::{
    AdmissionGuard, Config, FileAuditLog, FileStore, HttpFetcher, QueryGate, RefreshScheduler,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Local config file names checked before the user config directory
pub const LOCAL_CONFIG_FILES: [&str; 2] = ["dispomail.toml", "config.toml"];

/// Platform directories for dispomail
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "dispomail")
}

/// First existing config file on the search path
pub fn find_config_file() -> Option<PathBuf> {
    for name in LOCAL_CONFIG_FILES {
        let path = PathBuf::from(name);
        if path.exists() {
            return Some(path);
        }
    }

    project_dirs()
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .filter(|path| path.exists())
}

/// Load the explicit config file, or the first one found, or defaults
pub fn load_config(explicit: Option<&Path>) -> Result<(Config, Option<PathBuf>)> {
    let path = explicit.map(Path::to_path_buf).or_else(find_config_file);

    let config = match path {
        Some(ref path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    config.validate().context("Configuration validation failed")?;
    Ok((config, path))
}

fn data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".dispomail"))
}

/// Configured or default cache directory
pub fn store_dir(config: &Config) -> PathBuf {
    config
        .store
        .path
        .as_ref()
        .map_or_else(|| data_dir().join("cache"), PathBuf::from)
}

/// Configured or default audit log file
pub fn audit_path(config: &Config) -> PathBuf {
    config
        .audit
        .path
        .as_ref()
        .map_or_else(|| data_dir().join("audit.jsonl"), PathBuf::from)
}

/// Loaded configuration plus the shared cache store
pub struct AppContext {
    /// Effective configuration
    pub config: Config,
    /// File the configuration came from, if any
    pub config_path: Option<PathBuf>,
    store: Arc<FileStore>,
}

impl AppContext {
    /// Load configuration and open the cache directory
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (config, config_path) = load_config(explicit)?;
        let dir = store_dir(&config);
        let store = FileStore::open(&dir)
            .with_context(|| format!("Failed to open cache directory {}", dir.display()))?
            .with_max_entry_bytes(config.store.max_entry_bytes);

        debug!(
            config = ?config_path,
            cache = %dir.display(),
            "Loaded context"
        );

        Ok(Self {
            config,
            config_path,
            store: Arc::new(store),
        })
    }

    /// Shared cache store
    pub fn store(&self) -> &Arc<FileStore> {
        &self.store
    }

    /// Refresh scheduler fetching over HTTP
    pub fn scheduler(&self) -> Result<RefreshScheduler<Arc<FileStore>, HttpFetcher>> {
        let fetcher = HttpFetcher::new(&self.config.source).context("Failed to build HTTP client")?;
        Ok(RefreshScheduler::new(&self.config, Arc::clone(&self.store), fetcher))
    }

    /// Read-only lookup gate
    pub fn gate(&self) -> QueryGate<Arc<FileStore>> {
        QueryGate::new(Arc::clone(&self.store), &self.config.store)
    }

    /// Open the audit log file
    pub fn audit_log(&self) -> Result<FileAuditLog> {
        let path = audit_path(&self.config);
        FileAuditLog::open(&path)
            .with_context(|| format!("Failed to open audit log {}", path.display()))
    }

    /// Admission guard writing to the audit log file
    pub fn guard(&self) -> Result<AdmissionGuard<Arc<FileStore>, FileAuditLog>> {
        Ok(AdmissionGuard::new(
            &self.config,
            Arc::clone(&self.store),
            self.audit_log()?,
        ))
    }
}

/// Format a unix timestamp for display
pub fn format_time(timestamp: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(timestamp, 0)
        .map_or_else(|| timestamp.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_paths_win() {
        let mut config = Config::default();
        config.store.path = Some("/tmp/x/cache".to_string());
        config.audit.path = Some("/tmp/x/audit.jsonl".to_string());
        assert_eq!(store_dir(&config), PathBuf::from("/tmp/x/cache"));
        assert_eq!(audit_path(&config), PathBuf::from("/tmp/x/audit.jsonl"));
    }

    #[test]
    fn test_default_paths_under_data_dir() {
        let config = Config::default();
        assert!(store_dir(&config).ends_with("cache"));
        assert!(audit_path(&config).ends_with("audit.jsonl"));
    }

    #[test]
    fn test_missing_explicit_config_fails() {
        assert!(load_config(Some(Path::new("/nonexistent/dispomail.toml"))).is_err());
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "1970-01-01 00:00:00 UTC");
    }
}
