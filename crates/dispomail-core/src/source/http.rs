//! Blocking HTTP fetcher

use super::{parse_snapshot, Fetcher};
use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::snapshot::BlocklistSnapshot;
use reqwest::blocking::Client;
use std::time::Duration;
use tracing::{info, warn};

/// Fetches provider lists over HTTPS
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with the configured timeout and user agent
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Fetch and parse, reporting why a fetch failed
    pub fn try_fetch(&self, url: &str) -> Result<BlocklistSnapshot> {
        let body = self
            .client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .and_then(reqwest::blocking::Response::text)
            .map_err(|e| Error::fetch(url, e.to_string()))?;

        parse_snapshot(&body)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Option<BlocklistSnapshot> {
        match self.try_fetch(url) {
            Ok(snapshot) => {
                info!(url, entries = snapshot.len(), "Fetched blocklist");
                Some(snapshot)
            }
            Err(e) => {
                warn!(url, error = %e, "Blocklist fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_defaults() {
        assert!(HttpFetcher::new(&SourceConfig::default()).is_ok());
    }

    #[test]
    fn test_unreachable_host_degrades_to_none() {
        let config = SourceConfig {
            timeout_secs: 1,
            ..SourceConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();
        // port 9 on loopback: connection refused, no network needed
        assert!(fetcher.fetch("http://127.0.0.1:9/index.json").is_none());
    }

    #[test]
    fn test_invalid_url_degrades_to_none() {
        let fetcher = HttpFetcher::new(&SourceConfig::default()).unwrap();
        assert!(fetcher.fetch("not a url").is_none());
    }
}
