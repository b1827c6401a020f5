//! Remote source client
//!
//! Providers publish a JSON array of domain strings, optionally containing
//! `*` wildcards. Fetch failures never escape this module: every failure
//! degrades to "no data" so the scheduler can treat them uniformly.

mod http;

pub use http::HttpFetcher;

use crate::error::{Error, Result};
use crate::snapshot::BlocklistSnapshot;
use std::sync::Arc;
use tracing::debug;

/// Fetches a blocklist snapshot from a provider URL
#[cfg_attr(test, mockall::automock)]
pub trait Fetcher: Send + Sync {
    /// Fetch and parse the list; `None` on any failure
    fn fetch(&self, url: &str) -> Option<BlocklistSnapshot>;
}

impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    fn fetch(&self, url: &str) -> Option<BlocklistSnapshot> {
        (**self).fetch(url)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &str) -> Option<BlocklistSnapshot> {
        (**self).fetch(url)
    }
}

/// Parse a provider payload.
///
/// The body must be a JSON array. String elements are trimmed and kept in
/// order; empty strings and non-string elements are dropped.
pub fn parse_snapshot(body: &str) -> Result<BlocklistSnapshot> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let serde_json::Value::Array(items) = value else {
        return Err(Error::InvalidPayload(
            "expected a JSON array of domains".to_string(),
        ));
    };

    let total = items.len();
    let entries: Vec<String> = items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            _ => None,
        })
        .collect();

    if entries.len() != total {
        debug!(
            dropped = total - entries.len(),
            "Dropped empty or non-string payload elements"
        );
    }

    Ok(BlocklistSnapshot::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_array() {
        let snapshot = parse_snapshot(r#"["spam.com", "*@tempmail.io", " padded.org "]"#).unwrap();
        assert_eq!(
            snapshot.entries(),
            &["spam.com".to_string(), "*@tempmail.io".to_string(), "padded.org".to_string()]
        );
    }

    #[test]
    fn test_parse_drops_non_strings() {
        let snapshot = parse_snapshot(r#"["a.com", 1, null, "", {"x": 1}, "b.com"]"#).unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_snapshot("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_snapshot(r#"{"domains": ["a.com"]}"#),
            Err(Error::InvalidPayload(_))
        ));
        assert!(matches!(parse_snapshot("<html>"), Err(Error::Json(_))));
        assert!(parse_snapshot("").is_err());
    }

    #[test]
    fn test_mock_fetcher_through_arc() {
        let mut mock = MockFetcher::new();
        mock.expect_fetch()
            .times(1)
            .returning(|_| Some(BlocklistSnapshot::new(vec!["x.io".to_string()])));

        let shared: Arc<dyn Fetcher> = Arc::new(mock);
        let snapshot = shared.fetch("https://example.test/list.json").unwrap();
        assert_eq!(snapshot.len(), 1);
    }
}
