//! Blocklist snapshot
//!
//! The complete, ordered list of patterns fetched in one refresh.

use std::sync::Arc;

/// Immutable list of domain patterns from one refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlocklistSnapshot {
    entries: Arc<[String]>,
}

impl BlocklistSnapshot {
    /// Build a snapshot, keeping entries in the order given
    pub fn new(entries: Vec<String>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// All entries in provider order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Iterate over entries
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Split into slices of at most `size` entries
    ///
    /// # Panics
    /// Panics if `size` is 0.
    pub fn chunks(&self, size: usize) -> std::slice::Chunks<'_, String> {
        self.entries.chunks(size)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if snapshot has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<String>> for BlocklistSnapshot {
    fn from(entries: Vec<String>) -> Self {
        Self::new(entries)
    }
}

impl<'a> FromIterator<&'a str> for BlocklistSnapshot {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(str::to_string).collect())
    }
}
