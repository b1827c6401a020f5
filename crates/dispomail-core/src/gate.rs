//! Query gate
//!
//! The synchronous "is this address disposable?" check. The compiled
//! pattern list is cached per committed generation; a call only reads the
//! metadata entry unless a new snapshot has been committed since.

use crate::config::StoreConfig;
use crate::filter::PatternList;
use crate::store::{ChunkedStore, KvStore, RefreshMetadata};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
struct Compiled {
    generation: u64,
    refreshed_at: i64,
    patterns: Arc<PatternList>,
}

impl Compiled {
    fn is_for(&self, metadata: &RefreshMetadata) -> bool {
        self.generation == metadata.generation && self.refreshed_at == metadata.last_refresh_time
    }
}

/// Read-only blocklist lookup
#[derive(Debug)]
pub struct QueryGate<S> {
    store: ChunkedStore<S>,
    cache: RwLock<Option<Compiled>>,
}

impl<S: KvStore> QueryGate<S> {
    /// Create a gate over a cache store
    pub fn new(store: S, config: &StoreConfig) -> Self {
        Self::from_chunked(ChunkedStore::new(store, config))
    }

    /// Create a gate over an existing chunk layout
    pub fn from_chunked(store: ChunkedStore<S>) -> Self {
        Self {
            store,
            cache: RwLock::new(None),
        }
    }

    /// Chunked storage read by this gate
    pub fn store(&self) -> &ChunkedStore<S> {
        &self.store
    }

    /// Compiled patterns of the current generation.
    ///
    /// Empty when nothing has been committed.
    pub fn patterns(&self) -> Arc<PatternList> {
        let Some(metadata) = self.store.metadata() else {
            return Arc::new(PatternList::new());
        };

        if let Some(compiled) = self.cache.read().as_ref() {
            if compiled.is_for(&metadata) {
                return Arc::clone(&compiled.patterns);
            }
        }

        let patterns = Arc::new(PatternList::from_entries(self.store.chunks().flatten()));
        debug!(
            generation = metadata.generation,
            patterns = patterns.len(),
            skipped = patterns.skipped(),
            "Compiled blocklist"
        );

        *self.cache.write() = Some(Compiled {
            generation: metadata.generation,
            refreshed_at: metadata.last_refresh_time,
            patterns: Arc::clone(&patterns),
        });
        patterns
    }

    /// Check an address against the blocklist
    pub fn is_banned(&self, email: &str) -> bool {
        self.patterns().matches_any(email)
    }

    /// Pattern that bans `email`, if any
    pub fn first_match(&self, email: &str) -> Option<String> {
        self.patterns().first_match(email).map(str::to_string)
    }

    /// Drop the compiled list so the next call rebuilds it
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }
}
