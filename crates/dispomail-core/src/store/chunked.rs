//! Chunked blocklist storage
//!
//! A snapshot can hold hundreds of thousands of patterns, far more than a
//! cache backend accepts in one entry. The snapshot is split into chunks of
//! at most `chunk_size` entries, each stored under its own key:
//!
//! ```text
//! <prefix>_total_chunks          -> RefreshMetadata (JSON object)
//! <prefix>_chunk_<gen>_<index>   -> chunk (JSON array of strings)
//! ```
//!
//! Every commit writes a fresh generation of chunks first and then swaps
//! the metadata entry, which acts as the "current generation" pointer.
//! Readers follow the pointer they read, so they never see chunks from two
//! different snapshots.
//!
//! Generation ids are random. A commit that cannot read the previous
//! metadata must still never reuse the keys of a live generation.

use super::KvStore;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::snapshot::BlocklistSnapshot;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Upper bound on chunks walked by a reader, whatever the metadata claims
pub const MAX_CHUNKS: u64 = 1 << 20;

/// Metadata describing the committed blocklist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshMetadata {
    /// Unix time of the last successful commit (0 = never)
    pub last_refresh_time: i64,
    /// Number of chunks written; an upper bound for the read loop
    pub chunk_count: u64,
    /// Number of patterns in the snapshot
    pub entry_count: u64,
    /// Generation id the chunks are stored under
    pub generation: u64,
}

/// Blocklist layout on top of a [`KvStore`]
#[derive(Debug)]
pub struct ChunkedStore<S> {
    store: S,
    prefix: String,
    chunk_size: usize,
}

impl<S: KvStore> ChunkedStore<S> {
    /// Create from store configuration
    pub fn new(store: S, config: &StoreConfig) -> Self {
        Self::with_layout(store, &config.key_prefix, config.chunk_size)
    }

    /// Create with an explicit key prefix and chunk size
    pub fn with_layout(store: S, prefix: &str, chunk_size: usize) -> Self {
        Self {
            store,
            prefix: prefix.to_string(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Underlying key-value store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Key prefix shared by every entry
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Maximum entries per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Key of the metadata entry
    pub fn metadata_key(&self) -> String {
        format!("{}_total_chunks", self.prefix)
    }

    /// Key of one chunk
    pub fn chunk_key(&self, generation: u64, index: u64) -> String {
        format!("{}_chunk_{}_{}", self.prefix, generation, index)
    }

    /// Read the committed metadata.
    ///
    /// A missing, unreadable or undecodable entry is reported as `None`.
    pub fn metadata(&self) -> Option<RefreshMetadata> {
        let key = self.metadata_key();
        let raw = match self.store.read(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read blocklist metadata");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring undecodable blocklist metadata");
                None
            }
        }
    }

    /// Store a snapshot as a new generation and make it current.
    ///
    /// On error the previous generation stays current and any chunks
    /// already written for the new generation are removed.
    pub fn commit(&self, snapshot: &BlocklistSnapshot, now: i64) -> Result<RefreshMetadata> {
        let previous = self.metadata();
        let generation = new_generation(previous.map(|m| m.generation));

        let mut written = 0u64;
        for (index, chunk) in snapshot.chunks(self.chunk_size).enumerate() {
            let key = self.chunk_key(generation, index as u64);
            let result = serde_json::to_string(chunk)
                .map_err(Error::from)
                .and_then(|value| self.store.update(&key, value));

            if let Err(e) = result {
                warn!(key = %key, error = %e, "Chunk write failed, abandoning commit");
                self.delete_chunks(generation, written);
                return Err(e);
            }
            written += 1;
        }

        // the read loop is inclusive, so the slot past the end must be empty
        let tail = self.chunk_key(generation, written);
        if let Err(e) = self.store.delete(&tail) {
            warn!(key = %tail, error = %e, "Failed to clear tail chunk, abandoning commit");
            self.delete_chunks(generation, written);
            return Err(e);
        }

        let metadata = RefreshMetadata {
            last_refresh_time: now,
            chunk_count: written,
            entry_count: snapshot.len() as u64,
            generation,
        };

        let swap = serde_json::to_string(&metadata)
            .map_err(Error::from)
            .and_then(|value| self.store.update(&self.metadata_key(), value));
        if let Err(e) = swap {
            warn!(error = %e, "Metadata write failed, abandoning commit");
            self.delete_chunks(generation, written);
            return Err(e);
        }

        if let Some(old) = previous {
            if old.generation != generation {
                self.delete_chunks(old.generation, old.chunk_count.saturating_add(1));
            }
        }

        info!(
            entries = metadata.entry_count,
            chunks = metadata.chunk_count,
            generation,
            "Committed blocklist snapshot"
        );
        Ok(metadata)
    }

    /// Lazily read the chunks of the current generation.
    ///
    /// Each call starts over from the metadata, so the iterator can be
    /// restarted by calling this again.
    pub fn chunks(&self) -> ChunkIter<'_, S> {
        let (generation, last) = match self.metadata() {
            Some(m) => {
                // every written chunk holds at least one entry
                let last = m.chunk_count.min(m.entry_count).min(MAX_CHUNKS);
                if last < m.chunk_count {
                    warn!(
                        chunk_count = m.chunk_count,
                        entry_count = m.entry_count,
                        "Chunk count exceeds entry count, capping read loop"
                    );
                }
                (m.generation, Some(last))
            }
            None => (0, None),
        };

        ChunkIter {
            owner: self,
            generation,
            next: 0,
            last,
        }
    }

    /// Read every pattern of the current generation, in snapshot order
    pub fn read_all(&self) -> Vec<String> {
        self.chunks().flatten().collect()
    }

    /// Remove the current generation and its metadata
    pub fn clear(&self) -> Result<()> {
        if let Some(metadata) = self.metadata() {
            self.store.delete(&self.metadata_key())?;
            self.delete_chunks(metadata.generation, metadata.chunk_count.saturating_add(1));
        }
        Ok(())
    }

    fn read_chunk(&self, generation: u64, index: u64) -> Vec<String> {
        let key = self.chunk_key(generation, index);
        match self.store.read(&key) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(key = %key, error = %e, "Ignoring undecodable chunk");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read chunk");
                Vec::new()
            }
        }
    }

    /// Best-effort removal of chunks `0..count` of a generation
    fn delete_chunks(&self, generation: u64, count: u64) {
        for index in 0..count {
            let key = self.chunk_key(generation, index);
            if let Err(e) = self.store.delete(&key) {
                debug!(key = %key, error = %e, "Failed to delete stale chunk");
            }
        }
    }
}

/// Pick a non-zero generation id different from `previous`
fn new_generation(previous: Option<u64>) -> u64 {
    loop {
        let candidate = rand::random::<u64>();
        if candidate != 0 && Some(candidate) != previous {
            return candidate;
        }
    }
}

/// Iterator over the chunks of one generation
///
/// Yields one `Vec` per index in `0..=chunk_count`; a missing chunk yields
/// an empty `Vec`. The bound is capped at `entry_count` and [`MAX_CHUNKS`].
pub struct ChunkIter<'a, S> {
    owner: &'a ChunkedStore<S>,
    generation: u64,
    next: u64,
    last: Option<u64>,
}

impl<S: KvStore> Iterator for ChunkIter<'_, S> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let last = self.last?;
        if self.next > last {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.owner.read_chunk(self.generation, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn snapshot(n: usize) -> BlocklistSnapshot {
        BlocklistSnapshot::new((0..n).map(|i| format!("domain{i}.com")).collect())
    }

    #[test]
    fn test_commit_and_read_all() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 3);
        let snap = snapshot(7);

        let metadata = store.commit(&snap, 1_000).unwrap();
        assert_eq!(metadata.chunk_count, 3);
        assert_eq!(metadata.entry_count, 7);
        assert_eq!(metadata.last_refresh_time, 1_000);
        assert_eq!(store.metadata(), Some(metadata));

        assert_eq!(store.read_all(), snap.entries().to_vec());
    }

    #[test]
    fn test_read_loop_is_inclusive_upper_bound() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 2);
        store.commit(&snapshot(4), 1).unwrap();

        // 2 real chunks, indices 0..=2 read, last one missing
        let sizes: Vec<usize> = store.chunks().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![2, 2, 0]);
    }

    #[test]
    fn test_missing_chunk_yields_empty_slice() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 2);
        let metadata = store.commit(&snapshot(6), 1).unwrap();
        store
            .store()
            .delete(&store.chunk_key(metadata.generation, 1))
            .unwrap();

        let all = store.read_all();
        assert_eq!(all, vec!["domain0.com", "domain1.com", "domain4.com", "domain5.com"]);
    }

    #[test]
    fn test_no_metadata_reads_nothing() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 2);
        assert_eq!(store.metadata(), None);
        assert!(store.read_all().is_empty());
        assert_eq!(store.chunks().count(), 0);
    }

    #[test]
    fn test_corrupt_metadata_is_ignored() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 2);
        store
            .store()
            .update(&store.metadata_key(), "not json".to_string())
            .unwrap();
        assert_eq!(store.metadata(), None);
        assert!(store.read_all().is_empty());
    }

    #[test]
    fn test_corrupt_chunk_is_skipped() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 2);
        let metadata = store.commit(&snapshot(4), 1).unwrap();
        store
            .store()
            .update(&store.chunk_key(metadata.generation, 0), "{".to_string())
            .unwrap();
        assert_eq!(store.read_all(), vec!["domain2.com", "domain3.com"]);
    }

    #[test]
    fn test_new_generation_replaces_old_chunks() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 2);
        let first = store.commit(&snapshot(5), 1).unwrap();
        let second = store
            .commit(&BlocklistSnapshot::new(vec!["only.io".to_string()]), 2)
            .unwrap();

        assert_ne!(second.generation, first.generation);
        assert_eq!(store.read_all(), vec!["only.io".to_string()]);
        for index in 0..first.chunk_count {
            assert!(!store.store().contains_key(&store.chunk_key(first.generation, index)));
        }
        // metadata + one chunk
        assert_eq!(store.store().len(), 2);
    }

    #[test]
    fn test_failed_commit_keeps_previous_snapshot() {
        // small chunks fit, a chunk of long entries does not
        let store = ChunkedStore::with_layout(MemoryStore::with_max_entry_bytes(128), "t", 2);
        let good = store.commit(&snapshot(3), 1).unwrap();

        let long = BlocklistSnapshot::new(vec!["a.com".to_string(), "b".repeat(200)]);
        let err = store.commit(&long, 2).unwrap_err();
        assert!(matches!(err, Error::EntryTooLarge { .. }));

        assert_eq!(store.metadata(), Some(good));
        assert_eq!(store.read_all(), snapshot(3).entries().to_vec());
        // metadata + two chunks of the good snapshot
        assert_eq!(store.store().len(), 3);
    }

    #[test]
    fn test_commit_after_corrupt_metadata_drops_old_entries() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 2);
        store
            .commit(
                &["a.com", "b.com", "c.com", "d.com", "e.com"]
                    .into_iter()
                    .collect::<BlocklistSnapshot>(),
                1,
            )
            .unwrap();
        store
            .store()
            .update(&store.metadata_key(), "garbage".to_string())
            .unwrap();

        store
            .commit(&BlocklistSnapshot::new(vec!["only.io".to_string()]), 2)
            .unwrap();
        assert_eq!(store.read_all(), vec!["only.io".to_string()]);
    }

    #[test]
    fn test_stale_tail_chunk_is_not_read() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 2);
        let metadata = store.commit(&snapshot(2), 1).unwrap();
        // a leftover at the inclusive bound of the live generation
        store
            .store()
            .update(
                &store.chunk_key(metadata.generation, metadata.chunk_count),
                r#"["ghost.com"]"#.to_string(),
            )
            .unwrap();
        assert!(store.read_all().contains(&"ghost.com".to_string()));

        let next = store.commit(&snapshot(2), 2).unwrap();
        assert!(!store
            .store()
            .contains_key(&store.chunk_key(next.generation, next.chunk_count)));
        assert_eq!(store.read_all(), snapshot(2).entries().to_vec());
    }

    #[test]
    fn test_absurd_chunk_count_is_capped() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 2);
        let metadata = store.commit(&snapshot(3), 1).unwrap();
        let forged = RefreshMetadata {
            chunk_count: u64::MAX,
            ..metadata
        };
        store
            .store()
            .update(&store.metadata_key(), serde_json::to_string(&forged).unwrap())
            .unwrap();

        // capped at entry_count (3), so indices 0..=3
        assert_eq!(store.chunks().count(), 4);
        assert_eq!(store.read_all(), snapshot(3).entries().to_vec());
    }

    #[test]
    fn test_generation_ids_differ() {
        for _ in 0..100 {
            let previous = rand::random::<u64>();
            let next = new_generation(Some(previous));
            assert_ne!(next, previous);
            assert_ne!(next, 0);
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 2);
        let metadata = store.commit(&BlocklistSnapshot::default(), 9).unwrap();
        assert_eq!(metadata.chunk_count, 0);
        assert_eq!(metadata.last_refresh_time, 9);
        assert!(store.read_all().is_empty());
    }

    #[test]
    fn test_clear() {
        let store = ChunkedStore::with_layout(MemoryStore::new(), "t", 2);
        store.commit(&snapshot(3), 1).unwrap();
        store.clear().unwrap();
        assert!(store.store().is_empty());
        assert_eq!(store.metadata(), None);
    }

    #[test]
    fn test_keys_use_prefix() {
        let store = ChunkedStore::new(MemoryStore::new(), &StoreConfig::default());
        assert_eq!(store.metadata_key(), "dispomail_total_chunks");
        assert_eq!(store.chunk_key(4, 2), "dispomail_chunk_4_2");
        assert_eq!(store.chunk_size(), 2000);
    }
}
