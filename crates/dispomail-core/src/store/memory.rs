//! In-process cache store

use super::{check_entry_size, KvStore};
use crate::error::Result;
use dashmap::DashMap;

/// Thread-safe in-memory key-value store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
    /// Per-entry byte ceiling (0 = unlimited)
    max_entry_bytes: usize,
}

impl MemoryStore {
    /// Create an unbounded store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects values larger than `limit` bytes
    pub fn with_max_entry_bytes(limit: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entry_bytes: limit,
        }
    }

    /// Check whether a key is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Sorted list of stored keys
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl KvStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn update(&self, key: &str, value: String) -> Result<()> {
        check_entry_size(key, &value, self.max_entry_bytes)?;
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_read_update_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.read("k").unwrap(), None);

        store.update("k", "v1".to_string()).unwrap();
        store.update("k", "v2".to_string()).unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);

        store.delete("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_missing_is_ok() {
        let store = MemoryStore::new();
        assert!(store.delete("nothing").is_ok());
    }

    #[test]
    fn test_entry_limit() {
        let store = MemoryStore::with_max_entry_bytes(8);
        assert!(store.update("small", "12345678".to_string()).is_ok());
        assert!(matches!(
            store.update("big", "123456789".to_string()),
            Err(Error::EntryTooLarge { .. })
        ));
        assert!(!store.contains_key("big"));
    }

    #[test]
    fn test_keys_sorted() {
        let store = MemoryStore::new();
        store.update("b", String::new()).unwrap();
        store.update("a", String::new()).unwrap();
        assert_eq!(store.keys(), vec!["a".to_string(), "b".to_string()]);
    }
}
