//! Key-value cache store
//!
//! The host's generic cache is modelled as a plain read/update/delete
//! interface with no transactions and no key listing. Two backends ship
//! with the crate:
//! - [`MemoryStore`]: in-process, optional per-entry byte ceiling
//! - [`FileStore`]: one file per key, replaced atomically on update
//!
//! [`ChunkedStore`] builds the blocklist layout on top of any backend.

mod chunked;
mod file;
mod memory;

pub use chunked::{ChunkIter, ChunkedStore, RefreshMetadata};
pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::{Error, Result};
use std::sync::Arc;

/// Generic cache store capability
pub trait KvStore: Send + Sync {
    /// Read a value, `None` when the key is absent
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Create or replace a value
    fn update(&self, key: &str, value: String) -> Result<()>;

    /// Remove a value; removing a missing key is not an error
    fn delete(&self, key: &str) -> Result<()>;
}

impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }

    fn update(&self, key: &str, value: String) -> Result<()> {
        (**self).update(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn read(&self, key: &str) -> Result<Option<String>> {
        (**self).read(key)
    }

    fn update(&self, key: &str, value: String) -> Result<()> {
        (**self).update(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}

/// Reject keys that are empty or contain anything but `[A-Za-z0-9_-]`
pub(crate) fn validate_key(key: &str) -> Result<()> {
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Enforce a per-entry byte ceiling (0 = unlimited)
pub(crate) fn check_entry_size(key: &str, value: &str, limit: usize) -> Result<()> {
    if limit > 0 && value.len() > limit {
        return Err(Error::EntryTooLarge {
            key: key.to_string(),
            size: value.len(),
            limit,
        });
    }
    Ok(())
}
