//! Refresh lock
//!
//! A flag in the shared cache telling every process that a commit is in
//! flight. The flag carries a lease: once `acquired_at + lease_secs` has
//! passed, the holder is presumed dead and the lock may be taken over.
//! This reduces, but does not rule out, two processes committing at once.

use crate::error::{Error, Result};
use crate::store::KvStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Stored lock value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Random token identifying the holder
    pub token: u64,
    /// Unix time the lock was taken
    pub acquired_at: i64,
    /// Lease length in seconds (0 = never expires)
    pub lease_secs: u64,
}

impl LockRecord {
    /// Check whether the lease has run out at `now`
    pub fn is_expired(&self, now: i64) -> bool {
        self.lease_secs > 0
            && now.saturating_sub(self.acquired_at) >= i64::try_from(self.lease_secs).unwrap_or(i64::MAX)
    }
}

/// Handle on the refresh lock entry
#[derive(Debug, Clone)]
pub struct RefreshLock {
    key: String,
    lease_secs: u64,
}

impl RefreshLock {
    /// Create a handle for `<prefix>_locked`
    pub fn new(prefix: &str, lease_secs: u64) -> Self {
        Self {
            key: format!("{prefix}_locked"),
            lease_secs,
        }
    }

    /// Cache key of the lock entry
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current lock record, if any.
    ///
    /// An unreadable entry is reported as absent; an entry that is present
    /// but not a valid record is treated as held forever (legacy flag).
    pub fn current<S: KvStore + ?Sized>(&self, store: &S) -> Option<LockRecord> {
        match store.read(&self.key) {
            Ok(Some(raw)) => Some(serde_json::from_str(&raw).unwrap_or(LockRecord {
                token: 0,
                acquired_at: 0,
                lease_secs: 0,
            })),
            Ok(None) => None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Failed to read refresh lock");
                None
            }
        }
    }

    /// Check whether a live (non-expired) lock is held
    pub fn is_held<S: KvStore + ?Sized>(&self, store: &S, now: i64) -> bool {
        self.current(store).is_some_and(|record| !record.is_expired(now))
    }

    /// Take the lock unless another holder's lease is still live.
    ///
    /// Returns `Ok(None)` when the lock is busy. The write is read back so
    /// that of two racing writers at most one proceeds.
    pub fn try_acquire<'a, S: KvStore + ?Sized>(
        &'a self,
        store: &'a S,
        now: i64,
    ) -> Result<Option<LockGuard<'a, S>>> {
        if let Some(existing) = self.current(store) {
            if !existing.is_expired(now) {
                debug!(key = %self.key, acquired_at = existing.acquired_at, "Refresh lock busy");
                return Ok(None);
            }
            warn!(
                key = %self.key,
                acquired_at = existing.acquired_at,
                lease_secs = existing.lease_secs,
                "Overriding stale refresh lock"
            );
        }

        let record = LockRecord {
            token: rand::random(),
            acquired_at: now,
            lease_secs: self.lease_secs,
        };
        store.update(&self.key, serde_json::to_string(&record)?)?;

        match self.current(store) {
            Some(stored) if stored.token == record.token => Ok(Some(LockGuard {
                store,
                key: &self.key,
                token: record.token,
                released: false,
            })),
            _ => Ok(None),
        }
    }

    /// Remove the lock regardless of holder
    pub fn force_release<S: KvStore + ?Sized>(&self, store: &S) -> Result<()> {
        store.delete(&self.key)
    }
}

/// Held refresh lock; released on [`LockGuard::release`] or drop
pub struct LockGuard<'a, S: KvStore + ?Sized> {
    store: &'a S,
    key: &'a str,
    token: u64,
    released: bool,
}

impl<S: KvStore + ?Sized> LockGuard<'_, S> {
    /// Token written by this holder
    pub fn token(&self) -> u64 {
        self.token
    }

    /// Release the lock, leaving it alone if another holder took it over
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.release_inner()
    }

    fn release_inner(&self) -> Result<()> {
        let raw = self.store.read(self.key)?;
        let ours = raw
            .as_deref()
            .and_then(|raw| serde_json::from_str::<LockRecord>(raw).ok())
            .is_some_and(|record| record.token == self.token);

        if ours {
            self.store.delete(self.key)
        } else if raw.is_some() {
            Err(Error::store(self.key, "lock was taken over by another holder"))
        } else {
            Ok(())
        }
    }
}

impl<S: KvStore + ?Sized> Drop for LockGuard<'_, S> {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.release_inner() {
                warn!(key = %self.key, error = %e, "Failed to release refresh lock");
            }
        }
    }
}
