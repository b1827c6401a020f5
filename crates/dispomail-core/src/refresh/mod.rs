//! Refresh scheduler
//!
//! Driven by a periodic trigger (`tick`). Most ticks are cheap: they read
//! the metadata entry, find the snapshot fresh and return. When the
//! snapshot is stale the scheduler fetches the provider list and commits
//! it under the refresh lock.
//!
//! ```text
//! Idle -> DueCheck -> Fetching -> Committing -> Idle
//!            \-> Idle (not due / locked)
//! ```

mod lock;

pub use lock::{LockGuard, LockRecord, RefreshLock};

use crate::clock::{Clock, SystemClock};
use crate::config::{Config, Provider, RefreshConfig};
use crate::source::Fetcher;
use crate::store::{ChunkedStore, KvStore, RefreshMetadata};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{debug, info, instrument, warn};

/// Scheduler phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RefreshState {
    /// Waiting for the next trigger
    Idle = 0,
    /// Reading metadata to decide whether to refresh
    DueCheck = 1,
    /// Waiting on the remote source
    Fetching = 2,
    /// Writing chunks under the refresh lock
    Committing = 3,
}

impl RefreshState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::DueCheck,
            2 => Self::Fetching,
            3 => Self::Committing,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::DueCheck => "due-check",
            Self::Fetching => "fetching",
            Self::Committing => "committing",
        };
        f.write_str(name)
    }
}

/// Result of one trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Refresh task is switched off
    Disabled,
    /// Another tick in this process is still running
    InProgress,
    /// Snapshot is fresh
    NotDue {
        /// Unix time the snapshot becomes stale
        next_due: i64,
    },
    /// Another process holds the refresh lock
    Locked,
    /// Provider unknown, unreachable or returned nothing
    NoData,
    /// A new snapshot was committed
    Refreshed(RefreshMetadata),
    /// Commit failed; the previous snapshot is still current
    Failed(String),
}

impl TickOutcome {
    /// Whether this tick committed a snapshot
    pub fn is_refreshed(&self) -> bool {
        matches!(self, Self::Refreshed(_))
    }
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "refresh task is disabled"),
            Self::InProgress => write!(f, "a refresh is already running"),
            Self::NotDue { next_due } => write!(f, "not due until {next_due}"),
            Self::Locked => write!(f, "refresh lock is held elsewhere"),
            Self::NoData => write!(f, "no data from provider"),
            Self::Refreshed(m) => write!(
                f,
                "refreshed {} entries in {} chunks (generation {})",
                m.entry_count, m.chunk_count, m.generation
            ),
            Self::Failed(reason) => write!(f, "refresh failed: {reason}"),
        }
    }
}

/// Snapshot of scheduler and storage state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshStatus {
    /// Refresh task switch
    pub enabled: bool,
    /// Configured provider, `None` if the id is unknown
    pub provider: Option<Provider>,
    /// In-process phase
    pub state: RefreshState,
    /// Committed metadata
    pub metadata: Option<RefreshMetadata>,
    /// Unix time the snapshot becomes stale, `None` if never refreshed
    pub next_due: Option<i64>,
    /// Whether a tick now would refresh
    pub due: bool,
    /// Lock entry, live or stale
    pub lock: Option<LockRecord>,
    /// Whether the lock entry is live
    pub lock_held: bool,
}

/// Check whether a snapshot is stale.
///
/// Due when nothing was ever committed or when `interval_secs` or more have
/// elapsed since the last commit.
pub fn is_due(metadata: Option<RefreshMetadata>, now: i64, interval_secs: i64) -> bool {
    match metadata {
        Some(m) if m.last_refresh_time != 0 => {
            now.saturating_sub(m.last_refresh_time) >= interval_secs
        }
        _ => true,
    }
}

/// Unix time a snapshot becomes stale
pub fn next_due(metadata: Option<RefreshMetadata>, interval_secs: i64) -> Option<i64> {
    metadata
        .filter(|m| m.last_refresh_time != 0)
        .map(|m| m.last_refresh_time.saturating_add(interval_secs))
}

/// Periodic blocklist refresher
pub struct RefreshScheduler<S, F, C = SystemClock> {
    config: RefreshConfig,
    store: ChunkedStore<S>,
    lock: RefreshLock,
    fetcher: F,
    clock: C,
    state: AtomicU8,
    running: Mutex<()>,
}

impl<S, F> RefreshScheduler<S, F, SystemClock>
where
    S: KvStore,
    F: Fetcher,
{
    /// Create a scheduler on the wall clock
    pub fn new(config: &Config, store: S, fetcher: F) -> Self {
        Self::with_clock(config, store, fetcher, SystemClock)
    }
}

impl<S, F, C> RefreshScheduler<S, F, C>
where
    S: KvStore,
    F: Fetcher,
    C: Clock,
{
    /// Create a scheduler with an explicit clock
    pub fn with_clock(config: &Config, store: S, fetcher: F, clock: C) -> Self {
        Self {
            config: config.refresh.clone(),
            store: ChunkedStore::new(store, &config.store),
            lock: RefreshLock::new(&config.store.key_prefix, config.refresh.lock_lease_secs),
            fetcher,
            clock,
            state: AtomicU8::new(RefreshState::Idle as u8),
            running: Mutex::new(()),
        }
    }

    /// Chunked storage written by this scheduler
    pub fn store(&self) -> &ChunkedStore<S> {
        &self.store
    }

    /// Refresh lock handle
    pub fn lock(&self) -> &RefreshLock {
        &self.lock
    }

    /// Refresh settings
    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    /// Current phase
    pub fn state(&self) -> RefreshState {
        RefreshState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Handle one periodic trigger
    #[instrument(skip(self), fields(provider = self.config.provider))]
    pub fn tick(&self) -> TickOutcome {
        if !self.config.enabled {
            debug!("Refresh task disabled");
            return TickOutcome::Disabled;
        }
        self.run(false)
    }

    /// Refresh regardless of staleness or the enabled switch
    #[instrument(skip(self), fields(provider = self.config.provider))]
    pub fn refresh_now(&self) -> TickOutcome {
        self.run(true)
    }

    /// Report metadata, staleness and lock state
    pub fn status(&self) -> RefreshStatus {
        let now = self.clock.now();
        let interval = self.config.interval_secs();
        let metadata = self.store.metadata();
        let lock = self.lock.current(self.store.store());

        RefreshStatus {
            enabled: self.config.enabled,
            provider: self.config.provider(),
            state: self.state(),
            metadata,
            next_due: next_due(metadata, interval),
            due: is_due(metadata, now, interval),
            lock,
            lock_held: lock.is_some_and(|record| !record.is_expired(now)),
        }
    }

    fn run(&self, force: bool) -> TickOutcome {
        let Some(_running) = self.running.try_lock() else {
            debug!("Tick skipped, previous tick still running");
            return TickOutcome::InProgress;
        };

        let outcome = self.run_exclusive(force);
        self.set_state(RefreshState::Idle);

        match &outcome {
            TickOutcome::Refreshed(_) | TickOutcome::NotDue { .. } => {
                debug!(outcome = %outcome, "Tick finished");
            }
            TickOutcome::Failed(_) => warn!(outcome = %outcome, "Tick finished"),
            _ => info!(outcome = %outcome, "Tick finished"),
        }
        outcome
    }

    fn run_exclusive(&self, force: bool) -> TickOutcome {
        self.set_state(RefreshState::DueCheck);
        let interval = self.config.interval_secs();
        let now = self.clock.now();

        if !force {
            let metadata = self.store.metadata();
            if !is_due(metadata, now, interval) {
                return TickOutcome::NotDue {
                    next_due: next_due(metadata, interval).unwrap_or(now),
                };
            }
        }

        if self.lock.is_held(self.store.store(), now) {
            return TickOutcome::Locked;
        }

        let Some(provider) = self.config.provider() else {
            warn!(provider = self.config.provider, "Unknown provider, skipping fetch");
            return TickOutcome::NoData;
        };

        self.set_state(RefreshState::Fetching);
        let snapshot = match self.fetcher.fetch(provider.url()) {
            Some(snapshot) if !snapshot.is_empty() => snapshot,
            Some(_) => {
                warn!(provider = %provider, "Provider returned an empty list");
                return TickOutcome::NoData;
            }
            None => return TickOutcome::NoData,
        };

        self.set_state(RefreshState::Committing);
        let now = self.clock.now();
        let guard = match self.lock.try_acquire(self.store.store(), now) {
            Ok(Some(guard)) => guard,
            Ok(None) => return TickOutcome::Locked,
            Err(e) => return TickOutcome::Failed(e.to_string()),
        };

        if !force {
            let metadata = self.store.metadata();
            if !is_due(metadata, now, interval) {
                debug!("Snapshot committed elsewhere while fetching");
                release(guard);
                return TickOutcome::NotDue {
                    next_due: next_due(metadata, interval).unwrap_or(now),
                };
            }
        }

        let result = self.store.commit(&snapshot, now);
        release(guard);

        match result {
            Ok(metadata) => TickOutcome::Refreshed(metadata),
            Err(e) => TickOutcome::Failed(e.to_string()),
        }
    }

    fn set_state(&self, state: RefreshState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

fn release<S: KvStore + ?Sized>(guard: LockGuard<'_, S>) {
    if let Err(e) = guard.release() {
        warn!(error = %e, "Failed to release refresh lock");
    }
}
