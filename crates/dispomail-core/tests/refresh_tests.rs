//! Integration tests for the refresh cycle and query path

use dispomail_core::config::SECS_PER_DAY;
use dispomail_core::refresh::RefreshLock;
use dispomail_core::{
    BlocklistSnapshot, Config, Fetcher, FileStore, ManualClock, MemoryStore, QueryGate,
    RefreshScheduler, TickOutcome,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const NOW: i64 = 1_700_000_000;

/// Fetcher serving a fixed list and counting calls
struct StaticFetcher {
    entries: Option<Vec<&'static str>>,
    calls: AtomicUsize,
}

impl StaticFetcher {
    fn serving(entries: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            entries: Some(entries.to_vec()),
            calls: AtomicUsize::new(0),
        })
    }

    fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            entries: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, _url: &str) -> Option<BlocklistSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .as_ref()
            .map(|entries| entries.iter().copied().collect())
    }
}

fn setup(
    fetcher: Arc<StaticFetcher>,
) -> (
    RefreshScheduler<Arc<MemoryStore>, Arc<StaticFetcher>, ManualClock>,
    QueryGate<Arc<MemoryStore>>,
    Arc<MemoryStore>,
    ManualClock,
) {
    let config = Config::default();
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(NOW);
    let scheduler =
        RefreshScheduler::with_clock(&config, Arc::clone(&store), fetcher, clock.clone());
    let gate = QueryGate::new(Arc::clone(&store), &config.store);
    (scheduler, gate, store, clock)
}

#[test]
fn test_end_to_end_single_tick() {
    let fetcher = StaticFetcher::serving(&["spam.com", "*@tempmail.io"]);
    let (scheduler, gate, _, _) = setup(Arc::clone(&fetcher));

    assert!(!gate.is_banned("a@spam.com"));
    assert!(scheduler.tick().is_refreshed());

    assert!(gate.is_banned("a@spam.com"));
    assert!(gate.is_banned("x@tempmail.io"));
    assert!(!gate.is_banned("x@real.com"));
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_ticks_within_interval_fetch_once() {
    let fetcher = StaticFetcher::serving(&["spam.com"]);
    let (scheduler, _, _, clock) = setup(Arc::clone(&fetcher));

    assert!(scheduler.tick().is_refreshed());
    let first = scheduler.store().metadata().unwrap();

    clock.advance(3600);
    assert!(matches!(scheduler.tick(), TickOutcome::NotDue { .. }));

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(scheduler.store().metadata().unwrap(), first);
}

#[test]
fn test_staleness_boundary() {
    let interval = 30 * SECS_PER_DAY;

    let fetcher = StaticFetcher::serving(&["spam.com"]);
    let (scheduler, _, _, clock) = setup(Arc::clone(&fetcher));
    clock.set(NOW - interval - 1);
    assert!(scheduler.tick().is_refreshed());
    clock.set(NOW);
    assert!(scheduler.tick().is_refreshed());
    assert_eq!(fetcher.calls(), 2);

    let fetcher = StaticFetcher::serving(&["spam.com"]);
    let (scheduler, _, _, clock) = setup(Arc::clone(&fetcher));
    clock.set(NOW - interval + 1);
    assert!(scheduler.tick().is_refreshed());
    clock.set(NOW);
    assert_eq!(
        scheduler.tick(),
        TickOutcome::NotDue {
            next_due: NOW + 1
        }
    );
    assert_eq!(fetcher.calls(), 1);
}

#[test]
fn test_unreachable_source_retries_next_tick() {
    let fetcher = StaticFetcher::unreachable();
    let (scheduler, gate, store, clock) = setup(Arc::clone(&fetcher));

    assert_eq!(scheduler.tick(), TickOutcome::NoData);
    clock.advance(3600);
    assert_eq!(scheduler.tick(), TickOutcome::NoData);

    assert_eq!(fetcher.calls(), 2);
    assert!(store.is_empty());
    assert!(!gate.is_banned("a@spam.com"));
}

#[test]
fn test_live_lock_returns_locked_without_fetching() {
    let fetcher = StaticFetcher::serving(&["spam.com"]);
    let (scheduler, _, store, _) = setup(Arc::clone(&fetcher));

    let other = RefreshLock::new("dispomail", 600);
    let _held = other.try_acquire(&*store, NOW - 10).unwrap().unwrap();

    assert_eq!(scheduler.tick(), TickOutcome::Locked);
    assert_eq!(fetcher.calls(), 0);
}

#[test]
fn test_stale_lock_is_overridden() {
    let fetcher = StaticFetcher::serving(&["spam.com"]);
    let (scheduler, gate, store, _) = setup(Arc::clone(&fetcher));

    let crashed = RefreshLock::new("dispomail", 600);
    std::mem::forget(crashed.try_acquire(&*store, NOW - 601).unwrap().unwrap());

    assert!(scheduler.tick().is_refreshed());
    assert!(gate.is_banned("a@spam.com"));
    assert!(!scheduler.lock().is_held(&*store, NOW));
}

#[test]
fn test_commit_failure_releases_lock_and_keeps_snapshot() {
    let mut config = Config::default();
    config.store.chunk_size = 2;
    let store = Arc::new(MemoryStore::with_max_entry_bytes(160));
    let clock = ManualClock::new(NOW);

    let good = RefreshScheduler::with_clock(
        &config,
        Arc::clone(&store),
        StaticFetcher::serving(&["spam.com", "junk.org", "*@tempmail.io"]),
        clock.clone(),
    );
    assert!(good.tick().is_refreshed());
    let before = good.store().metadata().unwrap();

    let long: &'static str = Box::leak("x".repeat(300).into_boxed_str());
    let bad = RefreshScheduler::with_clock(
        &config,
        Arc::clone(&store),
        StaticFetcher::serving(&["a.com", long]),
        clock.clone(),
    );
    assert!(matches!(bad.refresh_now(), TickOutcome::Failed(_)));

    assert!(!bad.lock().is_held(&*store, NOW));
    assert_eq!(bad.store().metadata(), Some(before));
    let gate = QueryGate::new(Arc::clone(&store), &config.store);
    assert!(gate.is_banned("x@tempmail.io"));
}

#[test]
fn test_file_store_shared_between_processes() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = Config::default();

    let writer = RefreshScheduler::with_clock(
        &config,
        FileStore::open(dir.path()).unwrap(),
        StaticFetcher::serving(&["spam.com", "*@tempmail.io"]),
        ManualClock::new(NOW),
    );
    assert!(writer.tick().is_refreshed());

    let reader = QueryGate::new(FileStore::open(dir.path()).unwrap(), &config.store);
    assert!(reader.is_banned("someone@SPAM.com"));
    assert!(reader.is_banned("x@tempmail.io"));
    assert!(!reader.is_banned("x@real.com"));
}
