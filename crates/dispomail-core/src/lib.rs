//! # dispomail core
//!
//! Fetch, cache and match engine for disposable email blocklists.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Pattern matching** - wildcard domain patterns matched against emails
//! - **Chunked storage** - large lists split across a size-limited cache
//! - **Refresh scheduling** - periodic, locked, idempotent list refresh
//! - **Admission checks** - login/registration gate with an audit trail
//! - **Configuration** - TOML settings for every component
//!
//! ## Example
//!
//! ```rust,no_run
//! use dispomail_core::{AdmissionGuard, Config, HttpFetcher, MemoryAuditLog, MemoryStore};
//! use dispomail_core::{RefreshScheduler, UserAction};
//! use std::sync::Arc;
//!
//! let config = Config::load("dispomail.toml")?;
//! let store = Arc::new(MemoryStore::new());
//!
//! let scheduler = RefreshScheduler::new(&config, Arc::clone(&store), HttpFetcher::new(&config.source)?);
//! println!("{}", scheduler.tick());
//!
//! let guard = AdmissionGuard::new(&config, store, MemoryAuditLog::new());
//! let verdict = guard.check(UserAction::Register, "someone@mailinator.com", None);
//! # Ok::<(), dispomail_core::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod admission;
pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod gate;
pub mod refresh;
pub mod snapshot;
pub mod source;
pub mod store;

// Re-exports for convenience
pub use admission::{Admission, AdmissionGuard, UserAction};
pub use audit::{AuditAction, AuditLog, AuditLogEntry, AuditQuery, FileAuditLog, MemoryAuditLog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, Provider};
pub use error::{Error, Result};
pub use filter::{matches, PatternList};
pub use gate::QueryGate;
pub use refresh::{RefreshScheduler, RefreshStatus, TickOutcome};
pub use snapshot::BlocklistSnapshot;
pub use source::{Fetcher, HttpFetcher};
pub use store::{ChunkedStore, FileStore, KvStore, MemoryStore, RefreshMetadata};
