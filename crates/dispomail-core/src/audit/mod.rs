//! Blocked-attempt audit log
//!
//! Append-only record of rejected logins and registrations, with the
//! administrative views on top of it: filtered paging, purge and per-day
//! statistics.

mod file;
mod memory;

pub use file::FileAuditLog;
pub use memory::MemoryAuditLog;

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::Arc;

/// Default page size of [`AuditQuery`]
pub const DEFAULT_PER_PAGE: usize = 20;

/// Longest statistics window, in days
pub const MAX_STAT_DAYS: usize = 365;

/// Kind of blocked attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AuditAction {
    /// Login with a disposable address
    LoginBlocked = 1,
    /// Registration with a disposable address
    RegisterBlocked = 2,
}

impl AuditAction {
    /// Stored numeric code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Short label
    pub fn label(self) -> &'static str {
        match self {
            Self::LoginBlocked => "login",
            Self::RegisterBlocked => "register",
        }
    }
}

impl From<AuditAction> for u8 {
    fn from(action: AuditAction) -> Self {
        action.code()
    }
}

impl TryFrom<u8> for AuditAction {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::LoginBlocked),
            2 => Ok(Self::RegisterBlocked),
            other => Err(Error::AuditLog(format!("unknown action code {other}"))),
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AuditAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "1" | "login" => Ok(Self::LoginBlocked),
            "2" | "register" | "registration" => Ok(Self::RegisterBlocked),
            _ => Err(Error::config_value(
                "action",
                format!("Unknown action '{s}'. Use 'login' or 'register'"),
            )),
        }
    }
}

/// Pack an address into its 4 or 16 byte network form
pub fn pack_ip(ip: IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

/// Unpack a 4 or 16 byte address
pub fn unpack_ip(bytes: &[u8]) -> Option<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        Some(IpAddr::V4(Ipv4Addr::from(octets)))
    } else if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        Some(IpAddr::V6(Ipv6Addr::from(octets)))
    } else {
        None
    }
}

/// Entry to be appended; the log assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    /// Client address, if known
    pub source_ip: Option<IpAddr>,
    /// Address that was rejected
    pub email: String,
    /// Kind of attempt
    pub action: AuditAction,
    /// Unix time of the attempt
    pub timestamp: i64,
}

/// Stored audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Log-assigned id, increasing
    pub id: u64,
    /// Client address, if known
    pub source_ip: Option<IpAddr>,
    /// Address that was rejected
    pub email: String,
    /// Kind of attempt
    pub action: AuditAction,
    /// Unix time of the attempt
    pub timestamp: i64,
}

impl AuditLogEntry {
    pub(crate) fn assign(id: u64, new: NewAuditEntry) -> Self {
        Self {
            id,
            source_ip: new.source_ip,
            email: new.email,
            action: new.action,
            timestamp: new.timestamp,
        }
    }

    /// Client address in packed network form (empty when unknown)
    pub fn packed_ip(&self) -> Vec<u8> {
        self.source_ip.map(pack_ip).unwrap_or_default()
    }

    /// UTC day of the attempt
    pub fn day(&self) -> Option<NaiveDate> {
        DateTime::<Utc>::from_timestamp(self.timestamp, 0).map(|dt| dt.date_naive())
    }
}

/// Listing order by timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recent first
    #[default]
    NewestFirst,
    /// Oldest first
    OldestFirst,
}

/// Listing filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditQuery {
    /// Exact client address (compared in packed form)
    pub ip: Option<IpAddr>,
    /// Case-insensitive substring of the email
    pub email: Option<String>,
    /// Only this kind of attempt
    pub action: Option<AuditAction>,
    /// Timestamp order
    pub order: SortOrder,
    /// Page size
    pub per_page: usize,
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            ip: None,
            email: None,
            action: None,
            order: SortOrder::default(),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl AuditQuery {
    /// Check whether an entry passes every set filter
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        if let Some(ip) = self.ip {
            if entry.packed_ip() != pack_ip(ip) {
                return false;
            }
        }
        if let Some(needle) = self.email.as_deref().filter(|n| !n.is_empty()) {
            if !entry.email.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        self.action.map_or(true, |action| entry.action == action)
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPage {
    /// Entries on this page
    pub entries: Vec<AuditLogEntry>,
    /// 1-based page number actually served
    pub page: usize,
    /// Number of pages for the filter
    pub pages: usize,
    /// Entries matching the filter
    pub total: usize,
}

/// Attempts on one UTC day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    /// UTC day
    pub day: NaiveDate,
    /// Attempts on that day
    pub count: u64,
}

/// Storage for blocked attempts
pub trait AuditLog: Send + Sync {
    /// Append an entry and return its id
    fn append(&self, entry: NewAuditEntry) -> Result<u64>;

    /// Every stored entry in insertion order
    fn entries(&self) -> Result<Vec<AuditLogEntry>>;

    /// Remove every entry, returning how many were removed
    fn delete_all(&self) -> Result<usize>;

    /// Remove the given ids, returning how many were removed
    fn delete(&self, ids: &[u64]) -> Result<usize>;

    /// Filtered, paged listing.
    ///
    /// Page 0 or a page past the end serves page 1.
    fn query(&self, filter: &AuditQuery, page: usize) -> Result<AuditPage> {
        Ok(paginate(self.entries()?, filter, page))
    }

    /// Attempts per UTC day, oldest day first, covering at most the
    /// `limit_days` most recent days that have entries
    fn daily_counts(&self, action: Option<AuditAction>, limit_days: usize) -> Result<Vec<DailyCount>> {
        Ok(count_by_day(&self.entries()?, action, limit_days))
    }
}

impl<L: AuditLog + ?Sized> AuditLog for Arc<L> {
    fn append(&self, entry: NewAuditEntry) -> Result<u64> {
        (**self).append(entry)
    }

    fn entries(&self) -> Result<Vec<AuditLogEntry>> {
        (**self).entries()
    }

    fn delete_all(&self) -> Result<usize> {
        (**self).delete_all()
    }

    fn delete(&self, ids: &[u64]) -> Result<usize> {
        (**self).delete(ids)
    }

    fn query(&self, filter: &AuditQuery, page: usize) -> Result<AuditPage> {
        (**self).query(filter, page)
    }

    fn daily_counts(&self, action: Option<AuditAction>, limit_days: usize) -> Result<Vec<DailyCount>> {
        (**self).daily_counts(action, limit_days)
    }
}

/// Apply a filter and cut out one page
pub fn paginate(entries: Vec<AuditLogEntry>, filter: &AuditQuery, page: usize) -> AuditPage {
    let per_page = filter.per_page.max(1);
    let mut matching: Vec<AuditLogEntry> = entries.into_iter().filter(|e| filter.matches(e)).collect();

    match filter.order {
        SortOrder::NewestFirst => {
            matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        }
        SortOrder::OldestFirst => {
            matching.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        }
    }

    let total = matching.len();
    let pages = total.div_ceil(per_page);
    let page = if page == 0 || page > pages { 1 } else { page };

    let entries = matching
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    AuditPage {
        entries,
        page,
        pages,
        total,
    }
}

/// Group entries by UTC day
pub fn count_by_day(
    entries: &[AuditLogEntry],
    action: Option<AuditAction>,
    limit_days: usize,
) -> Vec<DailyCount> {
    let limit = limit_days.min(MAX_STAT_DAYS);
    let mut days: BTreeMap<NaiveDate, u64> = BTreeMap::new();

    for entry in entries {
        if action.is_some_and(|a| a != entry.action) {
            continue;
        }
        if let Some(day) = entry.day() {
            *days.entry(day).or_default() += 1;
        }
    }

    let skip = days.len().saturating_sub(limit);
    days.into_iter()
        .skip(skip)
        .map(|(day, count)| DailyCount { day, count })
        .collect()
}
