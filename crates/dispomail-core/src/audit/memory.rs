//! In-process audit log

use super::{AuditLog, AuditLogEntry, NewAuditEntry};
use crate::error::Result;
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<AuditLogEntry>,
    next_id: u64,
}

/// Audit log kept in memory
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    inner: RwLock<Inner>,
}

impl MemoryAuditLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&self, entry: NewAuditEntry) -> Result<u64> {
        let mut inner = self.inner.write();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.entries.push(AuditLogEntry::assign(id, entry));
        Ok(id)
    }

    fn entries(&self) -> Result<Vec<AuditLogEntry>> {
        Ok(self.inner.read().entries.clone())
    }

    fn delete_all(&self) -> Result<usize> {
        let mut inner = self.inner.write();
        let removed = inner.entries.len();
        inner.entries.clear();
        Ok(removed)
    }

    fn delete(&self, ids: &[u64]) -> Result<usize> {
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner.entries.retain(|e| !ids.contains(&e.id));
        Ok(before - inner.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditAction, AuditQuery};

    fn blocked(email: &str, action: AuditAction, timestamp: i64) -> NewAuditEntry {
        NewAuditEntry {
            source_ip: Some("127.0.0.1".parse().unwrap()),
            email: email.to_string(),
            action,
            timestamp,
        }
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let log = MemoryAuditLog::new();
        let a = log.append(blocked("a@spam.com", AuditAction::LoginBlocked, 1)).unwrap();
        let b = log.append(blocked("b@spam.com", AuditAction::LoginBlocked, 2)).unwrap();
        assert!(b > a);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_delete_selected_and_all() {
        let log = MemoryAuditLog::new();
        let ids: Vec<u64> = (0..5)
            .map(|i| log.append(blocked("x@spam.com", AuditAction::RegisterBlocked, i)).unwrap())
            .collect();

        assert_eq!(log.delete(&[ids[0], ids[2], 999]).unwrap(), 2);
        assert_eq!(log.len(), 3);
        assert_eq!(log.delete_all().unwrap(), 3);
        assert!(log.is_empty());

        // ids are not reused after a purge
        let next = log.append(blocked("y@spam.com", AuditAction::LoginBlocked, 9)).unwrap();
        assert!(next > ids[4]);
    }

    #[test]
    fn test_query_through_trait() {
        let log = MemoryAuditLog::new();
        log.append(blocked("a@spam.com", AuditAction::LoginBlocked, 1)).unwrap();
        log.append(blocked("b@spam.com", AuditAction::RegisterBlocked, 2)).unwrap();

        let query = AuditQuery {
            action: Some(AuditAction::LoginBlocked),
            ..AuditQuery::default()
        };
        let page = log.query(&query, 1).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].email, "a@spam.com");

        assert_eq!(log.daily_counts(None, 365).unwrap()[0].count, 2);
    }
}
