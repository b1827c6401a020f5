//! Admission guard
//!
//! Front-door checks for logins and registrations. Combines the query
//! gate, the gate settings and the audit log into one call per user
//! action.

use crate::audit::{AuditAction, AuditLog, NewAuditEntry};
use crate::clock::{Clock, SystemClock};
use crate::config::{Config, GateConfig};
use crate::gate::QueryGate;
use crate::refresh::RefreshLock;
use crate::store::KvStore;
use std::fmt;
use std::net::IpAddr;
use tracing::{debug, info, warn};

/// User action being admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Sign in with an existing account
    Login,
    /// Create a new account
    Register,
}

impl UserAction {
    /// Audit record kind for a rejection of this action
    pub fn audit_action(self) -> AuditAction {
        match self {
            Self::Login => AuditAction::LoginBlocked,
            Self::Register => AuditAction::RegisterBlocked,
        }
    }
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => f.write_str("login"),
            Self::Register => f.write_str("register"),
        }
    }
}

/// Verdict for one user action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Let the action proceed
    Allowed,
    /// Refuse with a user-facing message
    Rejected {
        /// Message to show the user
        message: String,
    },
}

impl Admission {
    /// Check if the action was refused
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Login and registration checks
pub struct AdmissionGuard<S, L, C = SystemClock> {
    gate: QueryGate<S>,
    lock: RefreshLock,
    audit: L,
    config: GateConfig,
    refresh_enabled: bool,
    clock: C,
}

impl<S: KvStore, L: AuditLog> AdmissionGuard<S, L, SystemClock> {
    /// Create a guard on the wall clock
    pub fn new(config: &Config, store: S, audit: L) -> Self {
        Self::with_clock(config, store, audit, SystemClock)
    }
}

impl<S: KvStore, L: AuditLog, C: Clock> AdmissionGuard<S, L, C> {
    /// Create a guard with an explicit clock
    pub fn with_clock(config: &Config, store: S, audit: L, clock: C) -> Self {
        Self {
            gate: QueryGate::new(store, &config.store),
            lock: RefreshLock::new(&config.store.key_prefix, config.refresh.lock_lease_secs),
            audit,
            config: config.gate.clone(),
            refresh_enabled: config.refresh.enabled,
            clock,
        }
    }

    /// Query gate used for lookups
    pub fn gate(&self) -> &QueryGate<S> {
        &self.gate
    }

    /// Audit log rejections are written to
    pub fn audit(&self) -> &L {
        &self.audit
    }

    /// Decide whether `action` may proceed for `email`.
    ///
    /// Only actions switched on in the gate settings are checked. A
    /// rejection is written to the audit log when `log_actions` is set;
    /// a failed write is logged and otherwise ignored.
    pub fn check(&self, action: UserAction, email: &str, source_ip: Option<IpAddr>) -> Admission {
        let enabled = match action {
            UserAction::Login => self.config.block_on_login,
            UserAction::Register => self.config.block_on_register,
        };
        if !enabled {
            return Admission::Allowed;
        }

        let email = email.trim();
        if email.is_empty() {
            return Admission::Allowed;
        }

        let Some(pattern) = self.gate.first_match(email) else {
            debug!(%action, email, "Address allowed");
            return Admission::Allowed;
        };

        info!(%action, email, pattern = %pattern, "Blocked disposable address");

        if self.config.log_actions {
            let entry = NewAuditEntry {
                source_ip,
                email: email.to_string(),
                action: action.audit_action(),
                timestamp: self.clock.now(),
            };
            if let Err(e) = self.audit.append(entry) {
                warn!(error = %e, "Failed to write audit entry");
            }
        }

        Admission::Rejected {
            message: rejection_message(action, email),
        }
    }

    /// Check if the site should be closed while a refresh commits.
    ///
    /// Only honoured while the refresh task is enabled.
    pub fn site_degraded(&self) -> bool {
        self.refresh_enabled
            && self.config.close_site_while_refreshing
            && self.lock.is_held(self.gate.store().store(), self.clock.now())
    }
}

fn rejection_message(action: UserAction, email: &str) -> String {
    match action {
        UserAction::Login => format!(
            "You cannot log in with {email}: disposable email addresses are not allowed."
        ),
        UserAction::Register => format!(
            "You cannot register with {email}: disposable email addresses are not allowed."
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditLog;
    use crate::clock::ManualClock;
    use crate::snapshot::BlocklistSnapshot;
    use crate::store::{ChunkedStore, MemoryStore};
    use std::sync::Arc;

    const NOW: i64 = 1_700_000_000;

    fn guard(
        gate: GateConfig,
    ) -> AdmissionGuard<Arc<MemoryStore>, Arc<MemoryAuditLog>, ManualClock> {
        guard_with(Config {
            gate,
            ..Config::default()
        })
    }

    fn guard_with(
        config: Config,
    ) -> AdmissionGuard<Arc<MemoryStore>, Arc<MemoryAuditLog>, ManualClock> {
        let store = Arc::new(MemoryStore::new());
        ChunkedStore::new(Arc::clone(&store), &config.store)
            .commit(&BlocklistSnapshot::from_iter(["spam.com", "*@tempmail.io"]), NOW)
            .unwrap();
        AdmissionGuard::with_clock(
            &config,
            store,
            Arc::new(MemoryAuditLog::new()),
            ManualClock::new(NOW),
        )
    }

    fn all_on() -> GateConfig {
        GateConfig {
            block_on_register: true,
            block_on_login: true,
            log_actions: true,
            close_site_while_refreshing: true,
        }
    }

    #[test]
    fn test_register_rejected_and_logged() {
        let guard = guard(all_on());
        let ip: IpAddr = "203.0.113.9".parse().unwrap();

        let verdict = guard.check(UserAction::Register, "a@spam.com", Some(ip));
        let Admission::Rejected { message } = verdict else {
            panic!("expected rejection");
        };
        assert!(message.contains("a@spam.com"));

        let entries = guard.audit().entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, AuditAction::RegisterBlocked);
        assert_eq!(entries[0].source_ip, Some(ip));
        assert_eq!(entries[0].timestamp, NOW);
    }

    #[test]
    fn test_allowed_address_is_not_logged() {
        let guard = guard(all_on());
        assert_eq!(guard.check(UserAction::Login, "x@real.com", None), Admission::Allowed);
        assert!(guard.audit().is_empty());
    }

    #[test]
    fn test_disabled_action_is_not_checked() {
        let guard = guard(GateConfig::default());
        // default settings block registration only
        assert_eq!(guard.check(UserAction::Login, "a@spam.com", None), Admission::Allowed);
        assert!(guard.check(UserAction::Register, "a@spam.com", None).is_rejected());
    }

    #[test]
    fn test_logging_disabled_writes_nothing() {
        let guard = guard(GateConfig {
            log_actions: false,
            ..all_on()
        });
        assert!(guard.check(UserAction::Login, "x@tempmail.io", None).is_rejected());
        assert!(guard.audit().is_empty());
    }

    #[test]
    fn test_empty_email_is_allowed() {
        let guard = guard(all_on());
        assert_eq!(guard.check(UserAction::Register, "   ", None), Admission::Allowed);
    }

    #[test]
    fn test_site_degraded_follows_lock() {
        let guard = guard(all_on());
        assert!(!guard.site_degraded());

        let store = guard.gate().store().store();
        let lock = RefreshLock::new("dispomail", 600);
        let held = lock.try_acquire(&**store, NOW).unwrap().unwrap();
        assert!(guard.site_degraded());
        held.release().unwrap();
        assert!(!guard.site_degraded());
    }

    #[test]
    fn test_site_not_degraded_when_switch_off() {
        let guard = guard(GateConfig::default());
        let store = guard.gate().store().store();
        let lock = RefreshLock::new("dispomail", 600);
        let _held = lock.try_acquire(&**store, NOW).unwrap().unwrap();
        assert!(!guard.site_degraded());
    }

    #[test]
    fn test_site_not_degraded_when_refresh_disabled() {
        let mut config = Config {
            gate: all_on(),
            ..Config::default()
        };
        config.refresh.enabled = false;
        let guard = guard_with(config);

        let store = guard.gate().store().store();
        let lock = RefreshLock::new("dispomail", 600);
        let _held = lock.try_acquire(&**store, NOW).unwrap().unwrap();
        assert!(!guard.site_degraded());
    }
}
