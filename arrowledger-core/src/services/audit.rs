//! Audit service - fire-and-forget recording and the admin read side
//!
//! Recording is best-effort by contract: the caller's mutation has already
//! committed, and a failed audit write must never unwind it. Failures go to
//! the operational channel and are swallowed.

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{AuditEntry, AuditFilter, Identity, Role};
use crate::ports::audit::AuditStore;

/// Audit trail service
pub struct AuditService {
    store: Arc<dyn AuditStore>,
}

impl AuditService {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    /// Record an entry, fire-and-forget.
    ///
    /// Never returns an error: a storage failure here is logged and dropped
    /// so the triggering operation's outcome is decided by the primary
    /// mutation alone.
    pub async fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.store.append(&entry).await {
            eprintln!(
                "[arrowledger] audit write failed (action={}): {}",
                entry.action.as_str(),
                e
            );
        }
    }

    /// List audit entries, newest first. Admin only.
    pub async fn list(
        &self,
        identity: &Identity,
        filter: &AuditFilter,
        page: u32,
        limit: u32,
    ) -> Result<Vec<AuditEntry>> {
        if identity.role != Role::Admin {
            return Err(Error::forbidden("Not authorized"));
        }
        self.store.query(filter, page, limit).await
    }

    /// Total number of recorded entries
    pub async fn count(&self) -> Result<i64> {
        self.store.count().await
    }
}
