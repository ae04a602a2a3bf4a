//! Audit store port
//!
//! The audit trail lives behind its own seam so that recording failures stay
//! isolated from the primary store and tests can inject outages.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{AuditEntry, AuditFilter};

/// Append-only audit storage
///
/// There is deliberately no update or delete operation.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one entry
    async fn append(&self, entry: &AuditEntry) -> Result<()>;

    /// Query entries matching the filter, newest first, paginated.
    /// `page` is 1-based.
    async fn query(&self, filter: &AuditFilter, page: u32, limit: u32) -> Result<Vec<AuditEntry>>;

    /// Total number of entries
    async fn count(&self) -> Result<i64>;
}
