//! Status service - ledger summaries for operators

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::Result;
use crate::ports::repository::{Repository, TransactionFilter};
use crate::services::AuditService;

/// Status service for ledger summaries
pub struct StatusService {
    repository: Arc<dyn Repository>,
    audit: Arc<AuditService>,
}

impl StatusService {
    pub fn new(repository: Arc<dyn Repository>, audit: Arc<AuditService>) -> Self {
        Self { repository, audit }
    }

    /// Get overall status summary
    pub async fn get_status(&self) -> Result<StatusSummary> {
        let transactions = self
            .repository
            .get_transactions(&TransactionFilter::default())
            .await?;
        let users = self.repository.get_users().await?;
        let audit_entries = self.audit.count().await?;

        let earliest = transactions.iter().map(|t| t.date).min();
        let latest = transactions.iter().map(|t| t.date).max();
        let top_rank = transactions.iter().map(|t| t.sort_order).max();

        Ok(StatusSummary {
            total_transactions: transactions.len() as i64,
            total_users: users.len() as i64,
            total_audit_entries: audit_entries,
            date_range: DateRange {
                earliest: earliest.map(|d| d.to_string()),
                latest: latest.map(|d| d.to_string()),
            },
            top_rank,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_transactions: i64,
    pub total_users: i64,
    pub total_audit_entries: i64,
    pub date_range: DateRange,
    /// Highest rank currently in use (the next create mints this + 1)
    pub top_rank: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}
