//! Ledger service - the ordered transaction store
//!
//! Every mutation here is audited. Ranks follow one convention end to end:
//! listings sort by `sort_order` descending, create mints `max + 1` (new
//! rows display on top), and reorder assigns `N - position` so the first id
//! of the requested order lands on top as well.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::domain::dates::parse_date_dmy;
use crate::domain::result::{Error, Result};
use crate::domain::{
    can_edit_field, diff_objects, AuditAction, AuditEntry, Category, Identity, Transaction,
    PROTECTED_FIELDS,
};
use crate::ports::repository::{Repository, TransactionFilter};
use crate::services::AuditService;

/// Default page size for listings
const DEFAULT_LIST_LIMIT: u32 = 100;

/// Listing query, wire-shaped: dates arrive as `DD/MM/YYYY` strings and the
/// category as its display name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListQuery {
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Create request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransaction {
    pub date: String,
    pub category: String,
    pub amount: Decimal,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update request. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateTransaction {
    pub date: Option<String>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub notes: Option<String>,
    pub confirmation_taylor: Option<bool>,
    pub confirmation_dad: Option<bool>,
}

/// Ledger service
pub struct LedgerService {
    repository: Arc<dyn Repository>,
    audit: Arc<AuditService>,
}

impl LedgerService {
    pub fn new(repository: Arc<dyn Repository>, audit: Arc<AuditService>) -> Self {
        Self { repository, audit }
    }

    fn parse_filter(query: &ListQuery) -> Result<TransactionFilter> {
        let mut filter = TransactionFilter::default();
        if let Some(category) = &query.category {
            filter.category = Some(category.parse::<Category>()?);
        }
        if let Some(start) = &query.start_date {
            filter.start_date =
                Some(parse_date_dmy(start).ok_or_else(|| Error::validation("Invalid startDate"))?);
        }
        if let Some(end) = &query.end_date {
            filter.end_date =
                Some(parse_date_dmy(end).ok_or_else(|| Error::validation("Invalid endDate"))?);
        }
        Ok(filter)
    }

    /// List transactions in display order (rank descending), paginated
    pub async fn list(&self, query: &ListQuery) -> Result<Vec<Transaction>> {
        let filter = Self::parse_filter(query)?;
        let page = query.page.unwrap_or(1);
        let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
        self.repository.list_transactions(&filter, page, limit).await
    }

    /// Create a transaction with a freshly minted rank
    pub async fn create(
        &self,
        identity: &Identity,
        req: &CreateTransaction,
    ) -> Result<Transaction> {
        let date =
            parse_date_dmy(&req.date).ok_or_else(|| Error::validation("Invalid date format"))?;
        let category = req.category.parse::<Category>()?;

        let mut tx = Transaction::new(Uuid::new_v4(), date, category, req.amount);
        tx.notes = req.notes.clone();

        let rank = self.repository.add_transaction(&tx).await?;
        tx.sort_order = rank;

        self.audit
            .record(
                AuditEntry::new(Some(identity.user_id), AuditAction::Create)
                    .with_transaction(tx.id)
                    .with_after(tx.snapshot()),
            )
            .await;

        Ok(tx)
    }

    /// Update a transaction's non-rank fields.
    ///
    /// All-or-nothing: if the request touches any protected field the caller
    /// may not edit, the entire update is rejected and nothing is applied.
    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        req: &UpdateTransaction,
    ) -> Result<Transaction> {
        let mut tx = self
            .repository
            .get_transaction_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Transaction not found"))?;

        let date = match &req.date {
            Some(s) => {
                Some(parse_date_dmy(s).ok_or_else(|| Error::validation("Invalid date format"))?)
            }
            None => None,
        };
        let category = match &req.category {
            Some(s) => Some(s.parse::<Category>()?),
            None => None,
        };

        let requested_protected = [
            ("confirmation_taylor", req.confirmation_taylor.is_some()),
            ("confirmation_dad", req.confirmation_dad.is_some()),
        ];
        for (field, present) in requested_protected {
            if present && !can_edit_field(field, identity.role) {
                return Err(Error::forbidden("Cannot edit checkbox"));
            }
        }

        let before = tx.snapshot();
        if let Some(d) = date {
            tx.date = d;
        }
        if let Some(c) = category {
            tx.category = c;
        }
        if let Some(amount) = req.amount {
            tx.amount = amount;
        }
        if let Some(notes) = &req.notes {
            tx.notes = Some(notes.clone());
        }
        if let Some(v) = req.confirmation_taylor {
            tx.confirmation_taylor = v;
        }
        if let Some(v) = req.confirmation_dad {
            tx.confirmation_dad = v;
        }
        tx.updated_at = Utc::now();

        self.repository.update_transaction(&tx).await?;

        let after = tx.snapshot();
        let diff = diff_objects(&before, &after);
        self.audit
            .record(
                AuditEntry::new(Some(identity.user_id), AuditAction::Update)
                    .with_transaction(tx.id)
                    .with_before(before)
                    .with_after(after)
                    .with_diff(&diff),
            )
            .await;

        Ok(tx)
    }

    /// Set one of the two confirmation flags.
    ///
    /// Narrow single-field variant of update: field validation first, then
    /// authorization, then existence, matching the wire handler's precedence.
    pub async fn set_checkbox(
        &self,
        identity: &Identity,
        id: Uuid,
        field: &str,
        value: bool,
    ) -> Result<Transaction> {
        if !PROTECTED_FIELDS.contains(&field) {
            return Err(Error::validation("Invalid checkbox field"));
        }
        if !can_edit_field(field, identity.role) {
            return Err(Error::forbidden("Cannot edit checkbox"));
        }

        let mut tx = self
            .repository
            .get_transaction_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Transaction not found"))?;

        let before = tx.snapshot();
        if field == "confirmation_taylor" {
            tx.confirmation_taylor = value;
        } else {
            tx.confirmation_dad = value;
        }
        tx.updated_at = Utc::now();

        self.repository.update_transaction(&tx).await?;

        let after = tx.snapshot();
        let diff = diff_objects(&before, &after);
        self.audit
            .record(
                AuditEntry::new(Some(identity.user_id), AuditAction::Checkbox)
                    .with_transaction(tx.id)
                    .with_before(before)
                    .with_after(after)
                    .with_diff(&diff),
            )
            .await;

        Ok(tx)
    }

    /// Delete a transaction.
    ///
    /// Remaining ranks are not renumbered; gaps persist until the next
    /// explicit reorder.
    pub async fn delete(&self, identity: &Identity, id: Uuid) -> Result<()> {
        let tx = self
            .repository
            .get_transaction_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("Transaction not found"))?;

        let snapshot = tx.snapshot();
        self.repository.delete_transaction(id).await?;

        self.audit
            .record(
                AuditEntry::new(Some(identity.user_id), AuditAction::Delete)
                    .with_transaction(id)
                    .with_before(snapshot),
            )
            .await;

        Ok(())
    }

    /// Atomically reassign dense ranks 1..N following `new_order`.
    ///
    /// Preconditions, each a distinct failure mode, checked in order:
    /// 1. both lists span the full unfiltered ledger (cardinality);
    /// 2. `new_order` is a duplicate-free permutation of the current id set;
    /// 3. `expected_order` matches the current order (optimistic check,
    ///    re-verified inside the storage adapter under its lock).
    ///
    /// Returns the applied order. Losers of the optimistic race get
    /// `OrderConflict` carrying the authoritative order and must rebase.
    pub async fn reorder(
        &self,
        identity: &Identity,
        expected_order: &[Uuid],
        new_order: &[Uuid],
    ) -> Result<Vec<Uuid>> {
        let current = self.repository.get_order().await?;

        if expected_order.len() != current.len() || new_order.len() != current.len() {
            return Err(Error::validation(
                "Cannot reorder a partial view. Please clear filters first.",
            ));
        }

        let unique: HashSet<&Uuid> = new_order.iter().collect();
        if unique.len() != new_order.len() {
            return Err(Error::validation("Duplicate ids in new order"));
        }
        let current_set: HashSet<&Uuid> = current.iter().collect();
        if unique != current_set {
            return Err(Error::validation(
                "New order does not match the ledger's transactions",
            ));
        }

        self.repository
            .reorder_transactions(expected_order, new_order)
            .await?;

        self.audit
            .record(
                AuditEntry::new(Some(identity.user_id), AuditAction::Reorder).with_diff_value(
                    json!({
                        "before": current.iter().map(Uuid::to_string).collect::<Vec<_>>(),
                        "after": new_order.iter().map(Uuid::to_string).collect::<Vec<_>>(),
                    }),
                ),
            )
            .await;

        Ok(new_order.to_vec())
    }
}
