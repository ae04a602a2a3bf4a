//! Repository port - database abstraction
//!
//! This trait defines the ledger's storage operations. Implementations
//! (adapters) provide the actual database access logic; tests substitute
//! in-memory or failing fakes at this seam.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Category, Transaction, User};

/// Filter for transaction listings and aggregation reads
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub category: Option<Category>,
    /// Inclusive lower bound
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound
    pub end_date: Option<NaiveDate>,
}

/// Database repository abstraction
#[async_trait]
pub trait Repository: Send + Sync {
    // === Transactions ===

    /// List transactions matching the filter, ordered by `sort_order`
    /// descending, paginated. `page` is 1-based.
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Transaction>>;

    /// All transactions matching the filter, unpaged, `sort_order` descending
    async fn get_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>>;

    /// Get a transaction by id
    async fn get_transaction_by_id(&self, id: Uuid) -> Result<Option<Transaction>>;

    /// Count all transactions
    async fn get_transaction_count(&self) -> Result<i64>;

    /// The full ledger's ids, ordered by `sort_order` descending.
    /// This is the optimistic-concurrency token for reorder.
    async fn get_order(&self) -> Result<Vec<Uuid>>;

    /// Insert a transaction, minting its rank as `max(sort_order) + 1`
    /// (1 on an empty ledger) atomically with the insert. Returns the
    /// assigned rank. The `sort_order` on `tx` is ignored.
    async fn add_transaction(&self, tx: &Transaction) -> Result<i64>;

    /// Update a transaction's non-rank fields in place
    async fn update_transaction(&self, tx: &Transaction) -> Result<()>;

    /// Hard-delete a transaction. Remaining ranks are not renumbered;
    /// gaps persist until the next explicit reorder.
    async fn delete_transaction(&self, id: Uuid) -> Result<()>;

    /// Atomically verify `expected_order` against the current ledger order
    /// and reassign dense ranks following `new_order` (first id gets rank N,
    /// last gets 1, matching the descending list convention).
    ///
    /// Fails with `OrderConflict` carrying the authoritative order when
    /// `expected_order` is stale; on any failure no rank is mutated.
    /// Implementations over storage with an eagerly-enforced unique rank
    /// must stage the rewrite through a disjoint value range.
    async fn reorder_transactions(&self, expected_order: &[Uuid], new_order: &[Uuid]) -> Result<()>;

    // === Users ===

    /// Insert a new user
    async fn add_user(&self, user: &User) -> Result<()>;

    /// All users, ordered by email
    async fn get_users(&self) -> Result<Vec<User>>;

    /// Get a user by id
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Get a user by email (matched case-insensitively)
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Update an existing user
    async fn update_user(&self, user: &User) -> Result<()>;

    /// Delete a user
    async fn delete_user(&self, id: Uuid) -> Result<()>;
}
