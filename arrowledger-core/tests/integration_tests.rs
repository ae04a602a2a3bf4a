//! Integration tests for arrowledger-core services
//!
//! These tests verify the ledger's ordering, authorization, and audit
//! contracts against real DuckDB databases. Storage outages are simulated
//! at the trait level.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;
use uuid::Uuid;

use arrowledger_core::adapters::duckdb::DuckDbRepository;
use arrowledger_core::domain::result::{Error, Result};
use arrowledger_core::ports::audit::AuditStore;
use arrowledger_core::ports::repository::Repository;
use arrowledger_core::services::{
    AuditService, CreateTransaction, CreateUser, LedgerService, ListQuery, UpdateTransaction,
    UpdateUser, UserService,
};
use arrowledger_core::{AuditAction, AuditEntry, AuditFilter, Identity, LedgerContext, Role};

// ============================================================================
// Test Helpers
// ============================================================================

fn create_test_context(temp_dir: &TempDir) -> LedgerContext {
    LedgerContext::new(temp_dir.path()).expect("Failed to create ledger context")
}

fn admin() -> Identity {
    Identity::new(Uuid::new_v4(), Role::Admin)
}

fn taylor() -> Identity {
    Identity::new(Uuid::new_v4(), Role::Taylor)
}

fn dad() -> Identity {
    Identity::new(Uuid::new_v4(), Role::Dad)
}

fn create_req(date: &str, category: &str, cents: i64) -> CreateTransaction {
    CreateTransaction {
        date: date.to_string(),
        category: category.to_string(),
        amount: Decimal::new(cents, 2),
        notes: None,
    }
}

async fn seed_transactions(ctx: &LedgerContext, count: usize) -> Vec<Uuid> {
    let identity = admin();
    let mut ids = Vec::new();
    for i in 0..count {
        let tx = ctx
            .ledger_service
            .create(
                &identity,
                &create_req(&format!("{:02}/01/2024", i + 1), "Deposit", 1000 * (i as i64 + 1)),
            )
            .await
            .unwrap();
        ids.push(tx.id);
    }
    ids
}

async fn current_order(ctx: &LedgerContext) -> Vec<Uuid> {
    ctx.repository.get_order().await.unwrap()
}

async fn ranks(ctx: &LedgerContext) -> Vec<i64> {
    let all = ctx
        .ledger_service
        .list(&ListQuery::default())
        .await
        .unwrap();
    all.iter().map(|t| t.sort_order).collect()
}

// ============================================================================
// Create / List
// ============================================================================

#[tokio::test]
async fn test_create_assigns_sequential_ranks() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let identity = admin();

    let first = ctx
        .ledger_service
        .create(&identity, &create_req("01/01/2024", "Deposit", 1000))
        .await
        .unwrap();
    let second = ctx
        .ledger_service
        .create(&identity, &create_req("02/01/2024", "Durham Truck", -2000))
        .await
        .unwrap();
    let third = ctx
        .ledger_service
        .create(&identity, &create_req("03/01/2024", "Deposit", 3000))
        .await
        .unwrap();

    assert_eq!(first.sort_order, 1);
    assert_eq!(second.sort_order, 2);
    assert_eq!(third.sort_order, 3);

    // Newest rank lists first
    let listed = ctx
        .ledger_service
        .list(&ListQuery::default())
        .await
        .unwrap();
    let ids: Vec<Uuid> = listed.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
}

#[tokio::test]
async fn test_create_stores_wire_date_as_calendar_date() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let tx = ctx
        .ledger_service
        .create(&admin(), &create_req("31/01/2024", "Deposit", 1000))
        .await
        .unwrap();

    assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());

    // And it round-trips through storage
    let listed = ctx
        .ledger_service
        .list(&ListQuery::default())
        .await
        .unwrap();
    assert_eq!(listed[0].date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
}

#[tokio::test]
async fn test_create_rejects_bad_input() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let identity = admin();

    let bad_date = ctx
        .ledger_service
        .create(&identity, &create_req("2024-01-31", "Deposit", 1000))
        .await;
    assert!(matches!(bad_date, Err(Error::Validation(_))));

    let impossible_date = ctx
        .ledger_service
        .create(&identity, &create_req("31/02/2024", "Deposit", 1000))
        .await;
    assert!(matches!(impossible_date, Err(Error::Validation(_))));

    let bad_category = ctx
        .ledger_service
        .create(&identity, &create_req("01/01/2024", "Groceries", 1000))
        .await;
    assert!(matches!(bad_category, Err(Error::Validation(_))));

    // Nothing landed in the ledger
    assert!(ranks(&ctx).await.is_empty());
}

#[tokio::test]
async fn test_list_filters_by_category_and_date_range() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let identity = admin();

    ctx.ledger_service
        .create(&identity, &create_req("05/01/2024", "Deposit", 1000))
        .await
        .unwrap();
    ctx.ledger_service
        .create(&identity, &create_req("10/02/2024", "Durham Truck", -2000))
        .await
        .unwrap();
    ctx.ledger_service
        .create(&identity, &create_req("15/03/2024", "Deposit", 3000))
        .await
        .unwrap();

    let deposits = ctx
        .ledger_service
        .list(&ListQuery {
            category: Some("Deposit".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(deposits.len(), 2);

    let february = ctx
        .ledger_service
        .list(&ListQuery {
            start_date: Some("01/02/2024".to_string()),
            end_date: Some("29/02/2024".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(february.len(), 1);
    assert_eq!(february[0].amount, Decimal::new(-2000, 2));

    let bad_filter = ctx
        .ledger_service
        .list(&ListQuery {
            start_date: Some("02/2024".to_string()),
            ..Default::default()
        })
        .await;
    assert!(matches!(bad_filter, Err(Error::Validation(_))));
}

// ============================================================================
// Update / SetCheckbox authorization
// ============================================================================

#[tokio::test]
async fn test_update_missing_transaction_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let result = ctx
        .ledger_service
        .update(&admin(), Uuid::new_v4(), &UpdateTransaction::default())
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_update_is_all_or_nothing_on_forbidden_field() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let tx = ctx
        .ledger_service
        .create(&admin(), &create_req("01/01/2024", "Deposit", 1000))
        .await
        .unwrap();

    // taylor mixes an allowed field (notes) with a forbidden one (dad's flag)
    let result = ctx
        .ledger_service
        .update(
            &taylor(),
            tx.id,
            &UpdateTransaction {
                notes: Some("updated".to_string()),
                confirmation_dad: Some(true),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));

    // Neither field changed
    let reloaded = ctx
        .repository
        .get_transaction_by_id(tx.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.notes, None);
    assert!(!reloaded.confirmation_dad);
}

#[tokio::test]
async fn test_update_applies_allowed_fields() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let tx = ctx
        .ledger_service
        .create(&admin(), &create_req("01/01/2024", "Deposit", 1000))
        .await
        .unwrap();

    let updated = ctx
        .ledger_service
        .update(
            &dad(),
            tx.id,
            &UpdateTransaction {
                notes: Some("fuel".to_string()),
                amount: Some(Decimal::new(-4500, 2)),
                confirmation_dad: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.notes.as_deref(), Some("fuel"));
    assert_eq!(updated.amount, Decimal::new(-4500, 2));
    assert!(updated.confirmation_dad);
    // Rank is not touched by updates
    assert_eq!(updated.sort_order, tx.sort_order);
}

#[tokio::test]
async fn test_set_checkbox_authorization() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let tx = ctx
        .ledger_service
        .create(&admin(), &create_req("01/01/2024", "Deposit", 1000))
        .await
        .unwrap();

    // taylor owns confirmation_taylor
    let updated = ctx
        .ledger_service
        .set_checkbox(&taylor(), tx.id, "confirmation_taylor", true)
        .await
        .unwrap();
    assert!(updated.confirmation_taylor);

    // but not confirmation_dad
    let forbidden = ctx
        .ledger_service
        .set_checkbox(&taylor(), tx.id, "confirmation_dad", true)
        .await;
    assert!(matches!(forbidden, Err(Error::Forbidden(_))));

    // admin may set either
    let updated = ctx
        .ledger_service
        .set_checkbox(&admin(), tx.id, "confirmation_dad", true)
        .await
        .unwrap();
    assert!(updated.confirmation_dad);

    // unknown field fails validation before authorization
    let invalid = ctx
        .ledger_service
        .set_checkbox(&dad(), tx.id, "notes", true)
        .await;
    assert!(matches!(invalid, Err(Error::Validation(_))));

    // valid field, authorized role, missing transaction
    let missing = ctx
        .ledger_service
        .set_checkbox(&dad(), Uuid::new_v4(), "confirmation_dad", true)
        .await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn test_delete_leaves_rank_gaps() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let ids = seed_transactions(&ctx, 3).await;

    // delete the middle transaction (rank 2)
    ctx.ledger_service.delete(&admin(), ids[1]).await.unwrap();

    let listed = ctx
        .ledger_service
        .list(&ListQuery::default())
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|t| t.id != ids[1]));

    // remaining ranks keep their values; the gap persists
    let mut remaining: Vec<i64> = listed.iter().map(|t| t.sort_order).collect();
    remaining.sort_unstable();
    assert_eq!(remaining, vec![1, 3]);

    // doctor reports the gap as a warning, not an error
    let report = ctx.doctor_service.run_checks().await.unwrap();
    assert_eq!(report.checks["rank_gaps"].status, "warning");
    assert_eq!(report.checks["duplicate_ranks"].status, "pass");
    assert_eq!(report.summary.errors, 0);
}

// ============================================================================
// Reorder
// ============================================================================

#[tokio::test]
async fn test_reorder_assigns_dense_ranks_matching_new_order() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    seed_transactions(&ctx, 4).await;
    let current = current_order(&ctx).await;

    let mut new_order = current.clone();
    new_order.reverse();

    let applied = ctx
        .ledger_service
        .reorder(&admin(), &current, &new_order)
        .await
        .unwrap();
    assert_eq!(applied, new_order);

    // Ranks are exactly {1..N}
    let mut rank_values = ranks(&ctx).await;
    rank_values.sort_unstable();
    assert_eq!(rank_values, vec![1, 2, 3, 4]);

    // Display order follows new_order: position 0 on top with rank N
    let listed = ctx
        .ledger_service
        .list(&ListQuery::default())
        .await
        .unwrap();
    let listed_ids: Vec<Uuid> = listed.iter().map(|t| t.id).collect();
    assert_eq!(listed_ids, new_order);
    assert_eq!(listed[0].sort_order, 4);
    assert_eq!(listed[3].sort_order, 1);
}

#[tokio::test]
async fn test_reorder_with_stale_expected_order_conflicts_without_mutation() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    seed_transactions(&ctx, 3).await;
    let current = current_order(&ctx).await;
    let ranks_before = ranks(&ctx).await;

    // stale view: pretend the first two entries were swapped
    let mut stale = current.clone();
    stale.swap(0, 1);
    let mut new_order = current.clone();
    new_order.reverse();

    let result = ctx
        .ledger_service
        .reorder(&admin(), &stale, &new_order)
        .await;
    match result {
        Err(Error::OrderConflict { current_order }) => {
            assert_eq!(current_order, current);
        }
        other => panic!("expected OrderConflict, got {:?}", other.map(|_| ())),
    }

    // nothing moved
    assert_eq!(ranks(&ctx).await, ranks_before);
    assert_eq!(current_order(&ctx).await, current);
}

#[tokio::test]
async fn test_reorder_rejects_malformed_payloads() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    seed_transactions(&ctx, 3).await;
    let current = current_order(&ctx).await;

    // partial view
    let partial = &current[..2];
    let result = ctx
        .ledger_service
        .reorder(&admin(), partial, partial)
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));

    // duplicate ids
    let mut duplicated = current.clone();
    duplicated[2] = duplicated[0];
    let result = ctx
        .ledger_service
        .reorder(&admin(), &current, &duplicated)
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));

    // right length, wrong id set
    let mut foreign = current.clone();
    foreign[2] = Uuid::new_v4();
    let result = ctx
        .ledger_service
        .reorder(&admin(), &current, &foreign)
        .await;
    assert!(matches!(result, Err(Error::Validation(_))));

    // the ledger is untouched
    assert_eq!(current_order(&ctx).await, current);
}

#[tokio::test]
async fn test_reorder_after_delete_renumbers_densely() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let ids = seed_transactions(&ctx, 4).await;
    ctx.ledger_service.delete(&admin(), ids[1]).await.unwrap();

    let current = current_order(&ctx).await;
    assert_eq!(current.len(), 3);

    let mut new_order = current.clone();
    new_order.rotate_left(1);
    ctx.ledger_service
        .reorder(&admin(), &current, &new_order)
        .await
        .unwrap();

    let mut rank_values = ranks(&ctx).await;
    rank_values.sort_unstable();
    assert_eq!(rank_values, vec![1, 2, 3]);
}

// ============================================================================
// Aggregation
// ============================================================================

#[tokio::test]
async fn test_aggregate_by_category_sums_and_counts() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let identity = admin();

    for cents in [1000, 2500, 4000] {
        ctx.ledger_service
            .create(&identity, &create_req("05/01/2024", "Deposit", cents))
            .await
            .unwrap();
    }
    ctx.ledger_service
        .create(&identity, &create_req("06/01/2024", "Durham Truck", -500))
        .await
        .unwrap();

    let rows = ctx
        .aggregation_service
        .aggregate("category", None, None)
        .await
        .unwrap();

    let deposit = rows.iter().find(|r| r.key == "Deposit").unwrap();
    assert_eq!(deposit.total_amount, Decimal::new(7500, 2));
    assert_eq!(deposit.count, 3);

    let truck = rows.iter().find(|r| r.key == "Durham Truck").unwrap();
    assert_eq!(truck.total_amount, Decimal::new(-500, 2));
    assert_eq!(truck.count, 1);
}

#[tokio::test]
async fn test_aggregate_by_month_uses_utc_calendar_months() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let identity = admin();

    ctx.ledger_service
        .create(&identity, &create_req("31/01/2024", "Deposit", 1000))
        .await
        .unwrap();
    ctx.ledger_service
        .create(&identity, &create_req("01/02/2024", "Deposit", 2000))
        .await
        .unwrap();
    ctx.ledger_service
        .create(&identity, &create_req("15/02/2024", "Durham Truck", -300))
        .await
        .unwrap();

    let rows = ctx
        .aggregation_service
        .aggregate("month", None, None)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    let january = rows.iter().find(|r| r.key == "2024-01").unwrap();
    assert_eq!(january.count, 1);
    let february = rows.iter().find(|r| r.key == "2024-02").unwrap();
    assert_eq!(february.count, 2);
    assert_eq!(february.total_amount, Decimal::new(1700, 2));
}

#[tokio::test]
async fn test_aggregate_rejects_unknown_grouping() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let result = ctx.aggregation_service.aggregate("week", None, None).await;
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[tokio::test]
async fn test_aggregate_respects_date_range() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let identity = admin();

    ctx.ledger_service
        .create(&identity, &create_req("05/01/2024", "Deposit", 1000))
        .await
        .unwrap();
    ctx.ledger_service
        .create(&identity, &create_req("05/03/2024", "Deposit", 2000))
        .await
        .unwrap();

    let rows = ctx
        .aggregation_service
        .aggregate("category", Some("01/02/2024"), Some("31/03/2024"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_amount, Decimal::new(2000, 2));
    assert_eq!(rows[0].count, 1);
}

// ============================================================================
// Audit trail
// ============================================================================

#[tokio::test]
async fn test_mutations_land_in_the_audit_trail() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let identity = admin();

    let tx = ctx
        .ledger_service
        .create(&identity, &create_req("01/01/2024", "Deposit", 1000))
        .await
        .unwrap();
    ctx.ledger_service
        .update(
            &identity,
            tx.id,
            &UpdateTransaction {
                notes: Some("settled".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    ctx.ledger_service.delete(&identity, tx.id).await.unwrap();

    let entries = ctx
        .audit_service
        .list(&identity, &AuditFilter::default(), 1, 50)
        .await
        .unwrap();
    assert_eq!(entries.len(), 3);

    // newest first
    assert_eq!(entries[0].action, AuditAction::Delete);
    assert_eq!(entries[1].action, AuditAction::Update);
    assert_eq!(entries[2].action, AuditAction::Create);

    // delete carries the final snapshot and no after-state
    assert!(entries[0].before.is_some());
    assert!(entries[0].after.is_none());

    // update carries a diff naming only the changed field
    let diff = entries[1].diff.as_ref().unwrap();
    assert!(diff.get("notes").is_some());
    assert!(diff.get("amount").is_none());

    // filter by action
    let updates = ctx
        .audit_service
        .list(
            &identity,
            &AuditFilter {
                action: Some(AuditAction::Update),
                ..Default::default()
            },
            1,
            50,
        )
        .await
        .unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].transaction_id, Some(tx.id));

    // filter by user
    let by_user = ctx
        .audit_service
        .list(
            &identity,
            &AuditFilter {
                user_id: Some(identity.user_id),
                ..Default::default()
            },
            1,
            50,
        )
        .await
        .unwrap();
    assert_eq!(by_user.len(), 3);

    // pagination
    let page_two = ctx
        .audit_service
        .list(&identity, &AuditFilter::default(), 2, 1)
        .await
        .unwrap();
    assert_eq!(page_two.len(), 1);
    assert_eq!(page_two[0].action, AuditAction::Update);
}

#[tokio::test]
async fn test_reorder_audit_records_both_orders() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let identity = admin();

    seed_transactions(&ctx, 3).await;
    let current = current_order(&ctx).await;
    let mut new_order = current.clone();
    new_order.reverse();
    ctx.ledger_service
        .reorder(&identity, &current, &new_order)
        .await
        .unwrap();

    let entries = ctx
        .audit_service
        .list(
            &identity,
            &AuditFilter {
                action: Some(AuditAction::Reorder),
                ..Default::default()
            },
            1,
            10,
        )
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);

    let diff = entries[0].diff.as_ref().unwrap();
    let before: Vec<String> = current.iter().map(Uuid::to_string).collect();
    let after: Vec<String> = new_order.iter().map(Uuid::to_string).collect();
    assert_eq!(diff["before"], serde_json::json!(before));
    assert_eq!(diff["after"], serde_json::json!(after));
}

#[tokio::test]
async fn test_audit_listing_is_admin_only() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);

    let result = ctx
        .audit_service
        .list(&taylor(), &AuditFilter::default(), 1, 10)
        .await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

// ============================================================================
// Audit outage isolation
// ============================================================================

/// An audit store that is permanently down
struct FailingAuditStore;

#[async_trait]
impl AuditStore for FailingAuditStore {
    async fn append(&self, _entry: &AuditEntry) -> Result<()> {
        Err(Error::database("audit storage offline"))
    }

    async fn query(&self, _filter: &AuditFilter, _page: u32, _limit: u32) -> Result<Vec<AuditEntry>> {
        Err(Error::database("audit storage offline"))
    }

    async fn count(&self) -> Result<i64> {
        Err(Error::database("audit storage offline"))
    }
}

#[tokio::test]
async fn test_audit_outage_does_not_fail_the_primary_mutation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("ledger.duckdb");
    let repository = Arc::new(DuckDbRepository::new(&db_path).unwrap());
    repository.ensure_schema().unwrap();

    let repo: Arc<dyn Repository> = repository.clone();
    let audit = Arc::new(AuditService::new(Arc::new(FailingAuditStore)));
    let ledger = LedgerService::new(Arc::clone(&repo), Arc::clone(&audit));

    let identity = admin();
    let tx = ledger
        .create(&identity, &create_req("01/01/2024", "Deposit", 1000))
        .await
        .expect("create must succeed despite the audit outage");

    // the transaction committed and stayed committed
    let stored = repo.get_transaction_by_id(tx.id).await.unwrap();
    assert!(stored.is_some());
    assert_eq!(stored.unwrap().sort_order, 1);

    // other mutations survive the outage too
    ledger
        .set_checkbox(&identity, tx.id, "confirmation_taylor", true)
        .await
        .unwrap();
    ledger.delete(&identity, tx.id).await.unwrap();
}

// ============================================================================
// Users
// ============================================================================

async fn create_admin_user(ctx: &LedgerContext) -> arrowledger_core::User {
    // bootstrap an admin directly through the repository, like the setup CLI
    let user = arrowledger_core::User::new(
        Uuid::new_v4(),
        "admin@arrowfinancial.com",
        arrowledger_core::services::hash_password("rootpass").unwrap(),
        Role::Admin,
    );
    ctx.repository.add_user(&user).await.unwrap();
    user
}

#[tokio::test]
async fn test_user_crud_and_validation() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let admin_user = create_admin_user(&ctx).await;
    let admin_id = admin_user.identity();

    let created = ctx
        .user_service
        .create_user(
            &admin_id,
            &CreateUser {
                email: "Taylor@ArrowFinancial.com".to_string(),
                password: "secret1".to_string(),
                role: "taylor".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.email, "taylor@arrowfinancial.com");
    assert_eq!(created.role, Role::Taylor);

    // duplicate email, case-insensitively
    let duplicate = ctx
        .user_service
        .create_user(
            &admin_id,
            &CreateUser {
                email: "TAYLOR@arrowfinancial.com".to_string(),
                password: "secret1".to_string(),
                role: "taylor".to_string(),
            },
        )
        .await;
    assert!(matches!(duplicate, Err(Error::Conflict(_))));

    // invalid email / short password / unknown role
    for req in [
        CreateUser {
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
            role: "dad".to_string(),
        },
        CreateUser {
            email: "dad@arrowfinancial.com".to_string(),
            password: "short".to_string(),
            role: "dad".to_string(),
        },
        CreateUser {
            email: "dad@arrowfinancial.com".to_string(),
            password: "secret1".to_string(),
            role: "uncle".to_string(),
        },
    ] {
        let result = ctx.user_service.create_user(&admin_id, &req).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    // non-admin callers are rejected outright
    let result = ctx.user_service.list_users(&taylor()).await;
    assert!(matches!(result, Err(Error::Forbidden(_))));

    // role change
    let updated = ctx
        .user_service
        .update_user(
            &admin_id,
            created.id,
            &UpdateUser {
                role: Some("dad".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.role, Role::Dad);

    // empty update is rejected
    let empty = ctx
        .user_service
        .update_user(&admin_id, created.id, &UpdateUser::default())
        .await;
    assert!(matches!(empty, Err(Error::Validation(_))));

    // self-deletion is rejected, deleting others works
    let self_delete = ctx.user_service.delete_user(&admin_id, admin_user.id).await;
    assert!(matches!(self_delete, Err(Error::Validation(_))));
    ctx.user_service
        .delete_user(&admin_id, created.id)
        .await
        .unwrap();
    assert_eq!(ctx.user_service.list_users(&admin_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_authenticate_verifies_credentials_and_records_login() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_test_context(&temp_dir);
    let admin_user = create_admin_user(&ctx).await;

    // wrong password and unknown email look identical
    let wrong = ctx
        .user_service
        .authenticate("admin@arrowfinancial.com", "wrongpass")
        .await;
    assert!(matches!(wrong, Err(Error::Forbidden(_))));
    let unknown = ctx
        .user_service
        .authenticate("nobody@arrowfinancial.com", "rootpass")
        .await;
    assert!(matches!(unknown, Err(Error::Forbidden(_))));

    // correct credentials stamp the login time
    let user = ctx
        .user_service
        .authenticate("Admin@ArrowFinancial.com", "rootpass")
        .await
        .unwrap();
    assert_eq!(user.id, admin_user.id);
    assert!(user.last_login_at.is_some());

    let reloaded = ctx
        .repository
        .get_user_by_id(user.id)
        .await
        .unwrap()
        .unwrap();
    assert!(reloaded.last_login_at.is_some());

    // login and logout land in the audit trail
    ctx.user_service.logout(&user.identity()).await;
    let entries = ctx
        .audit_service
        .list(&user.identity(), &AuditFilter::default(), 1, 10)
        .await
        .unwrap();
    let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
    assert!(actions.contains(&AuditAction::Login));
    assert!(actions.contains(&AuditAction::Logout));
}
