//! DuckDB adapter - ledger repository and audit store

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, params_from_iter, Connection};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{AuditAction, AuditEntry, AuditFilter, Category, Role, Transaction, User};
use crate::ports::audit::AuditStore;
use crate::ports::repository::{Repository, TransactionFilter};
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Staging offset for the reorder rewrite. Ranks are parked at
/// `-(TEMP_RANK_OFFSET + idx)`, a range disjoint from any live rank, before
/// final values are written.
const TEMP_RANK_OFFSET: i64 = 1_000_000;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Open a database connection, retrying with exponential backoff on file
/// locking errors (multiple processes can race for the same file on startup).
fn open_with_retry(db_path: &Path) -> Result<Connection> {
    let mut last_error = None;

    for attempt in 0..MAX_RETRIES {
        let config = duckdb::Config::default()
            .enable_autoload_extension(false)
            .map_err(|e| Error::database(e.to_string()))?;
        match Connection::open_with_flags(db_path, config) {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                let err_msg = e.to_string();
                if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                    let delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                    eprintln!(
                        "[arrowledger] Database busy, retrying in {}ms (attempt {}/{}): {}",
                        delay.as_millis(),
                        attempt + 1,
                        MAX_RETRIES,
                        err_msg
                    );
                    thread::sleep(delay);
                    last_error = Some(e);
                    continue;
                }
                return Err(e.into());
            }
        }
    }

    Err(last_error.map(Into::into).unwrap_or_else(|| {
        Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
    }))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // DuckDB renders TIMESTAMP columns as "YYYY-MM-DD HH:MM:SS[.ffffff]"
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn decimal_to_f64(d: Decimal) -> f64 {
    d.to_string().parse::<f64>().unwrap_or(0.0)
}

const TX_COLUMNS: &str = "transaction_id, txn_date::VARCHAR, category, amount, notes, \
     confirmation_taylor, confirmation_dad, sort_order, created_at::VARCHAR, updated_at::VARCHAR";

/// DuckDB ledger repository
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the ledger database
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = open_with_retry(db_path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
        })
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<crate::services::MigrationResult> {
        let conn = self.conn.lock().unwrap();
        let migration_service = MigrationService::new(&conn, crate::migrations::MIGRATIONS);
        migration_service.run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // === Row mapping ===

    fn row_to_transaction(row: &duckdb::Row) -> Option<Transaction> {
        // Column indices from TX_COLUMNS:
        // 0: transaction_id, 1: txn_date, 2: category, 3: amount, 4: notes,
        // 5: confirmation_taylor, 6: confirmation_dad, 7: sort_order,
        // 8: created_at, 9: updated_at
        let id_str: String = row.get(0).ok()?;
        let date_str: String = row.get(1).ok()?;
        let category_str: String = row.get(2).ok()?;
        let amount: f64 = row.get(3).unwrap_or(0.0);
        let created_str: String = row.get(8).unwrap_or_default();
        let updated_str: String = row.get(9).unwrap_or_default();

        Some(Transaction {
            id: Uuid::parse_str(&id_str).ok()?,
            date: parse_date(&date_str)?,
            category: category_str.parse::<Category>().ok()?,
            amount: Decimal::try_from(amount).unwrap_or_default(),
            notes: row.get(4).ok(),
            confirmation_taylor: row.get(5).unwrap_or(false),
            confirmation_dad: row.get(6).unwrap_or(false),
            sort_order: row.get(7).unwrap_or(0),
            created_at: parse_timestamp(&created_str).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&updated_str).unwrap_or_else(Utc::now),
        })
    }

    fn row_to_user(row: &duckdb::Row) -> Option<User> {
        // 0: user_id, 1: email, 2: password_hash, 3: role,
        // 4: created_at, 5: updated_at, 6: last_login_at
        let id_str: String = row.get(0).ok()?;
        let role_str: String = row.get(3).ok()?;
        let created_str: String = row.get(4).unwrap_or_default();
        let updated_str: String = row.get(5).unwrap_or_default();
        let last_login_str: Option<String> = row.get(6).ok();

        Some(User {
            id: Uuid::parse_str(&id_str).ok()?,
            email: row.get(1).ok()?,
            password_hash: row.get(2).ok()?,
            role: role_str.parse::<Role>().ok()?,
            last_login_at: last_login_str.as_deref().and_then(parse_timestamp),
            created_at: parse_timestamp(&created_str).unwrap_or_else(Utc::now),
            updated_at: parse_timestamp(&updated_str).unwrap_or_else(Utc::now),
        })
    }

    // === Transactions (sync internals, called under the connection lock) ===

    fn select_transactions(
        &self,
        filter: &TransactionFilter,
        page_limit: Option<(u32, u32)>,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = format!("SELECT {} FROM sys_transactions", TX_COLUMNS);
        let mut clauses: Vec<&str> = Vec::new();
        let mut bind: Vec<String> = Vec::new();

        if let Some(category) = filter.category {
            clauses.push("category = ?");
            bind.push(category.as_str().to_string());
        }
        if let Some(start) = filter.start_date {
            clauses.push("txn_date >= CAST(? AS DATE)");
            bind.push(start.to_string());
        }
        if let Some(end) = filter.end_date {
            clauses.push("txn_date <= CAST(? AS DATE)");
            bind.push(end.to_string());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY sort_order DESC");
        if let Some((page, limit)) = page_limit {
            let offset = (page.max(1) as i64 - 1) * limit as i64;
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        }

        let mut stmt = conn.prepare(&sql)?;
        let transactions = stmt
            .query_map(params_from_iter(bind.iter()), |row| {
                Ok(Self::row_to_transaction(row))
            })?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();

        Ok(transactions)
    }

    fn transaction_by_id(&self, id: Uuid) -> Result<Option<Transaction>> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM sys_transactions WHERE transaction_id = ?",
            TX_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let tx = stmt
            .query_map(params![id.to_string()], |row| {
                Ok(Self::row_to_transaction(row))
            })?
            .filter_map(|r| r.ok())
            .flatten()
            .next();
        Ok(tx)
    }

    fn order_with_conn(conn: &Connection) -> Result<Vec<Uuid>> {
        let mut stmt =
            conn.prepare("SELECT transaction_id FROM sys_transactions ORDER BY sort_order DESC")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .filter_map(|s| Uuid::parse_str(&s).ok())
            .collect();
        Ok(ids)
    }

    fn insert_transaction(&self, tx: &Transaction) -> Result<i64> {
        // Rank minting and insert happen under one lock acquisition so
        // concurrent creates cannot both read the same max.
        let conn = self.conn.lock().unwrap();

        let max: Option<i64> = conn.query_row(
            "SELECT MAX(sort_order) FROM sys_transactions",
            [],
            |row| row.get(0),
        )?;
        let next = max.unwrap_or(0) + 1;

        conn.execute(
            "INSERT INTO sys_transactions (transaction_id, txn_date, category, amount, notes,
                                           confirmation_taylor, confirmation_dad, sort_order,
                                           created_at, updated_at)
             VALUES (?, CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                tx.id.to_string(),
                tx.date.to_string(),
                tx.category.as_str(),
                decimal_to_f64(tx.amount),
                tx.notes,
                tx.confirmation_taylor,
                tx.confirmation_dad,
                next,
                tx.created_at.to_rfc3339(),
                tx.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(next)
    }

    fn update_transaction_row(&self, tx: &Transaction) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sys_transactions
             SET txn_date = CAST(? AS DATE), category = ?, amount = ?, notes = ?,
                 confirmation_taylor = ?, confirmation_dad = ?, updated_at = ?
             WHERE transaction_id = ?",
            params![
                tx.date.to_string(),
                tx.category.as_str(),
                decimal_to_f64(tx.amount),
                tx.notes,
                tx.confirmation_taylor,
                tx.confirmation_dad,
                Utc::now().to_rfc3339(),
                tx.id.to_string(),
            ],
        )?;
        Ok(())
    }

    fn delete_transaction_row(&self, id: Uuid) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM sys_transactions WHERE transaction_id = ?",
            params![id.to_string()],
        )?;
        Ok(())
    }

    /// Conflict check and two-phase rank rewrite.
    ///
    /// The authoritative order is re-read under the same lock that performs
    /// the rewrite, so a stale `expected_order` can never slip through
    /// between check and rewrite, and no concurrent reader can observe a
    /// half-renumbered ledger.
    ///
    /// The rewrite is two-phase: ranks are first parked in a disjoint
    /// negative range, then written to their final dense values. sort_order
    /// is UNIQUE and DuckDB checks the constraint eagerly per statement, so
    /// writing final values directly would collide with rows still holding
    /// their old ranks.
    ///
    /// Note: we intentionally don't wrap the two phases in an explicit
    /// transaction. DuckDB's index-backed constraint checking also sees
    /// same-transaction deleted entries, so a BEGIN-wrapped phase 2 can hit
    /// spurious duplicate-key errors against rows already staged in phase 1.
    /// Each statement auto-commits; the connection lock provides isolation.
    fn reorder_rows(&self, expected_order: &[Uuid], new_order: &[Uuid]) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let current = Self::order_with_conn(&conn)?;
        if current.as_slice() != expected_order {
            return Err(Error::OrderConflict { current_order: current });
        }

        let total = new_order.len() as i64;
        let now = Utc::now().to_rfc3339();

        // Phase 1: stage into the disjoint negative range
        for (idx, id) in new_order.iter().enumerate() {
            conn.execute(
                "UPDATE sys_transactions SET sort_order = ? WHERE transaction_id = ?",
                params![-(TEMP_RANK_OFFSET + idx as i64), id.to_string()],
            )?;
        }

        // Phase 2: final dense ranks; position 0 gets rank N and therefore
        // displays first under the descending list order
        for (idx, id) in new_order.iter().enumerate() {
            conn.execute(
                "UPDATE sys_transactions SET sort_order = ?, updated_at = ? WHERE transaction_id = ?",
                params![total - idx as i64, now, id.to_string()],
            )?;
        }

        Ok(())
    }

    // === Users (sync internals) ===

    fn insert_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sys_users (user_id, email, password_hash, role,
                                    created_at, updated_at, last_login_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                user.id.to_string(),
                user.email,
                user.password_hash,
                user.role.as_str(),
                user.created_at.to_rfc3339(),
                user.updated_at.to_rfc3339(),
                user.last_login_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn select_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, email, password_hash, role,
                    created_at::VARCHAR, updated_at::VARCHAR, last_login_at::VARCHAR
             FROM sys_users ORDER BY email",
        )?;
        let users = stmt
            .query_map([], |row| Ok(Self::row_to_user(row)))?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();
        Ok(users)
    }

    fn user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, email, password_hash, role,
                    created_at::VARCHAR, updated_at::VARCHAR, last_login_at::VARCHAR
             FROM sys_users WHERE user_id = ?",
        )?;
        let user = stmt
            .query_map(params![id.to_string()], |row| Ok(Self::row_to_user(row)))?
            .filter_map(|r| r.ok())
            .flatten()
            .next();
        Ok(user)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, email, password_hash, role,
                    created_at::VARCHAR, updated_at::VARCHAR, last_login_at::VARCHAR
             FROM sys_users WHERE lower(email) = lower(?)",
        )?;
        let user = stmt
            .query_map(params![email], |row| Ok(Self::row_to_user(row)))?
            .filter_map(|r| r.ok())
            .flatten()
            .next();
        Ok(user)
    }

    fn update_user_row(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sys_users
             SET email = ?, password_hash = ?, role = ?, updated_at = ?, last_login_at = ?
             WHERE user_id = ?",
            params![
                user.email,
                user.password_hash,
                user.role.as_str(),
                Utc::now().to_rfc3339(),
                user.last_login_at.map(|t| t.to_rfc3339()),
                user.id.to_string(),
            ],
        )?;
        Ok(())
    }

    fn delete_user_row(&self, id: Uuid) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM sys_users WHERE user_id = ?",
            params![id.to_string()],
        )?;
        Ok(())
    }
}

#[async_trait]
impl Repository for DuckDbRepository {
    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Transaction>> {
        self.select_transactions(filter, Some((page, limit)))
    }

    async fn get_transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        self.select_transactions(filter, None)
    }

    async fn get_transaction_by_id(&self, id: Uuid) -> Result<Option<Transaction>> {
        self.transaction_by_id(id)
    }

    async fn get_transaction_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sys_transactions", [], |row| row.get(0))?;
        Ok(count)
    }

    async fn get_order(&self) -> Result<Vec<Uuid>> {
        let conn = self.conn.lock().unwrap();
        Self::order_with_conn(&conn)
    }

    async fn add_transaction(&self, tx: &Transaction) -> Result<i64> {
        self.insert_transaction(tx)
    }

    async fn update_transaction(&self, tx: &Transaction) -> Result<()> {
        self.update_transaction_row(tx)
    }

    async fn delete_transaction(&self, id: Uuid) -> Result<()> {
        self.delete_transaction_row(id)
    }

    async fn reorder_transactions(
        &self,
        expected_order: &[Uuid],
        new_order: &[Uuid],
    ) -> Result<()> {
        self.reorder_rows(expected_order, new_order)
    }

    async fn add_user(&self, user: &User) -> Result<()> {
        self.insert_user(user)
    }

    async fn get_users(&self) -> Result<Vec<User>> {
        self.select_users()
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.user_by_id(id)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_by_email(email)
    }

    async fn update_user(&self, user: &User) -> Result<()> {
        self.update_user_row(user)
    }

    async fn delete_user(&self, id: Uuid) -> Result<()> {
        self.delete_user_row(id)
    }
}

/// DuckDB audit store
///
/// Owns its own database file and connection so that an audit storage outage
/// is isolated from the ledger database.
pub struct DuckDbAuditStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbAuditStore {
    /// Open (or create) the audit database and run its migration chain
    pub fn new(db_path: &Path) -> Result<Self> {
        let conn = open_with_retry(db_path)?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let migration_service =
            MigrationService::new(&conn, crate::audit_migrations::AUDIT_MIGRATIONS);
        migration_service.run_pending()?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn row_to_entry(row: &duckdb::Row) -> Option<AuditEntry> {
        // 0: audit_id, 1: user_id, 2: action, 3: transaction_id,
        // 4: event_time, 5: before_state, 6: after_state, 7: diff, 8: meta
        let id_str: String = row.get(0).ok()?;
        let user_id_str: Option<String> = row.get(1).ok();
        let action_str: String = row.get(2).ok()?;
        let tx_id_str: Option<String> = row.get(3).ok();
        let time_str: String = row.get(4).ok()?;
        let before_json: Option<String> = row.get(5).ok();
        let after_json: Option<String> = row.get(6).ok();
        let diff_json: Option<String> = row.get(7).ok();
        let meta_json: Option<String> = row.get(8).ok();

        Some(AuditEntry {
            id: Uuid::parse_str(&id_str).ok()?,
            user_id: user_id_str.and_then(|s| Uuid::parse_str(&s).ok()),
            action: action_str.parse::<AuditAction>().ok()?,
            transaction_id: tx_id_str.and_then(|s| Uuid::parse_str(&s).ok()),
            timestamp: parse_timestamp(&time_str)?,
            before: before_json.and_then(|s| serde_json::from_str(&s).ok()),
            after: after_json.and_then(|s| serde_json::from_str(&s).ok()),
            diff: diff_json.and_then(|s| serde_json::from_str(&s).ok()),
            meta: meta_json.and_then(|s| serde_json::from_str(&s).ok()),
        })
    }
}

#[async_trait]
impl AuditStore for DuckDbAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sys_audit_log (audit_id, user_id, action, transaction_id,
                                        event_time, before_state, after_state, diff, meta)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.id.to_string(),
                entry.user_id.map(|u| u.to_string()),
                entry.action.as_str(),
                entry.transaction_id.map(|t| t.to_string()),
                entry.timestamp.to_rfc3339(),
                entry.before.as_ref().map(|v| v.to_string()),
                entry.after.as_ref().map(|v| v.to_string()),
                entry.diff.as_ref().map(|v| v.to_string()),
                entry.meta.as_ref().map(|v| v.to_string()),
            ],
        )?;
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter, page: u32, limit: u32) -> Result<Vec<AuditEntry>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT audit_id, user_id, action, transaction_id, event_time::VARCHAR,
                    before_state, after_state, diff, meta
             FROM sys_audit_log",
        );
        let mut clauses: Vec<&str> = Vec::new();
        let mut bind: Vec<String> = Vec::new();

        if let Some(user_id) = filter.user_id {
            clauses.push("user_id = ?");
            bind.push(user_id.to_string());
        }
        if let Some(action) = filter.action {
            clauses.push("action = ?");
            bind.push(action.as_str().to_string());
        }
        if let Some(start) = filter.start {
            clauses.push("event_time >= CAST(? AS TIMESTAMP)");
            bind.push(start.naive_utc().to_string());
        }
        if let Some(end) = filter.end {
            clauses.push("event_time <= CAST(? AS TIMESTAMP)");
            bind.push(end.naive_utc().to_string());
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY event_time DESC");
        let offset = (page.max(1) as i64 - 1) * limit as i64;
        sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(bind.iter()), |row| {
                Ok(Self::row_to_entry(row))
            })?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();

        Ok(entries)
    }

    async fn count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sys_audit_log", [], |row| row.get(0))?;
        Ok(count)
    }
}
