//! Audit database migrations - embedded SQL files
//!
//! The audit trail lives in its own database file with its own migration
//! chain, so an audit storage outage never touches the ledger database.

/// All audit migrations, embedded at compile time.
/// Format: (filename, sql_content)
pub const AUDIT_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    (
        "001_audit_log.sql",
        include_str!("001_audit_log.sql"),
    ),
];
