//! Arrowledger Core - Business logic for the Arrow Financial shared ledger
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Transaction, User, AuditEntry) and
//!   pure rules (field authorization, diffing, date parsing)
//! - **ports**: Trait definitions for external dependencies (Repository, AuditStore)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB)

pub mod adapters;
pub mod audit_migrations;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::{DuckDbAuditStore, DuckDbRepository};
use config::Config;
use ports::repository::Repository;
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    AuditAction, AuditEntry, AuditFilter, Category, Identity, Role, Transaction, User,
};
pub use domain::result::Error;

/// Main context for ledger operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connections, configuration, and all services.
pub struct LedgerContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub audit_service: Arc<AuditService>,
    pub ledger_service: LedgerService,
    pub aggregation_service: AggregationService,
    pub user_service: UserService,
    pub status_service: StatusService,
    pub doctor_service: DoctorService,
    pub demo_service: DemoService,
}

impl LedgerContext {
    /// Create a new ledger context rooted at `ledger_dir`
    ///
    /// The ledger and audit trail live in separate database files so that an
    /// audit storage outage never touches the ledger itself.
    pub fn new(ledger_dir: &Path) -> Result<Self> {
        let config = Config::load(ledger_dir)?;

        let db_path = ledger_dir.join("ledger.duckdb");
        let repository = Arc::new(DuckDbRepository::new(&db_path)?);
        repository.ensure_schema()?;

        let audit_path = ledger_dir.join("audit.duckdb");
        let audit_store = Arc::new(DuckDbAuditStore::new(&audit_path)?);
        let audit_service = Arc::new(AuditService::new(audit_store));

        let repo: Arc<dyn Repository> = repository.clone();
        let ledger_service = LedgerService::new(Arc::clone(&repo), Arc::clone(&audit_service));
        let aggregation_service = AggregationService::new(Arc::clone(&repo));
        let user_service = UserService::new(Arc::clone(&repo), Arc::clone(&audit_service));
        let status_service = StatusService::new(Arc::clone(&repo), Arc::clone(&audit_service));
        let doctor_service = DoctorService::new(Arc::clone(&repo));
        let demo_service = DemoService::new(Arc::clone(&repo));

        Ok(Self {
            config,
            repository,
            audit_service,
            ledger_service,
            aggregation_service,
            user_service,
            status_service,
            doctor_service,
            demo_service,
        })
    }
}
