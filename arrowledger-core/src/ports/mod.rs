//! Port definitions for external dependencies

pub mod audit;
pub mod repository;

pub use audit::AuditStore;
pub use repository::{Repository, TransactionFilter};
