//! Adapter implementations of the ports

pub mod duckdb;

pub use duckdb::{DuckDbAuditStore, DuckDbRepository};
