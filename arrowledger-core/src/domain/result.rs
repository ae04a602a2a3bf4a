//! Result and error types for the core library

use thiserror::Error;
use uuid::Uuid;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Reorder lost the optimistic-concurrency race. Carries the
    /// authoritative current order so the caller can rebase and retry.
    #[error("Ordering changed")]
    OrderConflict { current_order: Vec<Uuid> },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a forbidden error
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Wire-level error code for the HTTP layer
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::OrderConflict { .. } => "ORDER_CONFLICT",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::validation("bad input").error_code(), "VALIDATION");
        assert_eq!(Error::forbidden("no").error_code(), "FORBIDDEN");
        assert_eq!(Error::not_found("gone").error_code(), "NOT_FOUND");
        assert_eq!(
            Error::OrderConflict { current_order: vec![] }.error_code(),
            "ORDER_CONFLICT"
        );
        assert_eq!(Error::database("boom").error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_order_conflict_carries_current_order() {
        let ids = vec![Uuid::new_v4(), Uuid::new_v4()];
        let err = Error::OrderConflict { current_order: ids.clone() };
        match err {
            Error::OrderConflict { current_order } => assert_eq!(current_order, ids),
            _ => panic!("wrong variant"),
        }
    }
}
