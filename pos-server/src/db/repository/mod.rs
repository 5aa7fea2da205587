//! Repository Module
//!
//! Module-level async functions over `SqlitePool` / `SqliteExecutor`.
//! 仓储层只做 SQL 与行映射，不做业务判断；状态机规则在 services 层。

// Location
pub mod dining_table;

// Session lifecycle
pub mod history;
pub mod session;

// Order ledger
pub mod serving;
pub mod ticket;

// Checkout
pub mod checkout;

// Menu lookup
pub mod menu;

// Projections
pub mod table_summary;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            RepoError::Duplicate(err.to_string())
        } else {
            RepoError::Database(err.to_string())
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// SQLite unique-constraint violation (error code 2067 / 1555)
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
