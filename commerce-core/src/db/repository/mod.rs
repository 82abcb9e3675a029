//! Repository Module
//!
//! Free async functions over `&SqlitePool`, one module per aggregate.
//! Mutations that race (voucher capacity, usage status flips, stock
//! deltas) are single conditional UPDATE statements — the caller learns
//! the outcome from `rows_affected()`, never from a prior read.

pub mod order;
pub mod product;
pub mod return_request;
pub mod voucher;
pub mod voucher_usage;

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
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
