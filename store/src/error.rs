//! Store error types.

use ratesync_common::CurrencyCode;
use thiserror::Error;

/// Errors raised by a rate or settings store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying database rejected the operation.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A rate that would break the table invariants was offered for writing.
    #[error("Invalid rate for {code}: {value}")]
    InvalidRate { code: CurrencyCode, value: f64 },

    /// Persisted data could not be decoded.
    #[error("Corrupt {field}: {reason}")]
    Corrupt { field: &'static str, reason: String },

    /// Filesystem error while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
