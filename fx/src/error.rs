//! Conversion engine error types.

use thiserror::Error;

/// Errors that can occur in the conversion engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FxError {
    /// Locale identifier not recognised.
    #[error("Unknown number locale: {0}")]
    UnknownLocale(String),
}

/// Result type for conversion engine operations.
pub type FxResult<T> = Result<T, FxError>;
