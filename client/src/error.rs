//! Client error types.

use ratesync_common::CurrencyCode;
use ratesync_gateway::GatewayError;
use ratesync_store::StoreError;
use thiserror::Error;

/// Errors surfaced by [`RateClient`](crate::RateClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Remote gateway could not be constructed or used.
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// No rate is loaded for the currency yet.
    #[error("No rate loaded for {0}")]
    RateUnavailable(CurrencyCode),
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
