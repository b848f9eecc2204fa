//! ratesync Remote Gateway
//!
//! Interface to the remote pricing service: fetch the latest rate snapshot,
//! fetch currency display names, and submit telemetry batches.
//!
//! Every failure is a [`GatewayError`] that classifies itself into a
//! [`SyncErrorKind`](ratesync_common::SyncErrorKind) via
//! [`GatewayError::kind`].

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod wire;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use config::GatewayConfig;
pub use error::{GatewayError, GatewayResult};
pub use gateway::RemoteGateway;
pub use http::HttpGateway;
pub use wire::{CurrencyNames, RatesPayload, StatsBatch};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockGateway;
