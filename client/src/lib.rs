//! ratesync Client
//!
//! The local-first rate client: a [`RateSynchronizer`] that keeps the stored
//! rate table fresh against the remote service, the converter display model,
//! and the [`RateClient`] composition root that wires store, gateway,
//! synchronizer and telemetry together.

pub mod client;
pub mod config;
pub mod debounce;
pub mod defaults;
pub mod display;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod state;
pub mod synchronizer;

pub use client::RateClient;
pub use config::{ClientConfig, SyncConfig};
pub use display::{ActiveInput, DisplayRow};
pub use error::{ClientError, ClientResult};
pub use metrics::{Metrics, MetricsSnapshot};
pub use state::{SyncPhase, SyncState};
pub use synchronizer::{RateSynchronizer, SyncOutcome};
