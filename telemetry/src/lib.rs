//! ratesync Event Batcher
//!
//! In-memory FIFO of telemetry events, flushed to the remote gateway in
//! bounded batches. Delivery is at-least-once: a batch leaves the queue only
//! after the gateway accepted it.

pub mod batcher;
pub mod config;
pub mod events;

pub use batcher::{BatcherStats, EventBatcher, FlushOutcome};
pub use config::BatcherConfig;
