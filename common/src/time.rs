//! Time utilities and timing constants.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Default timing values.
pub mod constants {
    use super::Duration;

    /// Delay between cold start and the first remote fetch (1 second).
    pub const STARTUP_SETTLE_DELAY: Duration = Duration::from_secs(1);

    /// Per-request timeout (30 seconds).
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Total resource timeout for one fetch (60 seconds).
    pub const RESOURCE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Display recomputation coalescing window (50 milliseconds).
    pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(50);

    /// Auto-flush suppression after a failed telemetry flush (30 seconds).
    pub const FLUSH_COOLDOWN: Duration = Duration::from_secs(30);
}

/// A UTC timestamp.
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Current time as whole seconds since the Unix epoch.
pub fn epoch_seconds() -> i64 {
    now().timestamp()
}
