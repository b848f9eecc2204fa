//! Client metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ratesync_telemetry::BatcherStats;

/// Synchronizer counters.
pub struct Metrics {
    /// Syncs that reached the gateway.
    pub syncs_total: AtomicU64,
    /// Syncs that stored a new snapshot.
    pub syncs_success: AtomicU64,
    /// Syncs that ended with a classified error.
    pub syncs_failed: AtomicU64,
    /// Requests dropped because a sync was already running.
    pub syncs_skipped: AtomicU64,
    /// Rate rows written by successful syncs.
    pub rates_upserted: AtomicU64,
}

impl Metrics {
    /// Create new metrics instance.
    pub fn new() -> Self {
        Self {
            syncs_total: AtomicU64::new(0),
            syncs_success: AtomicU64::new(0),
            syncs_failed: AtomicU64::new(0),
            syncs_skipped: AtomicU64::new(0),
            rates_upserted: AtomicU64::new(0),
        }
    }

    pub fn sync_started(&self) {
        self.syncs_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sync_success(&self, rows: usize) {
        self.syncs_success.fetch_add(1, Ordering::Relaxed);
        self.rates_upserted.fetch_add(rows as u64, Ordering::Relaxed);
    }

    pub fn sync_failed(&self) {
        self.syncs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sync_skipped(&self) {
        self.syncs_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            syncs_total: self.syncs_total.load(Ordering::Relaxed),
            syncs_success: self.syncs_success.load(Ordering::Relaxed),
            syncs_failed: self.syncs_failed.load(Ordering::Relaxed),
            syncs_skipped: self.syncs_skipped.load(Ordering::Relaxed),
            rates_upserted: self.rates_upserted.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus text format, telemetry counters included.
    pub fn to_prometheus(&self, telemetry: &BatcherStats) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP ratesync_syncs_total Total number of remote syncs
# TYPE ratesync_syncs_total counter
ratesync_syncs_total {}

# HELP ratesync_syncs_success Total successful syncs
# TYPE ratesync_syncs_success counter
ratesync_syncs_success {}

# HELP ratesync_syncs_failed Total failed syncs
# TYPE ratesync_syncs_failed counter
ratesync_syncs_failed {}

# HELP ratesync_syncs_skipped Sync requests skipped while one was running
# TYPE ratesync_syncs_skipped counter
ratesync_syncs_skipped {}

# HELP ratesync_rates_upserted Total rate rows written
# TYPE ratesync_rates_upserted counter
ratesync_rates_upserted {}

# HELP ratesync_events_tracked Total telemetry events tracked
# TYPE ratesync_events_tracked counter
ratesync_events_tracked {}

# HELP ratesync_events_flushed Total telemetry events delivered
# TYPE ratesync_events_flushed counter
ratesync_events_flushed {}

# HELP ratesync_events_dropped Telemetry events dropped by the queue cap
# TYPE ratesync_events_dropped counter
ratesync_events_dropped {}

# HELP ratesync_flushes_failed Failed telemetry flushes
# TYPE ratesync_flushes_failed counter
ratesync_flushes_failed {}

# HELP ratesync_events_queued Telemetry events waiting for delivery
# TYPE ratesync_events_queued gauge
ratesync_events_queued {}
"#,
            snapshot.syncs_total,
            snapshot.syncs_success,
            snapshot.syncs_failed,
            snapshot.syncs_skipped,
            snapshot.rates_upserted,
            telemetry.tracked,
            telemetry.flushed,
            telemetry.dropped,
            telemetry.failed_flushes,
            telemetry.queued,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub syncs_total: u64,
    pub syncs_success: u64,
    pub syncs_failed: u64,
    pub syncs_skipped: u64,
    pub rates_upserted: u64,
}

/// Shared metrics instance.
pub type SharedMetrics = Arc<Metrics>;
