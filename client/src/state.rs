//! Published synchronizer state.

use std::sync::Arc;

use ratesync_common::{find_rate, ClassifiedError, CurrencyCode, Rate, Timestamp};

/// Synchronizer phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// No fetch running.
    Idle,
    /// A fetch is in flight; further requests are no-ops.
    Syncing,
}

/// Snapshot observed by subscribers. Every value is fully applied.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    /// Rates sorted by code.
    pub rates: Arc<[Rate]>,
    /// Maximum `updated_at` among `rates`.
    pub last_updated: Option<Timestamp>,
    pub is_syncing: bool,
    /// Failure of the most recent sync, shown next to the unchanged rates.
    pub last_error: Option<ClassifiedError>,
}

impl SyncState {
    pub fn phase(&self) -> SyncPhase {
        if self.is_syncing {
            SyncPhase::Syncing
        } else {
            SyncPhase::Idle
        }
    }

    /// Look up a rate in this snapshot.
    pub fn rate(&self, code: &CurrencyCode) -> Option<&Rate> {
        find_rate(&self.rates, code)
    }

    /// Check if no rates are loaded yet.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
