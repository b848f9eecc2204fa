//! The rate synchronizer.
//!
//! Owns the published [`SyncState`], reconciles the local store with the
//! remote gateway under a single-flight guarantee, and classifies failures
//! without ever discarding the last good snapshot.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ratesync_common::{
    find_rate, is_valid_units, latest_update, ClassifiedError, CurrencyCode, Rate, SyncErrorKind,
    Timestamp,
};
use ratesync_gateway::{CurrencyNames, RatesPayload, RemoteGateway};
use ratesync_store::{RateStore, StoreResult};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tracing::{debug, info, instrument, warn};

use crate::config::SyncConfig;
use crate::defaults;
use crate::metrics::SharedMetrics;
use crate::state::SyncState;

/// Result of one [`RateSynchronizer::sync_remote`] call.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// The fetched snapshot was stored and published.
    Completed { rates: Arc<[Rate]> },
    /// The sync failed; the previous snapshot is still published.
    Failed(SyncErrorKind),
    /// Another sync was already running.
    Skipped,
}

impl SyncOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SyncOutcome::Completed { .. })
    }
}

/// Holds the single-flight flag for one sync.
///
/// Dropping it without [`complete`](Self::complete) means the sync was
/// cancelled or panicked: `is_syncing` is cleared and a timeout is published.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    state: &'a watch::Sender<SyncState>,
    completed: bool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, state: &'a watch::Sender<SyncState>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag,
                state,
                completed: false,
            })
    }

    fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            warn!("Sync cancelled before completion");
            self.state.send_modify(|s| {
                s.is_syncing = false;
                s.last_error = Some(ClassifiedError::new(SyncErrorKind::Timeout, "sync cancelled"));
            });
        }
        self.flag.store(false, Ordering::Release);
    }
}

/// Keeps the rate table fresh against the remote service.
pub struct RateSynchronizer {
    store: Arc<dyn RateStore>,
    gateway: Arc<dyn RemoteGateway>,
    base: CurrencyCode,
    config: SyncConfig,
    state: watch::Sender<SyncState>,
    syncing: AtomicBool,
    // Serialises "read or write the store, then publish" sequences so a slow
    // reader can never publish over a newer snapshot.
    publish: AsyncMutex<()>,
    metrics: SharedMetrics,
}

impl RateSynchronizer {
    /// Create a new synchronizer with an empty published state.
    pub fn new(
        store: Arc<dyn RateStore>,
        gateway: Arc<dyn RemoteGateway>,
        base: CurrencyCode,
        config: SyncConfig,
        metrics: SharedMetrics,
    ) -> Self {
        let (state, _) = watch::channel(SyncState::default());
        Self {
            store,
            gateway,
            base,
            config,
            state,
            syncing: AtomicBool::new(false),
            publish: AsyncMutex::new(()),
            metrics,
        }
    }

    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    /// Observe published state.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    pub fn state(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Rates of the current snapshot, sorted by code.
    pub fn current_rates(&self) -> Arc<[Rate]> {
        Arc::clone(&self.state.borrow().rates)
    }

    /// Look up a rate; `None` means it is not loaded (yet).
    pub fn rate(&self, code: &CurrencyCode) -> Option<Rate> {
        find_rate(&self.state.borrow().rates, code).cloned()
    }

    /// Snapshot time of the newest loaded row.
    pub fn last_synced_at(&self) -> Option<Timestamp> {
        self.state.borrow().last_updated
    }

    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Load the store into the published state. Never touches the network.
    ///
    /// A store failure is logged and yields an empty result; the published
    /// state is left as it was.
    #[instrument(skip(self))]
    pub async fn load_local(&self) -> Vec<Rate> {
        let _publish = self.publish.lock().await;
        match self.store.load_rates().await {
            Ok(rates) => {
                debug!(count = rates.len(), "Loaded local rates");
                self.publish_rates(&rates);
                rates
            }
            Err(e) => {
                warn!(error = %e, "Failed to load local rates");
                Vec::new()
            }
        }
    }

    /// Seed the built-in table into an empty store, then reload.
    ///
    /// Only codes still absent are written, so seeding after a completed
    /// sync never replaces fetched rates. Returns the number of seeded rows.
    #[instrument(skip(self))]
    pub async fn seed_defaults(&self) -> usize {
        match self.store.load_rates().await {
            Ok(rates) if rates.is_empty() => {}
            Ok(_) => return 0,
            Err(e) => {
                warn!(error = %e, "Cannot check store before seeding");
                return 0;
            }
        }

        let seeded = match self.store.insert_missing_rates(&defaults::default_rates(&self.base)).await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Failed to seed default rates");
                return 0;
            }
        };

        info!(count = seeded, "Seeded default rates");
        self.load_local().await;
        seeded
    }

    /// Fetch the remote snapshot and store it.
    ///
    /// Single-flight: while a sync runs, further calls return
    /// [`SyncOutcome::Skipped`] immediately. On failure the store is not
    /// touched and the previous snapshot stays published next to the
    /// classified error.
    #[instrument(skip(self))]
    pub async fn sync_remote(&self) -> SyncOutcome {
        let Some(mut guard) = InFlightGuard::acquire(&self.syncing, &self.state) else {
            info!("Sync already in progress, skipping");
            self.metrics.sync_skipped();
            return SyncOutcome::Skipped;
        };

        self.metrics.sync_started();
        self.state.send_modify(|s| {
            s.is_syncing = true;
            s.last_error = None;
        });

        let result = match tokio::time::timeout(self.config.fetch_timeout, self.fetch_and_store()).await {
            Ok(result) => result,
            Err(_) => Err(ClassifiedError::new(
                SyncErrorKind::Timeout,
                format!("fetch exceeded {:?}", self.config.fetch_timeout),
            )),
        };

        let outcome = match result {
            Ok((rates, written)) => {
                self.metrics.sync_success(written);
                info!(count = rates.len(), "Sync completed");
                SyncOutcome::Completed { rates }
            }
            Err(err) => {
                self.metrics.sync_failed();
                warn!(kind = %err.kind, error = %err.message, "Sync failed");
                let kind = err.kind;
                self.state.send_modify(|s| s.last_error = Some(err));
                SyncOutcome::Failed(kind)
            }
        };

        self.state.send_modify(|s| s.is_syncing = false);
        guard.complete();
        outcome
    }

    /// Delete every rate and publish the empty snapshot.
    #[instrument(skip(self))]
    pub async fn clear_cache(&self) -> StoreResult<u64> {
        let _publish = self.publish.lock().await;
        let removed = self.store.clear_rates().await?;
        self.publish_rates(&[]);
        info!(removed, "Rate cache cleared");
        Ok(removed)
    }

    async fn fetch_and_store(&self) -> Result<(Arc<[Rate]>, usize), ClassifiedError> {
        let (payload, names) = if self.config.fetch_names {
            let (payload, names) =
                tokio::join!(self.gateway.fetch_rates(), self.gateway.fetch_currency_names());
            let names = names
                .map_err(|e| warn!(error = %e, "Currency names unavailable, using fallbacks"))
                .unwrap_or_default();
            (payload, names)
        } else {
            (self.gateway.fetch_rates().await, CurrencyNames::default())
        };
        let payload = payload.map_err(|e| ClassifiedError::new(e.kind(), e.to_string()))?;

        let rows = self.build_rows(&payload, &names)?;

        let _publish = self.publish.lock().await;
        let written = self
            .store
            .upsert_rates(&rows)
            .await
            .map_err(|e| ClassifiedError::new(SyncErrorKind::StorageFailure, e.to_string()))?;

        let rates = match self.store.load_rates().await {
            Ok(rates) => rates,
            Err(e) => {
                warn!(error = %e, "Reload after sync failed, merging in memory");
                self.merge_with_snapshot(rows)
            }
        };
        let rates = self.publish_rates(&rates);
        Ok((rates, written))
    }

    /// Turn a payload into store rows, inverting each quote.
    fn build_rows(&self, payload: &RatesPayload, names: &CurrencyNames) -> Result<Vec<Rate>, ClassifiedError> {
        if payload.base != self.base {
            return Err(ClassifiedError::new(
                SyncErrorKind::MalformedResponse,
                format!("expected base {}, got {}", self.base, payload.base),
            ));
        }

        let snapshot = self.current_rates();
        let name_for = |code: &CurrencyCode| -> String {
            names
                .get(code)
                .map(str::to_string)
                .or_else(|| {
                    find_rate(&snapshot, code)
                        .map(|r| r.display_name.clone())
                        .filter(|n| n != code.as_str())
                })
                .or_else(|| defaults::display_name(code).map(str::to_string))
                .unwrap_or_else(|| code.to_string())
        };

        let at = payload.updated_at;
        let mut rows = vec![Rate::base(self.base.clone(), name_for(&self.base), at)];
        let mut quoted = 0usize;

        for (code, &quote) in &payload.rates {
            if code == &self.base {
                continue;
            }
            quoted += 1;
            let units = 1.0 / quote;
            if !is_valid_units(quote) || !is_valid_units(units) {
                warn!(code = %code, value = quote, "Skipping invalid remote rate");
                continue;
            }
            rows.push(Rate::new(code.clone(), name_for(code), units, at));
        }

        // No quotes at all is the service's "no data yet" answer; only the
        // base row is written.
        if quoted == 0 {
            info!("Remote snapshot has no quotes, refreshing base only");
        } else if rows.len() == 1 {
            return Err(ClassifiedError::new(
                SyncErrorKind::MalformedResponse,
                "payload contains no usable rates",
            ));
        }
        Ok(rows)
    }

    fn merge_with_snapshot(&self, rows: Vec<Rate>) -> Vec<Rate> {
        let mut merged: BTreeMap<CurrencyCode, Rate> = self
            .current_rates()
            .iter()
            .map(|r| (r.code.clone(), r.clone()))
            .collect();
        for row in rows {
            merged.insert(row.code.clone(), row);
        }
        merged.into_values().collect()
    }

    /// Replace the published snapshot wholesale.
    fn publish_rates(&self, rates: &[Rate]) -> Arc<[Rate]> {
        let rates: Arc<[Rate]> = Arc::from(rates);
        let last_updated = latest_update(&rates);
        let published = Arc::clone(&rates);
        self.state.send_modify(move |s| {
            s.rates = published;
            s.last_updated = last_updated;
        });
        rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Metrics;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use ratesync_gateway::{GatewayError, MockGateway};
    use ratesync_store::{MemoryStore, SqliteStore};
    use std::time::Duration;

    fn snapshot_time() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap()
    }

    fn payload(rates: Vec<(&str, f64)>) -> RatesPayload {
        RatesPayload::new(
            snapshot_time(),
            CurrencyCode::rub(),
            rates.into_iter().map(|(c, v)| (CurrencyCode::new(c), v)),
        )
    }

    fn ten_rates() -> Vec<Rate> {
        let at = snapshot_time() - ChronoDuration::days(1);
        ["AUD", "CAD", "CHF", "CNY", "EUR", "GBP", "JPY", "RUB", "TRY", "USD"]
            .iter()
            .enumerate()
            .map(|(i, code)| Rate::new(*code, *code, 1.0 + i as f64, at))
            .collect()
    }

    fn synchronizer(store: Arc<dyn RateStore>, gateway: Arc<MockGateway>) -> RateSynchronizer {
        RateSynchronizer::new(
            store,
            gateway,
            CurrencyCode::rub(),
            SyncConfig::default(),
            Arc::new(Metrics::new()),
        )
    }

    #[tokio::test]
    async fn test_sync_inverts_remote_quotes() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("USD", 0.012518), ("EUR", 0.01)]));
        let sync = synchronizer(store.clone(), gateway.clone());

        let outcome = sync.sync_remote().await;
        assert!(outcome.is_completed());

        let usd = sync.rate(&CurrencyCode::usd()).unwrap();
        assert!((usd.units_per_base - 1.0 / 0.012518).abs() < 1e-9);
        assert_eq!(usd.updated_at, snapshot_time());

        let rub = sync.rate(&CurrencyCode::rub()).unwrap();
        assert_eq!(rub.units_per_base, 1.0);
        assert_eq!(sync.last_synced_at(), Some(snapshot_time()));
        assert_eq!(store.snapshot().len(), 3);
    }

    #[tokio::test]
    async fn test_base_entry_in_payload_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("RUB", 2.0), ("USD", 0.01)]));
        let sync = synchronizer(store, gateway);

        sync.sync_remote().await;
        assert_eq!(sync.rate(&CurrencyCode::rub()).unwrap().units_per_base, 1.0);
    }

    #[tokio::test]
    async fn test_invalid_quotes_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("USD", 0.01), ("EUR", 0.0), ("GBP", -1.0)]));
        let sync = synchronizer(store, gateway);

        assert!(sync.sync_remote().await.is_completed());
        assert!(sync.rate(&CurrencyCode::usd()).is_some());
        assert!(sync.rate(&CurrencyCode::eur()).is_none());
        assert!(sync.rate(&CurrencyCode::gbp()).is_none());
    }

    #[tokio::test]
    async fn test_all_invalid_payload_is_malformed() {
        let store = Arc::new(MemoryStore::with_rates(ten_rates()));
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("USD", f64::NAN), ("EUR", 0.0)]));
        let sync = synchronizer(store.clone(), gateway);
        sync.load_local().await;

        match sync.sync_remote().await {
            SyncOutcome::Failed(kind) => assert_eq!(kind, SyncErrorKind::MalformedResponse),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.upsert_calls(), 0);
        assert_eq!(sync.current_rates().len(), 10);
    }

    #[tokio::test]
    async fn test_empty_payload_refreshes_base_only() {
        let store = Arc::new(MemoryStore::with_rates(ten_rates()));
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![]));
        let sync = synchronizer(store.clone(), gateway);
        sync.load_local().await;

        assert!(sync.sync_remote().await.is_completed());
        assert_eq!(store.upsert_calls(), 1);

        let state = sync.state();
        assert!(state.last_error.is_none());
        assert_eq!(state.rates.len(), 10);
        let rub = state.rate(&CurrencyCode::rub()).unwrap();
        assert_eq!(rub.units_per_base, 1.0);
        assert_eq!(rub.updated_at, snapshot_time());
        let usd = state.rate(&CurrencyCode::usd()).unwrap();
        assert_eq!(usd.updated_at, snapshot_time() - ChronoDuration::days(1));
    }

    #[tokio::test]
    async fn test_base_only_payload_refreshes_base_only() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("RUB", 1.0)]));
        let sync = synchronizer(store.clone(), gateway);

        assert!(sync.sync_remote().await.is_completed());
        assert!(sync.state().last_error.is_none());

        let stored = store.snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].code, CurrencyCode::rub());
        assert_eq!(sync.last_synced_at(), Some(snapshot_time()));
    }

    #[tokio::test]
    async fn test_readers_never_see_partial_snapshot() {
        let old_at = snapshot_time() - ChronoDuration::days(1);
        let store = Arc::new(MemoryStore::with_rates(ten_rates()));
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![
            ("AUD", 0.5),
            ("CAD", 0.25),
            ("CHF", 0.125),
            ("CNY", 0.0625),
            ("EUR", 0.03125),
            ("GBP", 0.015625),
            ("JPY", 0.5),
            ("TRY", 0.25),
            ("USD", 0.125),
        ]));
        let sync = Arc::new(synchronizer(store.clone(), gateway));
        sync.load_local().await;

        store.hold_commits();
        let running = tokio::spawn({
            let sync = Arc::clone(&sync);
            async move { sync.sync_remote().await }
        });
        while store.upsert_calls() == 0 {
            tokio::task::yield_now().await;
        }

        // The store already holds the new rows; the published table must not.
        assert!(store.snapshot().iter().all(|r| r.updated_at == snapshot_time()));
        let reader = tokio::spawn({
            let sync = Arc::clone(&sync);
            async move { sync.current_rates() }
        });
        let seen = reader.await.unwrap();
        assert_eq!(seen.len(), 10);
        assert!(seen.iter().all(|r| r.updated_at == old_at));

        store.release_commits();
        assert!(running.await.unwrap().is_completed());

        let after = sync.current_rates();
        assert_eq!(after.len(), 10);
        assert!(after.iter().all(|r| r.updated_at == snapshot_time()));
    }

    #[tokio::test]
    async fn test_failure_preserves_snapshot() {
        let store = Arc::new(MemoryStore::with_rates(ten_rates()));
        let gateway = Arc::new(MockGateway::default());
        gateway.fail_rates(Some(GatewayError::Offline("airplane mode".into())));
        let sync = synchronizer(store.clone(), gateway);

        assert_eq!(sync.load_local().await.len(), 10);
        let before = sync.last_synced_at();

        let outcome = sync.sync_remote().await;
        assert!(matches!(outcome, SyncOutcome::Failed(SyncErrorKind::NoConnectivity)));

        let state = sync.state();
        assert_eq!(state.rates.len(), 10);
        assert_eq!(state.last_updated, before);
        assert!(!state.is_syncing);
        assert_eq!(state.last_error.unwrap().kind, SyncErrorKind::NoConnectivity);
        assert_eq!(store.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_is_classified() {
        let store = Arc::new(MemoryStore::with_rates(ten_rates()));
        store.set_fail_writes(true);
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("USD", 0.01)]));
        let sync = synchronizer(store.clone(), gateway);
        sync.load_local().await;

        let outcome = sync.sync_remote().await;
        assert!(matches!(outcome, SyncOutcome::Failed(SyncErrorKind::StorageFailure)));
        assert_eq!(sync.current_rates().len(), 10);
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::default());
        gateway.fail_rates(Some(GatewayError::Timeout));
        let sync = synchronizer(store, gateway.clone());

        sync.sync_remote().await;
        assert!(sync.state().last_error.is_some());

        gateway.fail_rates(None);
        gateway.set_rates(payload(vec![("USD", 0.01)]));
        assert!(sync.sync_remote().await.is_completed());
        assert!(sync.state().last_error.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_syncs_make_one_remote_call() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("USD", 0.01)]));
        gateway.hold();
        let sync = Arc::new(synchronizer(store, gateway.clone()));

        let first = {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.sync_remote().await })
        };
        while gateway.rate_calls() == 0 {
            tokio::task::yield_now().await;
        }
        assert!(sync.state().is_syncing);

        let second = sync.sync_remote().await;
        assert!(matches!(second, SyncOutcome::Skipped));

        gateway.release();
        assert!(first.await.unwrap().is_completed());
        assert_eq!(gateway.rate_calls(), 1);
        assert!(!sync.is_syncing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_timeout_releases_flag() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("USD", 0.01)]));
        gateway.set_rates_delay(Some(Duration::from_secs(120)));
        let sync = synchronizer(store, gateway.clone());

        let outcome = sync.sync_remote().await;
        assert!(matches!(outcome, SyncOutcome::Failed(SyncErrorKind::Timeout)));
        assert!(!sync.is_syncing());

        gateway.set_rates_delay(None);
        assert!(sync.sync_remote().await.is_completed());
    }

    #[tokio::test]
    async fn test_cancelled_sync_releases_flag() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("USD", 0.01)]));
        gateway.hold();
        let sync = Arc::new(synchronizer(store, gateway.clone()));

        let task = {
            let sync = Arc::clone(&sync);
            tokio::spawn(async move { sync.sync_remote().await })
        };
        while gateway.rate_calls() == 0 {
            tokio::task::yield_now().await;
        }
        task.abort();
        let _ = task.await;

        let state = sync.state();
        assert!(!state.is_syncing);
        assert_eq!(state.last_error.unwrap().kind, SyncErrorKind::Timeout);
        assert!(!sync.is_syncing());
    }

    #[tokio::test]
    async fn test_names_fallback_chain() {
        let store = Arc::new(MemoryStore::with_rates(vec![Rate::new(
            "XAU",
            "Gold",
            5000.0,
            snapshot_time(),
        )]));
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("USD", 0.01), ("XAU", 0.0002), ("XAG", 0.01), ("EUR", 0.01)]));
        gateway.set_name("EUR", "Euro (remote)");
        let sync = synchronizer(store, gateway);
        sync.load_local().await;

        sync.sync_remote().await;
        assert_eq!(sync.rate(&CurrencyCode::eur()).unwrap().display_name, "Euro (remote)");
        assert_eq!(sync.rate(&CurrencyCode::new("XAU")).unwrap().display_name, "Gold");
        assert_eq!(sync.rate(&CurrencyCode::usd()).unwrap().display_name, "US Dollar");
        assert_eq!(sync.rate(&CurrencyCode::new("XAG")).unwrap().display_name, "XAG");
    }

    #[tokio::test]
    async fn test_names_failure_does_not_fail_sync() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("USD", 0.01)]));
        gateway.fail_names(Some(GatewayError::from_status(500, "boom")));
        let sync = synchronizer(store, gateway);

        assert!(sync.sync_remote().await.is_completed());
        assert_eq!(sync.rate(&CurrencyCode::usd()).unwrap().display_name, "US Dollar");
    }

    #[tokio::test]
    async fn test_wrong_base_is_malformed() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(RatesPayload::new(
            snapshot_time(),
            CurrencyCode::usd(),
            vec![(CurrencyCode::eur(), 0.9)],
        ));
        let sync = synchronizer(store, gateway);

        assert!(matches!(
            sync.sync_remote().await,
            SyncOutcome::Failed(SyncErrorKind::MalformedResponse)
        ));
    }

    #[tokio::test]
    async fn test_load_local_swallows_store_errors() {
        let store = Arc::new(MemoryStore::with_rates(ten_rates()));
        let gateway = Arc::new(MockGateway::default());
        let sync = synchronizer(store.clone(), gateway);
        assert_eq!(sync.load_local().await.len(), 10);

        store.set_fail_reads(true);
        assert!(sync.load_local().await.is_empty());
        // Published state keeps the last good load.
        assert_eq!(sync.current_rates().len(), 10);
    }

    #[tokio::test]
    async fn test_last_updated_is_maximum() {
        let old = snapshot_time() - ChronoDuration::days(10);
        let store = Arc::new(MemoryStore::with_rates(vec![
            Rate::new("AUD", "Australian Dollar", 58.0, old),
            Rate::new("USD", "US Dollar", 90.0, snapshot_time()),
        ]));
        let sync = synchronizer(store, Arc::new(MockGateway::default()));

        sync.load_local().await;
        assert_eq!(sync.last_synced_at(), Some(snapshot_time()));
    }

    #[tokio::test]
    async fn test_cold_start_seeds_defaults() {
        let store = Arc::new(MemoryStore::new());
        let sync = synchronizer(store.clone(), Arc::new(MockGateway::default()));

        assert!(sync.load_local().await.is_empty());
        assert_eq!(sync.seed_defaults().await, 10);
        assert_eq!(sync.current_rates().len(), 10);

        // A second seed is a no-op.
        assert_eq!(sync.seed_defaults().await, 0);
    }

    #[tokio::test]
    async fn test_seed_after_sync_keeps_fresh_rates() {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("USD", 0.01)]));
        let sync = synchronizer(store.clone(), gateway);

        sync.sync_remote().await;
        assert_eq!(sync.seed_defaults().await, 0);
        assert_eq!(sync.rate(&CurrencyCode::usd()).unwrap().units_per_base, 100.0);
    }

    #[tokio::test]
    async fn test_snapshot_is_replaced_atomically() {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        store.upsert_rates(&ten_rates()).await.unwrap();
        let gateway = Arc::new(MockGateway::default());
        gateway.set_rates(payload(vec![("USD", 0.01), ("EUR", 0.009)]));
        let sync = synchronizer(store, gateway);
        sync.load_local().await;

        let mut rx = sync.subscribe();
        let _ = rx.borrow_and_update();
        sync.sync_remote().await;

        // Every published value is internally consistent.
        let state = rx.borrow_and_update().clone();
        assert_eq!(state.rates.len(), 10);
        assert_eq!(state.last_updated, latest_update(&state.rates));
        assert_eq!(state.rate(&CurrencyCode::usd()).unwrap().updated_at, snapshot_time());
        assert_eq!(state.rate(&CurrencyCode::new("AUD")).unwrap().units_per_base, 1.0);
    }

    #[tokio::test]
    async fn test_clear_cache_publishes_empty_snapshot() {
        let store = Arc::new(MemoryStore::with_rates(ten_rates()));
        let sync = synchronizer(store.clone(), Arc::new(MockGateway::default()));
        sync.load_local().await;

        assert_eq!(sync.clear_cache().await.unwrap(), 10);
        assert!(sync.current_rates().is_empty());
        assert!(sync.last_synced_at().is_none());
        assert!(store.snapshot().is_empty());
    }
}
