//! Composition root wiring store, gateway, synchronizer and telemetry.

use std::sync::Arc;

use parking_lot::Mutex;
use ratesync_common::{
    CurrencyCode, DeviceId, EventParams, Rate, Timestamp, UserCurrencySelection,
};
use ratesync_fx::{convert, NumberLocale};
use ratesync_gateway::{HttpGateway, RemoteGateway};
use ratesync_store::{RateStore, SettingsStore, SqliteStore, StoreResult};
use ratesync_telemetry::{BatcherStats, EventBatcher, FlushOutcome};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::config::ClientConfig;
use crate::debounce::Debouncer;
use crate::defaults;
use crate::display::{project_rows, ActiveInput, DisplayRow};
use crate::error::{ClientError, ClientResult};
use crate::metrics::{Metrics, MetricsSnapshot, SharedMetrics};
use crate::scheduler::DeferredTask;
use crate::state::SyncState;
use crate::synchronizer::{RateSynchronizer, SyncOutcome};

/// Selection, typed input and the rows derived from them.
struct DisplayModel {
    sync: Arc<RateSynchronizer>,
    selection: Mutex<UserCurrencySelection>,
    input: Mutex<ActiveInput>,
    locale: NumberLocale,
    rows: watch::Sender<Arc<[DisplayRow]>>,
}

impl DisplayModel {
    fn project(&self) -> Vec<DisplayRow> {
        let rates = self.sync.current_rates();
        let selection = self.selection.lock().clone();
        let input = self.input.lock().clone();
        project_rows(&selection, &rates, &input, self.locale)
    }

    fn recompute(&self) {
        let rows = self.project();
        debug!(rows = rows.len(), "Display recomputed");
        self.rows.send_replace(rows.into());
    }
}

/// The client-facing service.
///
/// Constructed once by the host application and shared by reference; all
/// collaborators are injected here rather than reached through globals.
pub struct RateClient {
    /// Configuration.
    config: ClientConfig,
    /// Persisted selection and device id.
    settings: Arc<dyn SettingsStore>,
    /// Rate synchronizer, shared with background tasks.
    sync: Arc<RateSynchronizer>,
    /// Telemetry queue.
    batcher: EventBatcher,
    /// Converter rows.
    display: Arc<DisplayModel>,
    /// Coalesces display recomputation.
    debouncer: Arc<Debouncer>,
    /// Serialises selection save order.
    selection_writes: AsyncMutex<()>,
    /// Pending startup sync.
    startup: Mutex<Option<DeferredTask>>,
    /// Background tasks aborted on shutdown.
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Sync counters.
    metrics: SharedMetrics,
}

impl RateClient {
    /// Open the SQLite store and HTTP gateway described by `config`.
    pub async fn open(config: ClientConfig) -> ClientResult<Self> {
        config.validate().map_err(ClientError::Config)?;

        let store = Arc::new(SqliteStore::open(&config.database_path).await?);
        let gateway = Arc::new(HttpGateway::new(config.gateway.clone())?);
        info!(
            db = %config.database_path.display(),
            base_url = %config.gateway.base_url,
            "Opened rate client"
        );

        Self::with_components(store, gateway, config).await
    }

    /// Build a client from explicit collaborators.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn with_components<S>(
        store: Arc<S>,
        gateway: Arc<dyn RemoteGateway>,
        config: ClientConfig,
    ) -> ClientResult<Self>
    where
        S: RateStore + SettingsStore + 'static,
    {
        let base = config.base_currency.clone();
        let device_id = store.load_or_create_device_id().await?;
        let selection = load_selection(store.as_ref(), &base).await?;

        let metrics: SharedMetrics = Arc::new(Metrics::new());
        let sync = Arc::new(RateSynchronizer::new(
            store.clone(),
            Arc::clone(&gateway),
            base.clone(),
            config.sync.clone(),
            Arc::clone(&metrics),
        ));
        let batcher = EventBatcher::new(gateway, device_id, config.batcher.clone());

        let (rows, _) = watch::channel::<Arc<[DisplayRow]>>(Arc::from(Vec::new()));
        let display = Arc::new(DisplayModel {
            sync: Arc::clone(&sync),
            selection: Mutex::new(selection),
            input: Mutex::new(ActiveInput::new(base, 1.0)),
            locale: config.locale,
            rows,
        });

        let debouncer = {
            let display = Arc::clone(&display);
            Arc::new(Debouncer::new(config.debounce_window, move || display.recompute()))
        };

        debug!(device_id = %device_id, "Rate client assembled");

        Ok(Self {
            config,
            settings: store,
            sync,
            batcher,
            display,
            debouncer,
            selection_writes: AsyncMutex::new(()),
            startup: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
            metrics,
        })
    }

    /// Load local rates, seeding defaults into an empty store, without
    /// touching the network or starting background work.
    pub async fn load(&self) -> Vec<Rate> {
        let rates = self.sync.load_local().await;
        if !rates.is_empty() {
            return rates;
        }
        self.sync.seed_defaults().await;
        self.sync.current_rates().to_vec()
    }

    /// Start the client.
    ///
    /// Publishes the stored snapshot before returning. Seeding an empty
    /// store and the first remote sync run in the background, the latter
    /// after the configured settle delay.
    #[instrument(skip(self))]
    pub async fn start(&self) {
        let rates = self.sync.load_local().await;
        self.display.recompute();

        let mut tasks = Vec::new();

        if rates.is_empty() {
            let sync = Arc::clone(&self.sync);
            tasks.push(tokio::spawn(async move {
                sync.seed_defaults().await;
            }));
        }

        {
            let mut state = self.sync.subscribe();
            let debouncer = Arc::clone(&self.debouncer);
            tasks.push(tokio::spawn(async move {
                while state.changed().await.is_ok() {
                    debouncer.call();
                }
            }));
        }

        self.tasks.lock().extend(tasks);

        let sync = Arc::clone(&self.sync);
        let batcher = self.batcher.clone();
        let startup = DeferredTask::schedule(self.config.sync.settle_delay, move || async move {
            run_sync(&sync, &batcher).await;
        });
        if let Some(previous) = self.startup.lock().replace(startup) {
            previous.cancel();
        }

        self.batcher.track_app_open();
        info!(rates = rates.len(), "Rate client started");
    }

    /// Run one remote sync and wait for its outcome.
    pub async fn sync_now(&self) -> SyncOutcome {
        run_sync(&self.sync, &self.batcher).await
    }

    /// Start a remote sync in the background and return immediately.
    ///
    /// Progress and errors are observed through [`subscribe`](Self::subscribe).
    /// A trigger while a sync runs is skipped by the synchronizer.
    pub fn trigger_sync(&self) {
        let sync = Arc::clone(&self.sync);
        let batcher = self.batcher.clone();
        let handle = tokio::spawn(async move {
            run_sync(&sync, &batcher).await;
        });
        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(handle);
    }

    /// Delete every cached rate.
    pub async fn clear_cache(&self) -> StoreResult<u64> {
        self.sync.clear_cache().await
    }

    pub fn current_rates(&self) -> Arc<[Rate]> {
        self.sync.current_rates()
    }

    pub fn rate(&self, code: &CurrencyCode) -> Option<Rate> {
        self.sync.rate(code)
    }

    pub fn last_synced_at(&self) -> Option<Timestamp> {
        self.sync.last_synced_at()
    }

    /// True while the snapshot holds only the built-in seed table.
    pub fn is_using_defaults(&self) -> bool {
        self.last_synced_at().is_some_and(defaults::is_seed_timestamp)
    }

    pub fn state(&self) -> SyncState {
        self.sync.state()
    }

    /// Observe synchronizer state.
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.sync.subscribe()
    }

    pub fn base_currency(&self) -> &CurrencyCode {
        self.sync.base()
    }

    pub fn device_id(&self) -> DeviceId {
        self.batcher.device_id()
    }

    pub fn batcher(&self) -> &EventBatcher {
        &self.batcher
    }

    /// Record a telemetry event.
    pub fn track(&self, name: impl Into<String>, params: Option<EventParams>) {
        self.batcher.track(name, params);
    }

    /// Convert `amount` of `from` into `to` against the current snapshot.
    pub fn convert(&self, amount: f64, from: &CurrencyCode, to: &CurrencyCode) -> ClientResult<f64> {
        let from_rate = self
            .sync
            .rate(from)
            .ok_or_else(|| ClientError::RateUnavailable(from.clone()))?;
        let to_rate = self
            .sync
            .rate(to)
            .ok_or_else(|| ClientError::RateUnavailable(to.clone()))?;

        self.batcher.track_conversion(from, to, amount);
        Ok(convert(amount, &from_rate, &to_rate))
    }

    /// Copy of the current selection.
    pub fn selection(&self) -> UserCurrencySelection {
        self.display.selection.lock().clone()
    }

    /// Append a currency to the selection.
    pub async fn add_currency(&self, code: impl Into<CurrencyCode>) -> ClientResult<bool> {
        let code = code.into();
        let changed = self.update_selection(|s| s.add(code.clone())).await?;
        if changed {
            self.batcher.track_currency_added(&code);
        }
        Ok(changed)
    }

    /// Remove a currency. The base currency stays.
    pub async fn remove_currency(&self, code: &CurrencyCode) -> ClientResult<bool> {
        let changed = self.update_selection(|s| s.remove(code)).await?;
        if changed {
            self.batcher.track_currency_removed(code);
        }
        Ok(changed)
    }

    /// Reorder the selection.
    pub async fn move_currency(&self, from: usize, to: usize) -> ClientResult<bool> {
        let mut moved = None;
        let changed = self
            .update_selection(|s| {
                moved = s.entries().get(from).map(|e| e.code.clone());
                s.move_entry(from, to)
            })
            .await?;
        if let (true, Some(code)) = (changed, moved) {
            self.batcher.track_currency_moved(&code);
        }
        Ok(changed)
    }

    /// Show or hide a currency without removing it.
    pub async fn set_currency_enabled(&self, code: &CurrencyCode, enabled: bool) -> ClientResult<bool> {
        self.update_selection(|s| s.set_enabled(code, enabled)).await
    }

    async fn update_selection<F>(&self, mutate: F) -> ClientResult<bool>
    where
        F: FnOnce(&mut UserCurrencySelection) -> bool,
    {
        let _writes = self.selection_writes.lock().await;
        let updated = {
            let mut selection = self.display.selection.lock();
            if !mutate(&mut selection) {
                return Ok(false);
            }
            selection.clone()
        };

        self.settings.save_selection(&updated).await?;
        self.debouncer.call();
        Ok(true)
    }

    /// Set the amount typed into the converter.
    pub fn set_input(&self, code: impl Into<CurrencyCode>, amount: f64) {
        *self.display.input.lock() = ActiveInput::new(code, amount);
        self.debouncer.call();
    }

    /// Rows for the current selection, input and snapshot, computed now.
    pub fn display_rows(&self) -> Vec<DisplayRow> {
        self.display.project()
    }

    /// Observe debounced converter rows.
    pub fn subscribe_display(&self) -> watch::Receiver<Arc<[DisplayRow]>> {
        self.display.rows.subscribe()
    }

    /// The app came to the foreground.
    ///
    /// Runs a pending startup sync immediately, otherwise starts a new sync
    /// in the background.
    pub fn enter_foreground(&self) {
        if let Some(startup) = self.startup.lock().as_ref() {
            if !startup.is_finished() {
                debug!("Firing pending startup sync");
                startup.fire_now();
                return;
            }
        }

        self.trigger_sync();
    }

    /// The app moved to the background.
    pub async fn enter_background(&self) -> FlushOutcome {
        self.batcher.on_background().await
    }

    /// Stop background work and drain telemetry.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> FlushOutcome {
        if let Some(startup) = self.startup.lock().take() {
            startup.cancel();
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }

        let outcome = self.batcher.on_terminate().await;
        info!(?outcome, "Rate client stopped");
        outcome
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn telemetry_stats(&self) -> BatcherStats {
        self.batcher.stats()
    }

    /// Metrics in Prometheus text format.
    pub fn prometheus(&self) -> String {
        self.metrics.to_prometheus(&self.batcher.stats())
    }
}

async fn load_selection<S: SettingsStore + ?Sized>(
    store: &S,
    base: &CurrencyCode,
) -> ClientResult<UserCurrencySelection> {
    if let Some(selection) = store.load_selection(base).await? {
        return Ok(selection);
    }
    let selection = UserCurrencySelection::default_for(base.clone());
    store.save_selection(&selection).await?;
    Ok(selection)
}

async fn run_sync(sync: &RateSynchronizer, batcher: &EventBatcher) -> SyncOutcome {
    let outcome = sync.sync_remote().await;
    if let SyncOutcome::Failed(kind) = outcome {
        batcher.track_sync_failed(kind);
    }
    outcome
}
