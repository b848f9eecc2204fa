//! In-memory store for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use ratesync_common::{CurrencyCode, DeviceId, Rate, SelectionEntry, UserCurrencySelection};

use tokio::sync::watch;

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_rates, RateStore, SettingsStore};

/// Volatile store with switchable read and write failures.
pub struct MemoryStore {
    rates: Mutex<BTreeMap<CurrencyCode, Rate>>,
    selection: Mutex<Option<Vec<SelectionEntry>>>,
    device_id: Mutex<Option<DeviceId>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    upsert_calls: AtomicU64,
    commit_gate: watch::Sender<bool>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        let (commit_gate, _) = watch::channel(true);
        Self {
            rates: Mutex::new(BTreeMap::new()),
            selection: Mutex::new(None),
            device_id: Mutex::new(None),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            upsert_calls: AtomicU64::new(0),
            commit_gate,
        }
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `rates`.
    pub fn with_rates(rates: impl IntoIterator<Item = Rate>) -> Self {
        let store = Self::new();
        {
            let mut table = store.rates.lock();
            for rate in rates {
                table.insert(rate.code.clone(), rate);
            }
        }
        store
    }

    /// Make every read fail until reset.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Apply `upsert_rates` writes but keep the call from returning until
    /// [`release_commits`](Self::release_commits).
    pub fn hold_commits(&self) {
        self.commit_gate.send_replace(false);
    }

    pub fn release_commits(&self) {
        self.commit_gate.send_replace(true);
    }

    /// Number of `upsert_rates` calls, including failed ones.
    pub fn upsert_calls(&self) -> u64 {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    /// Current rows, sorted by code.
    pub fn snapshot(&self) -> Vec<Rate> {
        self.rates.lock().values().cloned().collect()
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn load_rates(&self) -> StoreResult<Vec<Rate>> {
        self.check_read()?;
        Ok(self.snapshot())
    }

    async fn upsert_rates(&self, rates: &[Rate]) -> StoreResult<usize> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.check_write()?;
        validate_rates(rates)?;

        {
            let mut table = self.rates.lock();
            for rate in rates {
                table.insert(rate.code.clone(), rate.clone());
            }
        }

        let mut gate = self.commit_gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        Ok(rates.len())
    }

    async fn insert_missing_rates(&self, rates: &[Rate]) -> StoreResult<usize> {
        self.check_write()?;
        validate_rates(rates)?;

        let mut table = self.rates.lock();
        let mut inserted = 0;
        for rate in rates {
            if !table.contains_key(&rate.code) {
                table.insert(rate.code.clone(), rate.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn clear_rates(&self) -> StoreResult<u64> {
        self.check_write()?;
        let mut table = self.rates.lock();
        let removed = table.len() as u64;
        table.clear();
        Ok(removed)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn load_selection(&self, base: &CurrencyCode) -> StoreResult<Option<UserCurrencySelection>> {
        self.check_read()?;
        Ok(self
            .selection
            .lock()
            .clone()
            .map(|entries| UserCurrencySelection::from_entries(base.clone(), entries)))
    }

    async fn save_selection(&self, selection: &UserCurrencySelection) -> StoreResult<()> {
        self.check_write()?;
        *self.selection.lock() = Some(selection.entries().to_vec());
        Ok(())
    }

    async fn load_or_create_device_id(&self) -> StoreResult<DeviceId> {
        self.check_read()?;
        Ok(*self.device_id.lock().get_or_insert_with(DeviceId::generate))
    }
}
