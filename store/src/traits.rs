//! Storage traits consumed by the synchronizer and the client.

use async_trait::async_trait;
use ratesync_common::{CurrencyCode, DeviceId, Rate, UserCurrencySelection};

use crate::error::StoreResult;

/// Durable rate table keyed by currency code.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Load every rate, sorted by code.
    async fn load_rates(&self) -> StoreResult<Vec<Rate>>;

    /// Insert or replace rates by code in one transaction.
    ///
    /// Either every row is written or none is. Returns the number of rows
    /// written.
    async fn upsert_rates(&self, rates: &[Rate]) -> StoreResult<usize>;

    /// Insert only the rates whose code is not present yet.
    ///
    /// Returns the number of rows inserted.
    async fn insert_missing_rates(&self, rates: &[Rate]) -> StoreResult<usize>;

    /// Delete every rate. Returns the number of rows removed.
    async fn clear_rates(&self) -> StoreResult<u64>;
}

/// Per-installation settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the persisted selection, normalised against `base`.
    ///
    /// Returns `None` when nothing has been saved yet.
    async fn load_selection(&self, base: &CurrencyCode) -> StoreResult<Option<UserCurrencySelection>>;

    /// Replace the persisted selection.
    async fn save_selection(&self, selection: &UserCurrencySelection) -> StoreResult<()>;

    /// Return the installation's device ID, creating it on first use.
    async fn load_or_create_device_id(&self) -> StoreResult<DeviceId>;
}

/// Reject rates that cannot take part in conversion math.
pub(crate) fn validate_rates(rates: &[Rate]) -> StoreResult<()> {
    for rate in rates {
        if !rate.is_valid() {
            return Err(crate::StoreError::InvalidRate {
                code: rate.code.clone(),
                value: rate.units_per_base,
            });
        }
    }
    Ok(())
}
