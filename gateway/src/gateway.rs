//! The remote gateway trait.

use async_trait::async_trait;
use ratesync_common::TelemetryEvent;

use crate::error::GatewayResult;
use crate::wire::{CurrencyNames, RatesPayload};

/// Access to the remote pricing service.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Get the gateway name.
    fn name(&self) -> &str;

    /// Fetch the latest rate snapshot.
    async fn fetch_rates(&self) -> GatewayResult<RatesPayload>;

    /// Fetch display names for the known currencies.
    async fn fetch_currency_names(&self) -> GatewayResult<CurrencyNames>;

    /// Submit one batch of telemetry events. Any non-2xx answer is an error.
    async fn submit_events(&self, events: &[TelemetryEvent]) -> GatewayResult<()>;
}
