//! Scriptable gateway for tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use ratesync_common::{CurrencyCode, TelemetryEvent};
use tokio::sync::watch;

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::RemoteGateway;
use crate::wire::{CurrencyNames, RatesPayload};

/// Mock gateway with call counters, failure injection and a hold gate.
pub struct MockGateway {
    name: String,
    rates: Mutex<Option<RatesPayload>>,
    names: Mutex<CurrencyNames>,
    rates_failure: Mutex<Option<GatewayError>>,
    names_failure: Mutex<Option<GatewayError>>,
    submit_failure: Mutex<Option<GatewayError>>,
    rates_delay: Mutex<Option<Duration>>,
    gate: watch::Sender<bool>,
    rate_calls: AtomicU64,
    name_calls: AtomicU64,
    submit_calls: AtomicU64,
    submitted: Mutex<Vec<Vec<TelemetryEvent>>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new("mock")
    }
}

impl MockGateway {
    /// Create a new mock gateway. With no payload set, `fetch_rates` fails.
    pub fn new(name: impl Into<String>) -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            name: name.into(),
            rates: Mutex::new(None),
            names: Mutex::new(CurrencyNames::default()),
            rates_failure: Mutex::new(None),
            names_failure: Mutex::new(None),
            submit_failure: Mutex::new(None),
            rates_delay: Mutex::new(None),
            gate,
            rate_calls: AtomicU64::new(0),
            name_calls: AtomicU64::new(0),
            submit_calls: AtomicU64::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Set the payload returned by `fetch_rates`.
    pub fn set_rates(&self, payload: RatesPayload) {
        *self.rates.lock() = Some(payload);
    }

    /// Set a display name returned by `fetch_currency_names`.
    pub fn set_name(&self, code: impl Into<CurrencyCode>, name: impl Into<String>) {
        self.names.lock().names.insert(code.into(), name.into());
    }

    /// Make `fetch_rates` fail with `err` (or succeed again with `None`).
    pub fn fail_rates(&self, err: Option<GatewayError>) {
        *self.rates_failure.lock() = err;
    }

    pub fn fail_names(&self, err: Option<GatewayError>) {
        *self.names_failure.lock() = err;
    }

    pub fn fail_submit(&self, err: Option<GatewayError>) {
        *self.submit_failure.lock() = err;
    }

    /// Delay every `fetch_rates` answer.
    pub fn set_rates_delay(&self, delay: Option<Duration>) {
        *self.rates_delay.lock() = delay;
    }

    /// Park every `fetch_rates` and `submit_events` call until
    /// [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Let parked and future calls proceed.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn rate_calls(&self) -> u64 {
        self.rate_calls.load(Ordering::SeqCst)
    }

    pub fn name_calls(&self) -> u64 {
        self.name_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> u64 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Batches accepted by `submit_events`, in order.
    pub fn submitted(&self) -> Vec<Vec<TelemetryEvent>> {
        self.submitted.lock().clone()
    }

    async fn wait_for_gate(&self) {
        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
    }

    /// All accepted events flattened in submission order.
    pub fn submitted_events(&self) -> Vec<TelemetryEvent> {
        self.submitted.lock().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rates(&self) -> GatewayResult<RatesPayload> {
        self.rate_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;

        let delay = *self.rates_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.rates_failure.lock().clone() {
            return Err(err);
        }
        self.rates
            .lock()
            .clone()
            .ok_or_else(|| GatewayError::Transport("no rates scripted".to_string()))
    }

    async fn fetch_currency_names(&self) -> GatewayResult<CurrencyNames> {
        self.name_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.names_failure.lock().clone() {
            return Err(err);
        }
        Ok(self.names.lock().clone())
    }

    async fn submit_events(&self, events: &[TelemetryEvent]) -> GatewayResult<()> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_for_gate().await;
        if let Some(err) = self.submit_failure.lock().clone() {
            return Err(err);
        }
        self.submitted.lock().push(events.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_scripted_rates_and_failure() {
        let mock = MockGateway::default();
        assert!(mock.fetch_rates().await.is_err());

        mock.set_rates(RatesPayload::new(
            Utc::now(),
            CurrencyCode::rub(),
            vec![(CurrencyCode::usd(), 0.011)],
        ));
        assert_eq!(mock.fetch_rates().await.unwrap().rates.len(), 1);

        mock.fail_rates(Some(GatewayError::Timeout));
        assert_eq!(mock.fetch_rates().await.unwrap_err(), GatewayError::Timeout);
        assert_eq!(mock.rate_calls(), 3);
    }

    #[tokio::test]
    async fn test_hold_parks_fetch_until_release() {
        let mock = Arc::new(MockGateway::default());
        mock.set_rates(RatesPayload::new(Utc::now(), CurrencyCode::rub(), vec![]));
        mock.hold();

        let task = {
            let mock = Arc::clone(&mock);
            tokio::spawn(async move { mock.fetch_rates().await })
        };

        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        mock.release();
        assert!(task.await.unwrap().is_ok());
    }
}
