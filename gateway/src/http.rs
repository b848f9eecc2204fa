//! reqwest-backed gateway.

use async_trait::async_trait;
use ratesync_common::TelemetryEvent;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::gateway::RemoteGateway;
use crate::wire::{CurrencyNames, RatesPayload, StatsBatch};

/// Gateway talking JSON over HTTP.
///
/// Clone is cheap; the underlying client shares its connection pool.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpGateway {
    /// Create a new gateway.
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.request_timeout)
            .timeout(config.resource_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Turn a non-success response into an error, keeping the body.
    async fn check_response(response: reqwest::Response) -> GatewayResult<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(GatewayError::from_status(status.as_u16(), &body))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let url = self.config.endpoint(path);
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| log_failure(&url, e.into()))?;

        let response = Self::check_response(response)
            .await
            .map_err(|e| log_failure(&url, e))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| log_failure(&url, e.into()))?;

        serde_json::from_slice(&bytes).map_err(|e| log_failure(&url, e.into()))
    }
}

fn log_failure(url: &str, err: GatewayError) -> GatewayError {
    warn!(url = %url, kind = %err.kind(), error = %err, "Gateway request failed");
    err
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_rates(&self) -> GatewayResult<RatesPayload> {
        self.get("rates").await
    }

    async fn fetch_currency_names(&self) -> GatewayResult<CurrencyNames> {
        self.get("currency-names").await
    }

    async fn submit_events(&self, events: &[TelemetryEvent]) -> GatewayResult<()> {
        let url = self.config.endpoint("stats");
        debug!(url = %url, count = events.len(), "POST");

        let response = self
            .client
            .post(&url)
            .json(&StatsBatch { events })
            .send()
            .await
            .map_err(|e| log_failure(&url, e.into()))?;

        Self::check_response(response)
            .await
            .map_err(|e| log_failure(&url, e))?;
        Ok(())
    }
}
