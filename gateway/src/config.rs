//! Gateway configuration.

use std::time::Duration;

use ratesync_common::time::constants;

/// Default service root.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Connection settings for [`HttpGateway`](crate::HttpGateway).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Service root, e.g. `https://rates.example.com/api/v1`.
    pub base_url: String,
    /// Timeout for establishing a connection.
    pub request_timeout: Duration,
    /// Total time allowed for one request, including the body.
    pub resource_timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: constants::REQUEST_TIMEOUT,
            resource_timeout: constants::RESOURCE_TIMEOUT,
            user_agent: concat!("ratesync/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl GatewayConfig {
    /// Create a config for `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(format!("base_url must be an http(s) URL, got {:?}", self.base_url));
        }
        if self.request_timeout.is_zero() || self.resource_timeout.is_zero() {
            return Err("timeouts must be non-zero".to_string());
        }
        if self.resource_timeout < self.request_timeout {
            return Err("resource_timeout must be >= request_timeout".to_string());
        }
        Ok(())
    }

    /// Absolute URL for an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(GatewayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(GatewayConfig::new("ftp://host").validate().is_err());

        let mut config = GatewayConfig::default();
        config.resource_timeout = Duration::from_secs(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_joins_slashes() {
        let config = GatewayConfig::new("http://host/api/v1/");
        assert_eq!(config.endpoint("/rates"), "http://host/api/v1/rates");
        assert_eq!(config.endpoint("stats"), "http://host/api/v1/stats");
    }
}
