//! Client configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ratesync_common::time::constants;
use ratesync_common::CurrencyCode;
use ratesync_fx::NumberLocale;
use ratesync_gateway::GatewayConfig;
use ratesync_telemetry::BatcherConfig;

/// Synchronizer configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay between start and the first remote fetch.
    pub settle_delay: Duration,
    /// Upper bound on one whole fetch, names lookup included.
    pub fetch_timeout: Duration,
    /// Ask the service for display names during a sync.
    pub fetch_names: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            settle_delay: constants::STARTUP_SETTLE_DELAY,
            fetch_timeout: constants::RESOURCE_TIMEOUT,
            fetch_names: true,
        }
    }
}

/// Main client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Currency every rate is quoted against.
    pub base_currency: CurrencyCode,
    /// Number formatting for display rows.
    pub locale: NumberLocale,
    /// Display recomputation coalescing window.
    pub debounce_window: Duration,
    /// Remote gateway configuration.
    pub gateway: GatewayConfig,
    /// Synchronizer configuration.
    pub sync: SyncConfig,
    /// Telemetry configuration.
    pub batcher: BatcherConfig,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            base_currency: CurrencyCode::rub(),
            locale: NumberLocale::default(),
            debounce_window: constants::DEBOUNCE_WINDOW,
            gateway: GatewayConfig::default(),
            sync: SyncConfig::default(),
            batcher: BatcherConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

/// `<data dir>/ratesync/rates.db`, or the working directory without one.
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ratesync")
        .join("rates.db")
}

fn env_millis(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
}

impl ClientConfig {
    /// Load configuration from `RATESYNC_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("RATESYNC_BASE_URL") {
            config.gateway.base_url = url;
        }

        if let Ok(path) = std::env::var("RATESYNC_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Ok(code) = std::env::var("RATESYNC_BASE_CURRENCY") {
            config.base_currency = CurrencyCode::new(code);
        }

        if let Ok(locale) = std::env::var("RATESYNC_LOCALE") {
            if let Ok(locale) = NumberLocale::from_str(&locale) {
                config.locale = locale;
            }
        }

        if let Some(delay) = env_millis("RATESYNC_SETTLE_DELAY_MS") {
            config.sync.settle_delay = delay;
        }

        if let Some(timeout) = env_millis("RATESYNC_REQUEST_TIMEOUT_MS") {
            config.gateway.request_timeout = timeout;
        }

        if let Some(timeout) = env_millis("RATESYNC_RESOURCE_TIMEOUT_MS") {
            config.gateway.resource_timeout = timeout;
            config.sync.fetch_timeout = timeout;
        }

        if let Ok(size) = std::env::var("RATESYNC_BATCH_SIZE") {
            if let Ok(size) = size.parse() {
                config.batcher.batch_size = size;
            }
        }

        if let Ok(level) = std::env::var("RATESYNC_LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.base_currency.is_valid() {
            return Err(format!("Invalid base currency: {}", self.base_currency));
        }

        if self.database_path.as_os_str().is_empty() {
            return Err("Database path cannot be empty".to_string());
        }

        if self.sync.fetch_timeout.is_zero() {
            return Err("Fetch timeout cannot be zero".to_string());
        }

        self.gateway.validate()?;
        self.batcher.validate()?;

        Ok(())
    }
}
