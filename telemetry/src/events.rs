//! Predefined client events.

use ratesync_common::{CurrencyCode, EventParams, ParamValue, SyncErrorKind};

use crate::batcher::EventBatcher;

/// Event names understood by the stats backend.
pub mod names {
    pub const APP_OPEN: &str = "app_open";
    pub const CONVERSION: &str = "conversion";
    pub const CURRENCY_ADDED: &str = "currency_added";
    pub const CURRENCY_REMOVED: &str = "currency_removed";
    pub const CURRENCY_MOVED: &str = "currency_moved";
    pub const SETTINGS_OPENED: &str = "settings_opened";
    pub const THEME_CHANGED: &str = "theme_changed";
    pub const PREMIUM_VIEWED: &str = "premium_viewed";
    pub const SYNC_FAILED: &str = "sync_failed";
}

fn params<const N: usize>(pairs: [(&str, ParamValue); N]) -> Option<EventParams> {
    Some(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

impl EventBatcher {
    pub fn track_app_open(&self) {
        self.track(names::APP_OPEN, None);
    }

    pub fn track_conversion(&self, from: &CurrencyCode, to: &CurrencyCode, amount: f64) {
        self.track(
            names::CONVERSION,
            params([
                ("from", from.as_str().into()),
                ("to", to.as_str().into()),
                ("amount", amount.into()),
            ]),
        );
    }

    pub fn track_currency_added(&self, code: &CurrencyCode) {
        self.track(names::CURRENCY_ADDED, params([("currency", code.as_str().into())]));
    }

    pub fn track_currency_removed(&self, code: &CurrencyCode) {
        self.track(names::CURRENCY_REMOVED, params([("currency", code.as_str().into())]));
    }

    pub fn track_currency_moved(&self, code: &CurrencyCode) {
        self.track(names::CURRENCY_MOVED, params([("currency", code.as_str().into())]));
    }

    pub fn track_settings_opened(&self) {
        self.track(names::SETTINGS_OPENED, None);
    }

    pub fn track_theme_changed(&self, is_dark: bool) {
        self.track(names::THEME_CHANGED, params([("is_dark", is_dark.into())]));
    }

    pub fn track_premium_viewed(&self) {
        self.track(names::PREMIUM_VIEWED, None);
    }

    /// Record a classified sync failure.
    pub fn track_sync_failed(&self, kind: SyncErrorKind) {
        self.track(names::SYNC_FAILED, params([("kind", kind.error_code().into())]));
    }
}
