//! The persisted exchange-rate record.

use serde::{Deserialize, Serialize};

use crate::{CurrencyCode, Timestamp};

/// Value of one unit of `code` expressed in the base currency.
///
/// The base currency itself is stored with `units_per_base == 1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// Currency code, unique within the store.
    pub code: CurrencyCode,
    /// Human-readable name shown next to the code.
    pub display_name: String,
    /// How many base units one unit of `code` is worth.
    pub units_per_base: f64,
    /// Snapshot time of the fetch (or seed) that produced this row.
    pub updated_at: Timestamp,
}

impl Rate {
    /// Create a new rate record.
    pub fn new(
        code: impl Into<CurrencyCode>,
        display_name: impl Into<String>,
        units_per_base: f64,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            code: code.into(),
            display_name: display_name.into(),
            units_per_base,
            updated_at,
        }
    }

    /// Create the record for the base currency itself.
    pub fn base(code: impl Into<CurrencyCode>, display_name: impl Into<String>, updated_at: Timestamp) -> Self {
        Self::new(code, display_name, 1.0, updated_at)
    }

    /// Check that the value can take part in conversion math.
    pub fn is_valid(&self) -> bool {
        is_valid_units(self.units_per_base)
    }
}

/// `true` when `units` is finite and strictly positive.
pub fn is_valid_units(units: f64) -> bool {
    units.is_finite() && units > 0.0
}

/// Most recent `updated_at` among `rates`.
///
/// Rows written by different fetches may carry different timestamps, so the
/// snapshot time is the maximum rather than whichever row sorts first.
pub fn latest_update(rates: &[Rate]) -> Option<Timestamp> {
    rates.iter().map(|r| r.updated_at).max()
}

/// Find a rate by code.
pub fn find_rate<'a>(rates: &'a [Rate], code: &CurrencyCode) -> Option<&'a Rate> {
    rates.iter().find(|r| &r.code == code)
}
