//! Built-in rate table used to seed an empty store.

use ratesync_common::{CurrencyCode, Rate, Timestamp};

/// RUB per unit, as shipped with the app.
const DEFAULT_TABLE: &[(&str, &str, f64)] = &[
    ("RUB", "Russian Ruble", 1.0),
    ("USD", "US Dollar", 90.91),
    ("EUR", "Euro", 100.00),
    ("GBP", "British Pound", 114.94),
    ("CNY", "Chinese Yuan", 12.50),
    ("JPY", "Japanese Yen", 0.58),
    ("CHF", "Swiss Franc", 102.04),
    ("CAD", "Canadian Dollar", 66.67),
    ("AUD", "Australian Dollar", 58.82),
    ("TRY", "Turkish Lira", 2.86),
];

/// Seeded rows carry a fixed, obviously old timestamp so any real sync is
/// newer and the UI can tell defaults from fetched data.
pub fn seed_timestamp() -> Timestamp {
    Timestamp::default()
}

/// Whether `at` is the seed stamp rather than a remote snapshot time.
pub fn is_seed_timestamp(at: Timestamp) -> bool {
    at == seed_timestamp()
}

/// Built-in display name for a code.
pub fn display_name(code: &CurrencyCode) -> Option<&'static str> {
    DEFAULT_TABLE
        .iter()
        .find(|(c, _, _)| *c == code.as_str())
        .map(|(_, name, _)| *name)
}

/// Default rates expressed against `base`.
///
/// The table is quoted in RUB; for another base it is rebased through the
/// base's own entry. An unknown base yields just the base row.
pub fn default_rates(base: &CurrencyCode) -> Vec<Rate> {
    let at = seed_timestamp();
    let base_name = display_name(base).unwrap_or(base.as_str());

    let Some(base_units) = DEFAULT_TABLE
        .iter()
        .find(|(c, _, _)| *c == base.as_str())
        .map(|(_, _, v)| *v)
    else {
        return vec![Rate::base(base.clone(), base_name, at)];
    };

    DEFAULT_TABLE
        .iter()
        .map(|(code, name, rub_units)| {
            let code = CurrencyCode::new(*code);
            if &code == base {
                Rate::base(code, *name, at)
            } else {
                Rate::new(code, *name, rub_units / base_units, at)
            }
        })
        .collect()
}
