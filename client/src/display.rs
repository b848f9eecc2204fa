//! Converter rows derived from the selection and the rate snapshot.

use ratesync_common::{find_rate, CurrencyCode, Rate, UserCurrencySelection};
use ratesync_fx::{convert, cross_rate, format_amount, format_rate, NumberLocale};
use serde::Serialize;

/// The amount the user typed and the currency it was typed in.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveInput {
    pub code: CurrencyCode,
    pub amount: f64,
}

impl ActiveInput {
    pub fn new(code: impl Into<CurrencyCode>, amount: f64) -> Self {
        Self {
            code: code.into(),
            amount,
        }
    }
}

/// One converter row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRow {
    pub code: CurrencyCode,
    pub name: String,
    pub amount: f64,
    pub formatted: String,
    /// Units of this currency per one unit of the active currency.
    pub formatted_rate: String,
    pub is_active: bool,
}

/// Project enabled selection entries onto the snapshot.
///
/// Codes without a loaded rate are left out. If the active currency itself
/// has no rate, every other row converts from zero.
pub fn project_rows(
    selection: &UserCurrencySelection,
    rates: &[Rate],
    input: &ActiveInput,
    locale: NumberLocale,
) -> Vec<DisplayRow> {
    let active = find_rate(rates, &input.code);

    selection
        .enabled_codes()
        .into_iter()
        .filter_map(|code| {
            let rate = find_rate(rates, &code)?;
            let is_active = code == input.code;
            let (amount, unit_rate) = match active {
                _ if is_active => (input.amount, 1.0),
                Some(active) => (convert(input.amount, active, rate), cross_rate(active, rate)),
                None => (0.0, 0.0),
            };

            Some(DisplayRow {
                formatted: format_amount(amount, &code, locale),
                formatted_rate: format_rate(unit_rate, locale),
                name: rate.display_name.clone(),
                code,
                amount,
                is_active,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ratesync_common::SelectionEntry;

    fn rates() -> Vec<Rate> {
        let at = Utc::now();
        vec![
            Rate::new("EUR", "Euro", 100.0, at),
            Rate::new("GBP", "British Pound", 115.0, at),
            Rate::base("RUB", "Russian Ruble", at),
            Rate::new("USD", "US Dollar", 90.0, at),
        ]
    }

    #[test]
    fn test_rows_follow_selection_order() {
        let selection = UserCurrencySelection::default_for(CurrencyCode::rub());
        let rows = project_rows(&selection, &rates(), &ActiveInput::new("USD", 10.0), NumberLocale::En);

        let codes: Vec<_> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["RUB", "USD", "EUR", "GBP"]);

        assert_eq!(rows[0].amount, 900.0);
        assert_eq!(rows[0].formatted, "900");
        assert!(rows[1].is_active);
        assert_eq!(rows[1].amount, 10.0);
        assert_eq!(rows[2].formatted, "9");
        assert_eq!(rows[2].formatted_rate, "0.90");
    }

    #[test]
    fn test_disabled_and_unloaded_codes_are_skipped() {
        let selection = UserCurrencySelection::from_entries(
            CurrencyCode::rub(),
            vec![
                SelectionEntry::enabled("RUB"),
                SelectionEntry {
                    code: CurrencyCode::usd(),
                    is_enabled: false,
                },
                SelectionEntry::enabled("CHF"),
                SelectionEntry::enabled("EUR"),
            ],
        );
        let rows = project_rows(&selection, &rates(), &ActiveInput::new("RUB", 1000.0), NumberLocale::Ru);

        let codes: Vec<_> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["RUB", "EUR"]);
        assert_eq!(rows[0].formatted, "1\u{202F}000");
        assert_eq!(rows[1].formatted, "10");
    }

    #[test]
    fn test_missing_active_rate_yields_zero_rows() {
        let selection = UserCurrencySelection::default_for(CurrencyCode::rub());
        let rows = project_rows(&selection, &rates(), &ActiveInput::new("CHF", 5.0), NumberLocale::En);

        assert!(rows.iter().all(|r| !r.is_active));
        assert!(rows.iter().all(|r| r.amount == 0.0));
    }
}
