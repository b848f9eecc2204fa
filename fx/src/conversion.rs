//! Cross-rate conversion through the base currency.
//!
//! Every rate is stored as "base units per one unit of the currency", so a
//! conversion from A to B is `amount * A / B`. Invalid rates never panic and
//! never produce NaN: the result is `0.0` instead.

use ratesync_common::{is_valid_units, Rate};

/// Convert `amount` of `from` into `to`.
///
/// Returns `0.0` when either rate is not finite or not strictly positive.
pub fn convert(amount: f64, from: &Rate, to: &Rate) -> f64 {
    convert_units(amount, from.units_per_base, to.units_per_base)
}

/// Convert using raw `units_per_base` values.
pub fn convert_units(amount: f64, from_units: f64, to_units: f64) -> f64 {
    if !is_valid_units(from_units) || !is_valid_units(to_units) || !amount.is_finite() {
        return 0.0;
    }
    amount * from_units / to_units
}

/// Units of `to` obtained for one unit of `from`.
pub fn cross_rate(from: &Rate, to: &Rate) -> f64 {
    convert(1.0, from, to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn rate(code: &str, units: f64) -> Rate {
        Rate::new(code, code, units, Utc::now())
    }

    #[test]
    fn test_convert_through_base() {
        let rub = rate("RUB", 1.0);
        let usd = rate("USD", 90.0);
        let eur = rate("EUR", 99.0);

        assert_eq!(convert(10.0, &usd, &rub), 900.0);
        assert_eq!(convert(900.0, &rub, &usd), 10.0);
        assert!((convert(100.0, &usd, &eur) - 90.909_090_909).abs() < 1e-6);
    }

    #[test]
    fn test_base_identity() {
        let rub = rate("RUB", 1.0);
        assert_eq!(convert(123.45, &rub, &rub), 123.45);
    }

    #[test]
    fn test_invalid_rates_yield_zero() {
        let good = rate("USD", 90.0);
        assert_eq!(convert(10.0, &rate("XXX", 0.0), &good), 0.0);
        assert_eq!(convert(10.0, &good, &rate("XXX", -2.0)), 0.0);
        assert_eq!(convert(10.0, &good, &rate("XXX", f64::NAN)), 0.0);
        assert_eq!(convert(10.0, &rate("XXX", f64::INFINITY), &good), 0.0);
        assert_eq!(convert(f64::NAN, &good, &good), 0.0);
    }

    #[test]
    fn test_cross_rate() {
        let usd = rate("USD", 90.0);
        let rub = rate("RUB", 1.0);
        assert_eq!(cross_rate(&usd, &rub), 90.0);
        assert!((cross_rate(&rub, &usd) - 1.0 / 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverted_remote_rate() {
        // The service quotes USD per RUB; the stored value is its inverse.
        let usd = rate("USD", 1.0 / 0.012518);
        let rub = rate("RUB", 1.0);
        assert!((convert(1.0, &usd, &rub) - 79.884_965_65).abs() < 1e-6);
    }

    proptest! {
        #[test]
        fn prop_round_trip_is_identity(
            amount in 0.0f64..1e9,
            a in 1e-4f64..1e6,
            b in 1e-4f64..1e6,
        ) {
            let ra = rate("AAA", a);
            let rb = rate("BBB", b);
            let back = convert(convert(amount, &ra, &rb), &rb, &ra);
            let tolerance = amount.abs().max(1.0) * 1e-9;
            prop_assert!((back - amount).abs() <= tolerance);
        }

        #[test]
        fn prop_convert_never_nan(
            amount in proptest::num::f64::ANY,
            a in proptest::num::f64::ANY,
            b in proptest::num::f64::ANY,
        ) {
            let result = convert_units(amount, a, b);
            prop_assert!(!result.is_nan());
        }
    }
}
