//! Display formatting for amounts and rates.

use std::fmt;
use std::str::FromStr;

use ratesync_common::CurrencyCode;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::FxError;

/// Amounts at or above this magnitude are shown without fraction digits.
const WHOLE_AMOUNT_THRESHOLD: f64 = 100.0;

const RATE_MIN_FRACTION_DIGITS: u32 = 2;
const RATE_MAX_FRACTION_DIGITS: u32 = 4;

/// Grouping and decimal separator conventions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberLocale {
    /// `1,234.56`
    #[default]
    En,
    /// `1 234,56` with a narrow no-break space.
    Ru,
}

impl NumberLocale {
    pub fn group_separator(&self) -> char {
        match self {
            NumberLocale::En => ',',
            NumberLocale::Ru => '\u{202F}',
        }
    }

    pub fn decimal_separator(&self) -> char {
        match self {
            NumberLocale::En => '.',
            NumberLocale::Ru => ',',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NumberLocale::En => "en",
            NumberLocale::Ru => "ru",
        }
    }
}

impl fmt::Display for NumberLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumberLocale {
    type Err = FxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept full locale tags such as `ru_RU` or `en-US`.
        let language = s
            .split(['_', '-'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match language.as_str() {
            "en" => Ok(NumberLocale::En),
            "ru" => Ok(NumberLocale::Ru),
            _ => Err(FxError::UnknownLocale(s.to_string())),
        }
    }
}

/// Format an amount of `code` for display.
///
/// Uses the currency's fraction digits, dropped entirely for magnitudes of
/// 100 and above; trailing fractional zeros are trimmed. Non-finite input
/// renders as `0`.
pub fn format_amount(value: f64, code: &CurrencyCode, locale: NumberLocale) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let max_digits = if value.abs() >= WHOLE_AMOUNT_THRESHOLD {
        0
    } else {
        code.fraction_digits()
    };
    render(value, 0, max_digits, locale)
}

/// Format a rate with two to four fraction digits.
pub fn format_rate(value: f64, locale: NumberLocale) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    render(value, RATE_MIN_FRACTION_DIGITS, RATE_MAX_FRACTION_DIGITS, locale)
}

fn render(value: f64, min_digits: u32, max_digits: u32, locale: NumberLocale) -> String {
    let fixed = fixed_point(value, max_digits);

    let (negative, unsigned) = match fixed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, fixed.as_str()),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));

    let mut frac = frac_part.trim_end_matches('0').to_string();
    while (frac.len() as u32) < min_digits {
        frac.push('0');
    }

    let is_zero = int_part.chars().all(|c| c == '0') && frac.chars().all(|c| c == '0');

    let mut out = String::with_capacity(unsigned.len() + 8);
    if negative && !is_zero {
        out.push('-');
    }
    out.push_str(&group_digits(int_part, locale.group_separator()));
    if !frac.is_empty() {
        out.push(locale.decimal_separator());
        out.push_str(&frac);
    }
    out
}

/// Round half away from zero and print without exponent.
fn fixed_point(value: f64, digits: u32) -> String {
    match Decimal::from_f64(value) {
        Some(d) => d
            .round_dp_with_strategy(digits, RoundingStrategy::MidpointAwayFromZero)
            .to_string(),
        // Outside Decimal's range; plain float formatting is exact enough here.
        None => format!("{:.*}", digits as usize, value),
    }
}

fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.chars().count();
    let mut out = String::with_capacity(len + len / 3 * separator.len_utf8());
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_en() {
        let usd = CurrencyCode::usd();
        assert_eq!(format_amount(12.5, &usd, NumberLocale::En), "12.5");
        assert_eq!(format_amount(12.345, &usd, NumberLocale::En), "12.35");
        assert_eq!(format_amount(1234567.89, &usd, NumberLocale::En), "1,234,568");
        assert_eq!(format_amount(99.999, &usd, NumberLocale::En), "100");
        assert_eq!(format_amount(0.0, &usd, NumberLocale::En), "0");
    }

    #[test]
    fn test_amount_ru() {
        let rub = CurrencyCode::rub();
        assert_eq!(format_amount(12.5, &rub, NumberLocale::Ru), "12,5");
        assert_eq!(format_amount(9091.0, &rub, NumberLocale::Ru), "9\u{202F}091");
    }

    #[test]
    fn test_amount_uses_currency_digits() {
        assert_eq!(format_amount(12.5, &CurrencyCode::new("JPY"), NumberLocale::En), "13");
        assert_eq!(format_amount(1.2345, &CurrencyCode::new("KWD"), NumberLocale::En), "1.235");
    }

    #[test]
    fn test_amount_non_finite() {
        let usd = CurrencyCode::usd();
        assert_eq!(format_amount(f64::NAN, &usd, NumberLocale::En), "0");
        assert_eq!(format_amount(f64::INFINITY, &usd, NumberLocale::En), "0");
    }

    #[test]
    fn test_negative_amounts() {
        let usd = CurrencyCode::usd();
        assert_eq!(format_amount(-1500.0, &usd, NumberLocale::En), "-1,500");
        assert_eq!(format_amount(-0.001, &usd, NumberLocale::En), "0");
    }

    #[test]
    fn test_rate_digits() {
        assert_eq!(format_rate(90.91, NumberLocale::En), "90.91");
        assert_eq!(format_rate(100.0, NumberLocale::En), "100.00");
        assert_eq!(format_rate(0.012518, NumberLocale::En), "0.0125");
        assert_eq!(format_rate(0.58, NumberLocale::Ru), "0,58");
        assert_eq!(format_rate(1234.56789, NumberLocale::En), "1,234.5679");
    }

    #[test]
    fn test_locale_parse() {
        assert_eq!("ru_RU".parse::<NumberLocale>().unwrap(), NumberLocale::Ru);
        assert_eq!("en-US".parse::<NumberLocale>().unwrap(), NumberLocale::En);
        assert!("de".parse::<NumberLocale>().is_err());
    }
}
