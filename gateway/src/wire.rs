//! JSON payloads exchanged with the pricing service.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use ratesync_common::{CurrencyCode, TelemetryEvent, Timestamp};
use serde::{Deserialize, Deserializer, Serialize};

/// Naive formats the service emits, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Response of `GET /rates`.
///
/// `rates` maps each code to how many units of it one base unit buys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatesPayload {
    #[serde(alias = "updatedAt", deserialize_with = "deserialize_timestamp")]
    pub updated_at: Timestamp,
    #[serde(default = "default_base")]
    pub base: CurrencyCode,
    pub rates: BTreeMap<CurrencyCode, f64>,
}

impl RatesPayload {
    pub fn new(
        updated_at: Timestamp,
        base: CurrencyCode,
        rates: impl IntoIterator<Item = (CurrencyCode, f64)>,
    ) -> Self {
        Self {
            updated_at,
            base,
            rates: rates.into_iter().collect(),
        }
    }
}

/// Response of `GET /currency-names`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyNames {
    #[serde(
        default,
        alias = "updatedAt",
        deserialize_with = "deserialize_optional_timestamp"
    )]
    pub updated_at: Option<Timestamp>,
    pub names: BTreeMap<CurrencyCode, String>,
}

impl CurrencyNames {
    pub fn get(&self, code: &CurrencyCode) -> Option<&str> {
        self.names.get(code).map(String::as_str).filter(|n| !n.trim().is_empty())
    }
}

/// Body of `POST /stats`.
#[derive(Debug, Serialize)]
pub struct StatsBatch<'a> {
    pub events: &'a [TelemetryEvent],
}

fn default_base() -> CurrencyCode {
    CurrencyCode::rub()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Epoch(i64),
}

/// Parse an RFC 3339 timestamp, or a naive ISO-8601 one as UTC.
pub fn parse_timestamp(s: &str) -> Option<Timestamp> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn raw_to_timestamp<E: serde::de::Error>(raw: RawTimestamp) -> Result<Timestamp, E> {
    match raw {
        RawTimestamp::Text(s) => {
            parse_timestamp(&s).ok_or_else(|| E::custom(format!("unrecognised timestamp {s:?}")))
        }
        RawTimestamp::Epoch(secs) => Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| E::custom(format!("timestamp out of range: {secs}"))),
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Timestamp, D::Error>
where
    D: Deserializer<'de>,
{
    raw_to_timestamp(RawTimestamp::deserialize(deserializer)?)
}

fn deserialize_optional_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawTimestamp>::deserialize(deserializer)?
        .map(raw_to_timestamp)
        .transpose()
}
