//! Telemetry event types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::DeviceId;

/// Scalar value attached to an event parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Text(v)
    }
}

/// Event parameters, ordered by key for stable serialization.
pub type EventParams = BTreeMap<String, ParamValue>;

/// A single client event as submitted to the stats endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    /// Event name, e.g. `app_open`.
    pub name: String,
    /// Installation that produced the event.
    pub device_id: DeviceId,
    /// Seconds since the Unix epoch when the event was tracked.
    #[serde(rename = "ts")]
    pub timestamp: i64,
    /// Optional scalar parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<EventParams>,
}

impl TelemetryEvent {
    /// Create a new event.
    pub fn new(
        name: impl Into<String>,
        device_id: DeviceId,
        timestamp: i64,
        params: Option<EventParams>,
    ) -> Self {
        Self {
            name: name.into(),
            device_id,
            timestamp,
            params,
        }
    }

    /// Look up a parameter by key.
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.as_ref().and_then(|p| p.get(key))
    }
}
