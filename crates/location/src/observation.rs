//! Location observation type

use fmdn_core::UnixSeconds;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One sighting of a tracked device.
///
/// Numeric fields are read leniently: JSON numbers and numeric strings are
/// accepted, anything else becomes `NaN` so the selector can rank the
/// observation last instead of rejecting the whole batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationObservation {
    /// Seconds since the Unix epoch
    #[serde(default = "missing_number", deserialize_with = "lenient_number")]
    pub timestamp: UnixSeconds,
    /// Latitude in degrees
    #[serde(deserialize_with = "lenient_number")]
    pub latitude: f64,
    /// Longitude in degrees
    #[serde(deserialize_with = "lenient_number")]
    pub longitude: f64,
    /// Horizontal accuracy radius in meters
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub accuracy: Option<f64>,
    /// Altitude in meters
    #[serde(default, deserialize_with = "lenient_optional_number")]
    pub altitude: Option<f64>,
    /// Reported by the owner's own device rather than relayed by the network
    #[serde(default)]
    pub is_own_report: bool,
    /// Human place label, e.g. "Home"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_name: Option<String>,
    /// Opaque status string from the source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl LocationObservation {
    /// Create an observation with no accuracy, altitude or label.
    pub fn new(latitude: f64, longitude: f64, timestamp: UnixSeconds) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            accuracy: None,
            altitude: None,
            is_own_report: false,
            semantic_name: None,
            state: None,
        }
    }

    /// Set the accuracy radius in meters.
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Set the altitude in meters.
    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// Mark as reported by the owner's own device.
    pub fn with_own_report(mut self, is_own_report: bool) -> Self {
        self.is_own_report = is_own_report;
        self
    }

    /// Attach a named place.
    pub fn with_semantic_name(mut self, name: impl Into<String>) -> Self {
        self.semantic_name = Some(name.into());
        self
    }

    /// Attach the source status string.
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// A non-empty place label, if any.
    pub fn place_name(&self) -> Option<&str> {
        self.semantic_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Seconds between the observation and `now`; negative for future timestamps.
    pub fn age_secs(&self, now: UnixSeconds) -> f64 {
        now - self.timestamp
    }
}

/// Read a JSON value as a number: numbers as-is, numeric strings parsed,
/// anything else `NaN`.
pub(crate) fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Like [`coerce_number`], with `null` meaning absent.
pub(crate) fn coerce_optional_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => None,
        other => Some(coerce_number(other)),
    }
}

pub(crate) fn missing_number() -> f64 {
    f64::NAN
}

pub(crate) fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(coerce_number(&Value::deserialize(deserializer)?))
}

fn lenient_optional_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    Ok(coerce_optional_number(&Value::deserialize(deserializer)?))
}
