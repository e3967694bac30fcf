//! Conversion of historical state rows into location observations.
//!
//! A history store returns rows of `{state, last_changed, attributes}`.
//! Rows whose state is a sentinel (`unknown`, `unavailable`, absent) or
//! whose attributes lack a numeric latitude/longitude are dropped here, so
//! the selector only ever sees usable observations.

use fmdn_core::UnixSeconds;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::observation::{
    coerce_number, coerce_optional_number, lenient_number, missing_number, LocationObservation,
};

/// States that carry no location.
pub const UNAVAILABLE_STATES: [&str; 2] = ["unknown", "unavailable"];

/// One historical state row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Entity state string
    #[serde(default)]
    pub state: Option<String>,
    /// When the state last changed, seconds since the Unix epoch
    #[serde(default = "missing_number", deserialize_with = "lenient_number")]
    pub last_changed: UnixSeconds,
    /// State attributes
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl HistoryRecord {
    fn number(&self, name: &str) -> Option<f64> {
        self.attributes
            .get(name)
            .map(coerce_number)
            .filter(|v| v.is_finite())
    }

    fn accuracy(&self) -> Option<f64> {
        // gps_accuracy wins whenever present, even when null.
        match self.attributes.get("gps_accuracy") {
            Some(value) => coerce_optional_number(value),
            None => self.attributes.get("accuracy").and_then(coerce_optional_number),
        }
    }

    fn text(&self, name: &str) -> Option<String> {
        self.attributes
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Observation for this row, if it carries a usable location.
    pub fn to_observation(&self) -> Option<LocationObservation> {
        if !is_usable_record(self) {
            return None;
        }
        let latitude = self.number("latitude")?;
        let longitude = self.number("longitude")?;

        Some(LocationObservation {
            timestamp: self.last_changed,
            latitude,
            longitude,
            accuracy: self.accuracy(),
            altitude: self.attributes.get("altitude").and_then(coerce_optional_number),
            is_own_report: self
                .attributes
                .get("is_own_report")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            semantic_name: self.text("semantic_name"),
            state: self.state.clone(),
        })
    }
}

/// Whether the row's state can carry a location at all.
pub fn is_usable_record(record: &HistoryRecord) -> bool {
    match record.state.as_deref() {
        None => false,
        Some(state) => !UNAVAILABLE_STATES.contains(&state),
    }
}

/// Usable observations from history rows, newest first.
///
/// Sorting is stable; rows without a readable timestamp sort last.
pub fn observations_from_history(records: &[HistoryRecord]) -> Vec<LocationObservation> {
    let mut observations: Vec<LocationObservation> =
        records.iter().filter_map(HistoryRecord::to_observation).collect();

    let sort_key = |o: &LocationObservation| {
        if o.timestamp.is_nan() {
            f64::NEG_INFINITY
        } else {
            o.timestamp
        }
    };
    observations.sort_by(|a, b| sort_key(b).total_cmp(&sort_key(a)));

    debug!(
        records = records.len(),
        usable = observations.len(),
        "Converted location history"
    );
    observations
}

/// Like [`observations_from_history`], limited to the last `window_hours`
/// before `now`.
pub fn observations_in_window(
    records: &[HistoryRecord],
    now: UnixSeconds,
    window_hours: u32,
) -> Vec<LocationObservation> {
    let start = now - f64::from(window_hours) * 3600.0;
    let mut observations = observations_from_history(records);
    observations.retain(|o| !(o.timestamp < start));
    observations
}
