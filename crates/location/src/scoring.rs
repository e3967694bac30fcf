//! Location observation scoring
//!
//! This module scores an observation by:
//! - Accuracy radius in meters (named places without a radius count as 0)
//! - Age, one point per 3 minutes, plus a flat penalty past 2 hours
//! - Provenance, a small bonus for the owner's own reports
//!
//! Lower scores are better.

use fmdn_core::{LocationConfig, UnixSeconds};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::observation::LocationObservation;

/// Reasons an observation cannot be scored.
///
/// These never abort a selection; the observation is ranked last instead.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum ScoringError {
    /// Timestamp missing or not a number
    #[error("timestamp is not a finite number")]
    NonFiniteTimestamp,
    /// Accuracy present but not a finite number
    #[error("accuracy is not a finite number")]
    NonFiniteAccuracy,
}

/// Scoring constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Seconds of age per score point
    pub age_unit_secs: f64,
    /// Age after which `stale_penalty` applies
    pub stale_after_secs: f64,
    /// Flat penalty for stale observations
    pub stale_penalty: f64,
    /// Subtracted for the owner's own reports
    pub own_report_bonus: f64,
}

impl ScoringConfig {
    /// 3 minutes per point
    pub const DEFAULT_AGE_UNIT_SECS: f64 = 180.0;
    /// 2 hours
    pub const DEFAULT_STALE_AFTER_SECS: f64 = 7200.0;
    /// Default stale penalty
    pub const DEFAULT_STALE_PENALTY: f64 = 100.0;
    /// Default own-report bonus
    pub const DEFAULT_OWN_REPORT_BONUS: f64 = 2.0;
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            age_unit_secs: Self::DEFAULT_AGE_UNIT_SECS,
            stale_after_secs: Self::DEFAULT_STALE_AFTER_SECS,
            stale_penalty: Self::DEFAULT_STALE_PENALTY,
            own_report_bonus: Self::DEFAULT_OWN_REPORT_BONUS,
        }
    }
}

impl From<&LocationConfig> for ScoringConfig {
    fn from(config: &LocationConfig) -> Self {
        Self {
            age_unit_secs: config.age_unit_secs,
            stale_after_secs: config.stale_after_secs,
            stale_penalty: config.stale_penalty,
            own_report_bonus: config.own_report_bonus,
        }
    }
}

/// Location observation scorer
#[derive(Debug, Clone, Default)]
pub struct LocationScorer {
    config: ScoringConfig,
}

impl LocationScorer {
    /// Create a scorer with the default constants
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scorer with custom constants
    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Scoring constants in use
    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Compute the score of one observation
    ///
    /// # Arguments
    /// * `observation` - Observation to score
    /// * `now` - Current time in seconds since the Unix epoch
    ///
    /// # Returns
    /// Score, lower is better. `+inf` when neither an accuracy nor a place
    /// name is known.
    pub fn score(
        &self,
        observation: &LocationObservation,
        now: UnixSeconds,
    ) -> Result<f64, ScoringError> {
        if !observation.timestamp.is_finite() {
            return Err(ScoringError::NonFiniteTimestamp);
        }

        let accuracy_term = match observation.accuracy {
            None if observation.place_name().is_some() => 0.0,
            None => f64::INFINITY,
            Some(accuracy) if !accuracy.is_finite() => {
                return Err(ScoringError::NonFiniteAccuracy)
            }
            Some(accuracy) => accuracy,
        };

        let age_secs = observation.age_secs(now);
        let mut age_penalty = age_secs / self.config.age_unit_secs;
        if age_secs > self.config.stale_after_secs {
            age_penalty += self.config.stale_penalty;
        }

        let provenance_bonus = if observation.is_own_report {
            -self.config.own_report_bonus
        } else {
            0.0
        };

        Ok(accuracy_term + age_penalty + provenance_bonus)
    }

    /// Score, with any failure ranked last (`+inf`).
    pub fn score_or_worst(&self, observation: &LocationObservation, now: UnixSeconds) -> f64 {
        match self.score(observation, now) {
            Ok(score) if !score.is_nan() => score,
            Ok(_) => f64::INFINITY,
            Err(err) => {
                debug!(error = %err, "Observation scored as worst");
                f64::INFINITY
            }
        }
    }
}
