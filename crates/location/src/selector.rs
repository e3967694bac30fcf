//! Best-location selection
//!
//! Picks the lowest-scoring observation. Ties go to the observation that
//! appears first in the input, so callers should pass observations in a
//! meaningful priority order (newest first is what the history helpers
//! produce).

use std::cmp::Ordering;

use fmdn_core::{unix_now, LocationConfig, UnixSeconds};
use tracing::debug;

use crate::observation::LocationObservation;
use crate::scoring::{LocationScorer, ScoringConfig};

/// An observation with its computed score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredObservation<'a> {
    /// The scored observation
    pub observation: &'a LocationObservation,
    /// Score, lower is better; `+inf` for unscorable observations
    pub score: f64,
    /// Position in the input slice
    pub index: usize,
}

/// Chooses the best current location estimate from a batch of observations.
#[derive(Debug, Clone, Default)]
pub struct LocationSelector {
    scorer: LocationScorer,
}

impl LocationSelector {
    /// Create a selector with the default scoring constants
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a selector with custom scoring constants
    pub fn with_config(config: ScoringConfig) -> Self {
        Self {
            scorer: LocationScorer::with_config(config),
        }
    }

    /// Create a selector from the location section of the configuration
    pub fn from_config(config: &LocationConfig) -> Self {
        Self::with_config(ScoringConfig::from(config))
    }

    /// The underlying scorer
    pub fn scorer(&self) -> &LocationScorer {
        &self.scorer
    }

    /// Score every observation and sort ascending, keeping input order on ties.
    pub fn rank<'a>(
        &self,
        observations: &'a [LocationObservation],
        now: UnixSeconds,
    ) -> Vec<ScoredObservation<'a>> {
        let mut ranked: Vec<ScoredObservation<'a>> = observations
            .iter()
            .enumerate()
            .map(|(index, observation)| ScoredObservation {
                observation,
                score: self.scorer.score_or_worst(observation, now),
                index,
            })
            .collect();

        // Scores are never NaN, so partial_cmp is total here.
        ranked.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
        ranked
    }

    /// Best observation with its score, or `None` for an empty batch.
    pub fn best_scored_at<'a>(
        &self,
        observations: &'a [LocationObservation],
        now: UnixSeconds,
    ) -> Option<ScoredObservation<'a>> {
        let mut best: Option<ScoredObservation<'a>> = None;
        for (index, observation) in observations.iter().enumerate() {
            let score = self.scorer.score_or_worst(observation, now);
            if best.map_or(true, |current| score < current.score) {
                best = Some(ScoredObservation {
                    observation,
                    score,
                    index,
                });
            }
        }

        if let Some(chosen) = &best {
            debug!(
                accuracy = ?chosen.observation.accuracy,
                age_minutes = chosen.observation.age_secs(now) / 60.0,
                score = chosen.score,
                options = observations.len(),
                "Selected best location"
            );
        }
        best
    }

    /// Best observation at time `now`, or `None` for an empty batch.
    pub fn select_best_at<'a>(
        &self,
        observations: &'a [LocationObservation],
        now: UnixSeconds,
    ) -> Option<&'a LocationObservation> {
        self.best_scored_at(observations, now)
            .map(|scored| scored.observation)
    }

    /// Best observation as of the current wall-clock time.
    pub fn select_best<'a>(
        &self,
        observations: &'a [LocationObservation],
    ) -> Option<&'a LocationObservation> {
        self.select_best_at(observations, unix_now())
    }
}

/// Best observation as of now, using the default scoring constants.
pub fn select_best(observations: &[LocationObservation]) -> Option<&LocationObservation> {
    LocationSelector::new().select_best(observations)
}

/// Best observation at time `now`, using the default scoring constants.
pub fn select_best_at(
    observations: &[LocationObservation],
    now: UnixSeconds,
) -> Option<&LocationObservation> {
    LocationSelector::new().select_best_at(observations, now)
}
