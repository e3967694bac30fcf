//! Location fusion for tracked devices.
//!
//! Location observations arrive from several sources (the owner's own
//! device, crowd-sourced network sightings, named places) with differing
//! accuracy and age. This crate scores each observation and picks the single
//! best current estimate.
//!
//! # Scoring
//!
//! Lower is better:
//!
//! ```text
//! score = accuracy_term + age / 180 s (+ 100 if older than 2 h) (- 2 if own report)
//! ```
//!
//! An observation that cannot be scored (non-numeric timestamp or accuracy)
//! scores `+inf` instead of aborting the selection.

#![warn(missing_docs)]

pub mod history;
pub mod observation;
pub mod scoring;
pub mod selector;

pub use history::{
    is_usable_record, observations_from_history, observations_in_window, HistoryRecord,
    UNAVAILABLE_STATES,
};
pub use observation::LocationObservation;
pub use scoring::{LocationScorer, ScoringConfig, ScoringError};
pub use selector::{select_best, select_best_at, LocationSelector, ScoredObservation};
