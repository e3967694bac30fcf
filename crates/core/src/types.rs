//! Core types

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch, fractional.
pub type UnixSeconds = f64;

/// Current wall-clock time in seconds since the Unix epoch.
///
/// A clock set before 1970 reads as `0.0`.
pub fn unix_now() -> UnixSeconds {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
