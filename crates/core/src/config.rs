//! Configuration management for the FMDN core.
//!
//! Every field has a default that reproduces the stock behaviour, so an
//! empty TOML document is a valid configuration.

use serde::{Deserialize, Serialize};
#[cfg(feature = "config-file")]
use std::path::Path;

use crate::error::{CoreError, CoreResult};

/// Security domain holding the Find My Device shared key.
pub const DEFAULT_VAULT_DOMAIN: &str = "finder_hw";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FmdnConfig {
    pub vault: VaultConfig,
    pub location: LocationConfig,
}

/// Which entry of a security domain supplies the shared key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpochPolicy {
    /// The first entry in response order, whatever its epoch.
    #[default]
    FirstEntry,
    /// The entry with the greatest epoch; earliest wins on ties.
    HighestEpoch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub domain: String,
    pub epoch_policy: EpochPolicy,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_VAULT_DOMAIN.to_string(),
            epoch_policy: EpochPolicy::FirstEntry,
        }
    }
}

/// Location scoring knobs. Units: seconds and score points (1 point ~ 1 m).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Seconds of age that cost one score point
    pub age_unit_secs: f64,
    /// Age beyond which the stale penalty applies
    pub stale_after_secs: f64,
    /// Flat penalty for stale observations
    pub stale_penalty: f64,
    /// Subtracted from the score of the owner's own reports
    pub own_report_bonus: f64,
    /// Lookback window a history source should query
    pub history_hours: u32,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            age_unit_secs: 180.0,
            stale_after_secs: 7200.0,
            stale_penalty: 100.0,
            own_report_bonus: 2.0,
            history_hours: 24,
        }
    }
}

impl FmdnConfig {
    #[cfg(feature = "config-file")]
    pub fn from_file<P: AsRef<Path>>(path: P) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    #[cfg(feature = "config-file")]
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config() -> Self {
        Self::default()
    }

    /// Reject values that would make extraction or scoring meaningless.
    pub fn validate(&self) -> CoreResult<()> {
        if self.vault.domain.trim().is_empty() {
            return Err(CoreError::Config("vault.domain must not be empty".to_string()));
        }

        let loc = &self.location;
        if !(loc.age_unit_secs.is_finite() && loc.age_unit_secs > 0.0) {
            return Err(CoreError::Config(format!(
                "location.age_unit_secs must be positive, got {}",
                loc.age_unit_secs
            )));
        }
        for (name, value) in [
            ("location.stale_after_secs", loc.stale_after_secs),
            ("location.stale_penalty", loc.stale_penalty),
            ("location.own_report_bonus", loc.own_report_bonus),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(CoreError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if loc.history_hours == 0 {
            return Err(CoreError::Config(
                "location.history_hours must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
