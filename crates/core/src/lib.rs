//! Core functionality for the FMDN (Find My Device Network) trust core.
//!
//! This crate provides the shared error type, configuration and logging
//! setup used by the key-derivation, vault and location-fusion crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{EpochPolicy, FmdnConfig, LocationConfig, VaultConfig};
pub use error::{CoreError, CoreResult};
pub use types::{unix_now, UnixSeconds};
