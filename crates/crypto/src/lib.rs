//! Cryptographic primitives for the FMDN trust core.
//!
//! This crate covers the two key-handling steps of the Find My Device
//! Network pipeline:
//!
//! - **Owner key derivation**: three purpose-bound 8-byte keys (recovery,
//!   ringing, tracking) from a device identity key
//! - **Vault extraction**: the shared key of a named security domain
//!   (`finder_hw`) from a backup-vault response
//!
//! plus the shared key value type and its persisted encodings.
//!
//! # Design
//!
//! All functions are pure: no I/O, no retained state, no retries. Retrieving
//! the identity key or vault response is the caller's job, and failures are
//! returned as typed errors rather than empty keys.
//!
//! # Security Principles
//!
//! - Secret material is zeroized on drop
//! - `Debug` output never contains key bytes
//! - Secrets are never logged

pub mod hashing;
pub mod owner_keys;
pub mod shared_key;
pub mod vault;

#[cfg(test)]
mod test_vectors;

pub use hashing::{
    calculate_hmac_sha256, calculate_truncated_sha256, verify_hmac_sha256, TRUNCATED_SHA256_LEN,
};

pub use owner_keys::{
    derive_owner_keys, IdentityKey, KeyDerivationError, KeyDerivationResult, OwnerKey,
    OwnerKeyPurpose, OwnerKeySet, OWNER_KEY_LEN,
};

pub use shared_key::{SharedKey, SharedKeyError, SHARED_KEY_LEN};

pub use vault::{
    extract_shared_key, EpochPolicy, KeyMaterial, SecurityDomain, SharedKeyCandidate,
    VaultEntry, VaultError, VaultKeyExtractor, VaultResponse, VaultResult,
};
