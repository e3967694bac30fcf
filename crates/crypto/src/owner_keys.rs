//! Owner key derivation.
//!
//! Each tracked device has one identity key. The owner operations (recovery,
//! ringing, tracking) each use their own 8-byte key derived as
//! `SHA-256(identity_key || tag)[..8]`, with a distinct one-byte tag per
//! purpose. The identity key is assumed to carry enough entropy already; no
//! strength checks are performed here.

use std::fmt;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::hashing::{calculate_truncated_sha256, TRUNCATED_SHA256_LEN};

/// Length of every derived owner key.
pub const OWNER_KEY_LEN: usize = TRUNCATED_SHA256_LEN;

/// Errors from owner key derivation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyDerivationError {
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },
}

/// Result type for key derivation.
pub type KeyDerivationResult<T> = Result<T, KeyDerivationError>;

/// Operation an owner key is bound to. The discriminant is the
/// domain-separation tag appended to the identity key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OwnerKeyPurpose {
    Recovery = 0x01,
    Ringing = 0x02,
    Tracking = 0x03,
}

impl OwnerKeyPurpose {
    pub const ALL: [OwnerKeyPurpose; 3] = [Self::Recovery, Self::Ringing, Self::Tracking];

    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Recovery => "recovery",
            Self::Ringing => "ringing",
            Self::Tracking => "tracking",
        }
    }
}

impl fmt::Display for OwnerKeyPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root secret of one tracked device. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct IdentityKey(Vec<u8>);

impl IdentityKey {
    /// Wrap raw key bytes. Any non-zero length is accepted.
    pub fn new(bytes: Vec<u8>) -> KeyDerivationResult<Self> {
        if bytes.is_empty() {
            return Err(KeyDerivationError::InvalidInput {
                reason: "identity key must not be empty".to_string(),
            });
        }
        Ok(Self(bytes))
    }

    pub fn from_hex(encoded: &str) -> KeyDerivationResult<Self> {
        let bytes = hex::decode(encoded.trim()).map_err(|e| KeyDerivationError::InvalidInput {
            reason: format!("identity key is not valid hex: {}", e),
        })?;
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn derive_owner_keys(&self) -> OwnerKeySet {
        derive_from(&self.0)
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKey({} bytes)", self.0.len())
    }
}

/// One 8-byte owner key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct OwnerKey([u8; OWNER_KEY_LEN]);

impl OwnerKey {
    pub fn as_bytes(&self) -> &[u8; OWNER_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OwnerKey(..)")
    }
}

/// The three purpose-bound keys of one identity key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerKeySet {
    pub recovery_key: OwnerKey,
    pub ringing_key: OwnerKey,
    pub tracking_key: OwnerKey,
}

impl OwnerKeySet {
    pub fn key_for(&self, purpose: OwnerKeyPurpose) -> &OwnerKey {
        match purpose {
            OwnerKeyPurpose::Recovery => &self.recovery_key,
            OwnerKeyPurpose::Ringing => &self.ringing_key,
            OwnerKeyPurpose::Tracking => &self.tracking_key,
        }
    }
}

/// Derive the recovery, ringing and tracking keys from an identity key.
///
/// # Errors
/// [`KeyDerivationError::InvalidInput`] when `identity_key` is empty.
pub fn derive_owner_keys(identity_key: &[u8]) -> KeyDerivationResult<OwnerKeySet> {
    if identity_key.is_empty() {
        return Err(KeyDerivationError::InvalidInput {
            reason: "identity key must not be empty".to_string(),
        });
    }
    Ok(derive_from(identity_key))
}

fn derive_from(identity_key: &[u8]) -> OwnerKeySet {
    let derive = |purpose: OwnerKeyPurpose| {
        OwnerKey(calculate_truncated_sha256(identity_key, purpose.tag()))
    };

    OwnerKeySet {
        recovery_key: derive(OwnerKeyPurpose::Recovery),
        ringing_key: derive(OwnerKeyPurpose::Ringing),
        tracking_key: derive(OwnerKeyPurpose::Tracking),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential_key() -> Vec<u8> {
        (0u8..32).collect()
    }

    #[test]
    fn test_known_answer_sequential_key() {
        let keys = derive_owner_keys(&sequential_key()).unwrap();
        assert_eq!(keys.recovery_key.to_hex(), "8b44d96f214304bc");
        assert_eq!(keys.ringing_key.to_hex(), "5728705214326174");
        assert_eq!(keys.tracking_key.to_hex(), "944c533876f9de37");
    }

    #[test]
    fn test_keys_are_eight_bytes_and_distinct() {
        let keys = derive_owner_keys(b"some identity key").unwrap();
        assert_eq!(keys.recovery_key.as_bytes().len(), 8);
        assert_ne!(keys.recovery_key, keys.ringing_key);
        assert_ne!(keys.ringing_key, keys.tracking_key);
        assert_ne!(keys.recovery_key, keys.tracking_key);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let first = derive_owner_keys(&sequential_key()).unwrap();
        let second = derive_owner_keys(&sequential_key()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_identity_key_rejected() {
        let result = derive_owner_keys(&[]);
        assert!(matches!(result, Err(KeyDerivationError::InvalidInput { .. })));
        assert!(IdentityKey::new(Vec::new()).is_err());
    }

    #[test]
    fn test_any_length_accepted() {
        assert!(derive_owner_keys(&[0x00]).is_ok());
        assert!(derive_owner_keys(&[0x5a; 1024]).is_ok());
    }

    #[test]
    fn test_identity_key_matches_free_function() {
        let identity = IdentityKey::new(sequential_key()).unwrap();
        assert_eq!(
            identity.derive_owner_keys(),
            derive_owner_keys(&sequential_key()).unwrap()
        );
    }

    #[test]
    fn test_identity_key_from_hex() {
        let identity = IdentityKey::from_hex(" 000102 ").unwrap();
        assert_eq!(identity.as_bytes(), &[0, 1, 2]);
        assert!(IdentityKey::from_hex("zz").is_err());
        assert!(IdentityKey::from_hex("").is_err());
    }

    #[test]
    fn test_key_for_purpose() {
        let keys = derive_owner_keys(&sequential_key()).unwrap();
        assert_eq!(keys.key_for(OwnerKeyPurpose::Recovery), &keys.recovery_key);
        assert_eq!(keys.key_for(OwnerKeyPurpose::Ringing), &keys.ringing_key);
        assert_eq!(keys.key_for(OwnerKeyPurpose::Tracking), &keys.tracking_key);
    }

    #[test]
    fn test_purpose_tags() {
        let tags: Vec<u8> = OwnerKeyPurpose::ALL.iter().map(|p| p.tag()).collect();
        assert_eq!(tags, vec![0x01, 0x02, 0x03]);
        assert_eq!(OwnerKeyPurpose::Ringing.to_string(), "ringing");
    }

    #[test]
    fn test_debug_does_not_leak_secrets() {
        let identity = IdentityKey::new(vec![0xab; 16]).unwrap();
        let keys = identity.derive_owner_keys();

        assert_eq!(format!("{:?}", identity), "IdentityKey(16 bytes)");
        let rendered = format!("{:?}", keys);
        assert!(!rendered.contains(&keys.recovery_key.to_hex()));
        assert!(rendered.contains("OwnerKey(..)"));
    }
}
