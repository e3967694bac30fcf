//! Known-answer vectors for the hash primitives and owner key derivation.
//!
//! SHA-256 and HMAC-SHA256 vectors are the published ones (FIPS 180-2
//! "abc", RFC 4231 test case 2). Owner key vectors pin the derivation so a
//! change in tag values or truncation is caught.

use crate::hashing::{calculate_hmac_sha256, calculate_truncated_sha256};
use crate::owner_keys::{derive_owner_keys, OwnerKeyPurpose};

/// An owner key derivation vector.
pub struct OwnerKeyTestVector {
    pub name: &'static str,
    pub identity_key: Vec<u8>,
    pub recovery_hex: &'static str,
    pub ringing_hex: &'static str,
    pub tracking_hex: &'static str,
}

pub fn get_owner_key_vectors() -> Vec<OwnerKeyTestVector> {
    vec![
        OwnerKeyTestVector {
            name: "sequential_32_bytes",
            identity_key: (0u8..32).collect(),
            recovery_hex: "8b44d96f214304bc",
            ringing_hex: "5728705214326174",
            tracking_hex: "944c533876f9de37",
        },
        OwnerKeyTestVector {
            name: "repeated_0x42_16_bytes",
            identity_key: vec![0x42; 16],
            recovery_hex: "d6d10f301e47ddae",
            ringing_hex: "b67df0573f2663b4",
            tracking_hex: "b5ec244b7b6fa09a",
        },
    ]
}

#[test]
fn test_owner_key_vectors() {
    for vector in get_owner_key_vectors() {
        let keys = derive_owner_keys(&vector.identity_key).unwrap();
        assert_eq!(keys.recovery_key.to_hex(), vector.recovery_hex, "{}", vector.name);
        assert_eq!(keys.ringing_key.to_hex(), vector.ringing_hex, "{}", vector.name);
        assert_eq!(keys.tracking_key.to_hex(), vector.tracking_hex, "{}", vector.name);
    }
}

#[test]
fn test_owner_keys_match_truncated_hash() {
    for vector in get_owner_key_vectors() {
        let keys = derive_owner_keys(&vector.identity_key).unwrap();
        for purpose in OwnerKeyPurpose::ALL {
            assert_eq!(
                keys.key_for(purpose).as_bytes(),
                &calculate_truncated_sha256(&vector.identity_key, purpose.tag())
            );
        }
    }
}

#[test]
fn test_sha256_abc_prefix() {
    // "ab" || 'c' hashes the FIPS 180-2 message "abc".
    let out = calculate_truncated_sha256(b"ab", b'c');
    assert_eq!(hex::encode(out), "ba7816bf8f01cfea");
}

#[test]
fn test_hmac_rfc4231_case_2() {
    let tag = calculate_hmac_sha256(b"Jefe", b"what do ya want for nothing?");
    assert_eq!(
        tag,
        "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
    );
}
