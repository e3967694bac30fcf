//! Shared key value type and its string encodings.
//!
//! The shared key decrypts end-to-end encrypted location reports. Vault
//! extraction produces it as raw bytes; persisted copies arrive as hex,
//! base64/base64url or PEM-armoured text, and all of those normalise to a
//! 32-byte [`SharedKey`].

use std::fmt;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a shared key decoded from a persisted encoding.
pub const SHARED_KEY_LEN: usize = 32;

/// Errors from decoding a persisted shared key.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedKeyError {
    #[error("Invalid shared key encoding: {0}")]
    InvalidEncoding(String),

    #[error("Invalid shared key length: {actual} bytes (expected {expected})")]
    InvalidLength { actual: usize, expected: usize },
}

/// Raw shared key bytes. Zeroized on drop; `Debug` shows only the length.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey(Vec<u8>);

impl SharedKey {
    /// Wrap bytes without a length check. Vault entries are not required to
    /// be [`SHARED_KEY_LEN`] long.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
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

    /// Lowercase hex, the canonical persisted form.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Decode hex: optional `0x` prefix, whitespace ignored, odd length
    /// left-padded with `0`. Must yield exactly 32 bytes.
    pub fn from_hex(encoded: &str) -> Result<Self, SharedKeyError> {
        let mut digits: String = encoded
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if let Some(stripped) = digits.strip_prefix("0x") {
            digits = stripped.to_string();
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SharedKeyError::InvalidEncoding(
                "shared key contains non-hex characters".to_string(),
            ));
        }
        if digits.len() % 2 == 1 {
            digits.insert(0, '0');
        }

        let bytes = hex::decode(&digits)
            .map_err(|e| SharedKeyError::InvalidEncoding(format!("invalid hex: {}", e)))?;
        Self::exact_length(bytes)
    }

    /// Decode base64 or base64url, with or without padding or PEM armour.
    /// Must yield exactly 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self, SharedKeyError> {
        let mut body = strip_pem_armour(encoded);
        body.retain(|c| !c.is_whitespace());
        let body = body.trim_end_matches('=');
        let padded = format!("{}{}", body, "=".repeat((4 - body.len() % 4) % 4));

        let bytes = URL_SAFE
            .decode(&padded)
            .or_else(|_| STANDARD.decode(&padded))
            .map_err(|e| SharedKeyError::InvalidEncoding(format!("invalid base64: {}", e)))?;
        Self::exact_length(bytes)
    }

    /// Hex first, then base64.
    pub fn from_encoded(encoded: &str) -> Result<Self, SharedKeyError> {
        Self::from_hex(encoded).or_else(|_| Self::from_base64(encoded))
    }

    /// Take the trailing 32 bytes of a DER-encoded private key.
    pub fn from_private_key_der(der: &[u8]) -> Result<Self, SharedKeyError> {
        if der.len() < SHARED_KEY_LEN {
            return Err(SharedKeyError::InvalidLength {
                actual: der.len(),
                expected: SHARED_KEY_LEN,
            });
        }
        Ok(Self(der[der.len() - SHARED_KEY_LEN..].to_vec()))
    }

    fn exact_length(mut bytes: Vec<u8>) -> Result<Self, SharedKeyError> {
        if bytes.len() != SHARED_KEY_LEN {
            let actual = bytes.len();
            bytes.zeroize();
            return Err(SharedKeyError::InvalidLength {
                actual,
                expected: SHARED_KEY_LEN,
            });
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedKey({} bytes)", self.0.len())
    }
}

/// Drop `-----BEGIN ...-----` / `-----END ...-----` markers.
fn strip_pem_armour(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("-----") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 5..];
        match after.find("-----") {
            Some(end) => rest = &after[end + 5..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}
