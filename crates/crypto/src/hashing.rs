//! Hash primitives shared by the owner-key derivation.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Bytes kept from a SHA-256 digest by [`calculate_truncated_sha256`].
pub const TRUNCATED_SHA256_LEN: usize = 8;

type HmacSha256 = Hmac<Sha256>;

/// `SHA-256(identity_key || operation)`, truncated to the first 8 bytes.
pub fn calculate_truncated_sha256(
    identity_key: &[u8],
    operation: u8,
) -> [u8; TRUNCATED_SHA256_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(identity_key);
    hasher.update([operation]);
    let digest = hasher.finalize();

    let mut truncated = [0u8; TRUNCATED_SHA256_LEN];
    truncated.copy_from_slice(&digest[..TRUNCATED_SHA256_LEN]);
    truncated
}

/// HMAC-SHA256 of `message` under `key`, as lowercase hex.
pub fn calculate_hmac_sha256(key: &[u8], message: &[u8]) -> String {
    hex::encode(hmac_sha256(key, message))
}

/// Constant-time check of a hex HMAC-SHA256 tag.
///
/// Returns `false` for tags that are not valid hex.
pub fn verify_hmac_sha256(key: &[u8], message: &[u8], expected_hex: &str) -> bool {
    let Ok(expected) = hex::decode(expected_hex.trim()) else {
        return false;
    };
    let mut mac = new_mac(key);
    mac.update(message);
    mac.verify_slice(&expected).is_ok()
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    let mut mac = new_mac(key);
    mac.update(message);
    mac.finalize().into_bytes().into()
}

fn new_mac(key: &[u8]) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC can take key of any size")
}
