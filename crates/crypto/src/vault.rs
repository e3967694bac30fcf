//! Shared key extraction from a backup-vault response.
//!
//! The vault response is a JSON object mapping security-domain names to
//! arrays of `{ "epoch": n, "key": { "0": b0, "1": b1, ... } }` entries. Key
//! bytes travel as an object keyed by stringified index, so byte order is
//! rebuilt from the numeric index, never from serialization order.
//!
//! Domains and entries are scanned in input order. Which entry of the target
//! domain is used is decided by an [`EpochPolicy`]; the default
//! [`EpochPolicy::FirstEntry`] takes the first entry and ignores epochs.

use std::fmt;
use std::str::FromStr;

use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, trace};

pub use fmdn_core::config::{EpochPolicy, VaultConfig, DEFAULT_VAULT_DOMAIN};

use crate::shared_key::SharedKey;

/// Errors from vault key extraction.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Vault response could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No suitable key found in security domain '{domain}'")]
    NoSuitableKey { domain: String },

    #[error("Malformed key in security domain '{domain}' (entry {position}): {reason}")]
    MalformedKey {
        domain: String,
        position: usize,
        epoch: Option<i64>,
        reason: String,
    },
}

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Decoded vault response: security domains in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VaultResponse {
    pub domains: Vec<SecurityDomain>,
}

/// One named key-storage partition.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityDomain {
    pub name: String,
    pub entries: Vec<VaultEntry>,
}

/// One `{epoch, key}` entry of a security domain.
///
/// Entries stay undecoded until selected, so a malformed entry only fails
/// extraction when it is the one chosen.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct VaultEntry(Value);

impl VaultEntry {
    /// The entry's epoch, if it is an integer (integral floats accepted).
    pub fn epoch(&self) -> Option<i64> {
        let epoch = self.0.get("epoch")?;
        if let Some(epoch) = epoch.as_i64() {
            return Some(epoch);
        }
        epoch
            .as_f64()
            .filter(|e| e.fract() == 0.0 && *e >= i64::MIN as f64 && *e <= i64::MAX as f64)
            .map(|e| e as i64)
    }

    /// The entry's key map.
    pub fn key(&self) -> Result<KeyMaterial, String> {
        match self.0.get("key") {
            Some(Value::Object(map)) => Ok(KeyMaterial(map.clone())),
            Some(other) => Err(format!("key is {}, expected an object", json_kind(other))),
            None if self.0.is_object() => Err("entry has no key".to_string()),
            None => Err(format!("entry is {}, expected an object", json_kind(&self.0))),
        }
    }
}

impl fmt::Debug for VaultEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultEntry")
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Key bytes as transported: a map from stringified index to byte value.
#[derive(Clone, PartialEq, Default, Deserialize)]
#[serde(transparent)]
pub struct KeyMaterial(Map<String, Value>);

impl KeyMaterial {
    /// Rebuild the byte sequence ordered by numeric index.
    ///
    /// Indices must be exactly `0..n` in canonical decimal form and every
    /// value a byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        let mut indexed = Vec::with_capacity(self.0.len());
        for (index, value) in &self.0 {
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("index '{}' is not a non-negative integer", index));
            }
            let position: usize = index
                .parse()
                .map_err(|_| format!("index '{}' is out of range", index))?;
            if position.to_string() != *index {
                return Err(format!("index '{}' is not in canonical form", index));
            }
            let byte = value
                .as_u64()
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| format!("value at index {} is not a byte", position))?;
            indexed.push((position, byte));
        }

        indexed.sort_unstable_by_key(|(position, _)| *position);
        for (expected, (position, _)) in indexed.iter().enumerate() {
            if *position != expected {
                return Err(format!(
                    "indices are not contiguous: expected {}, found {}",
                    expected, position
                ));
            }
        }

        Ok(indexed.into_iter().map(|(_, byte)| byte).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyMaterial({} entries)", self.0.len())
    }
}

impl VaultResponse {
    pub fn from_slice(input: &[u8]) -> VaultResult<Self> {
        Ok(serde_json::from_slice(input)?)
    }

    /// First domain with the given name.
    pub fn domain(&self, name: &str) -> Option<&SecurityDomain> {
        self.domains.iter().find(|d| d.name == name)
    }
}

impl FromStr for VaultResponse {
    type Err = VaultError;

    fn from_str(input: &str) -> VaultResult<Self> {
        Ok(serde_json::from_str(input)?)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DomainValue {
    Entries(Vec<VaultEntry>),
    Other(IgnoredAny),
}

impl<'de> Deserialize<'de> for VaultResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DomainsVisitor;

        impl<'de> Visitor<'de> for DomainsVisitor {
            type Value = VaultResponse;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of security domain names to key entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut domains = Vec::new();
                while let Some(name) = map.next_key::<String>()? {
                    match map.next_value::<DomainValue>()? {
                        DomainValue::Entries(entries) => {
                            domains.push(SecurityDomain { name, entries })
                        }
                        DomainValue::Other(IgnoredAny) => {
                            trace!(domain = %name, "Skipping vault field that is not an array")
                        }
                    }
                }
                Ok(VaultResponse { domains })
            }
        }

        deserializer.deserialize_map(DomainsVisitor)
    }
}

/// A shared key together with where it was taken from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedKeyCandidate {
    /// Index of the entry within its domain
    pub position: usize,
    /// Epoch of the entry, if readable
    pub epoch: Option<i64>,
    pub key: SharedKey,
}

/// Pulls the shared key of one security domain out of a vault response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultKeyExtractor {
    domain: String,
    policy: EpochPolicy,
}

impl Default for VaultKeyExtractor {
    fn default() -> Self {
        Self {
            domain: DEFAULT_VAULT_DOMAIN.to_string(),
            policy: EpochPolicy::FirstEntry,
        }
    }
}

impl VaultKeyExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self {
            domain: config.domain.clone(),
            policy: config.epoch_policy,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_policy(mut self, policy: EpochPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn policy(&self) -> EpochPolicy {
        self.policy
    }

    /// Parse a serialized vault response and extract the shared key.
    pub fn extract(&self, vault_response: impl AsRef<[u8]>) -> VaultResult<SharedKey> {
        let response = VaultResponse::from_slice(vault_response.as_ref())?;
        Ok(self.extract_entry(&response)?.key)
    }

    /// Select an entry of the target domain and rebuild its key bytes.
    ///
    /// Under [`EpochPolicy::HighestEpoch`], entries without a readable
    /// integer epoch are skipped.
    ///
    /// # Errors
    /// - [`VaultError::NoSuitableKey`] if the domain is absent, has no
    ///   selectable entry, or the selected entry holds zero bytes.
    /// - [`VaultError::MalformedKey`] if the selected entry's bytes cannot be
    ///   rebuilt. Other entries are never decoded.
    pub fn extract_entry(&self, response: &VaultResponse) -> VaultResult<SharedKeyCandidate> {
        let no_key = || VaultError::NoSuitableKey {
            domain: self.domain.clone(),
        };

        let domain = response.domain(&self.domain).ok_or_else(no_key)?;
        let (position, entry, epoch) = match self.policy {
            EpochPolicy::FirstEntry => domain
                .entries
                .first()
                .map(|entry| (0, entry, entry.epoch())),
            // max_by_key keeps the last maximum; compare reversed positions
            // so the earliest entry wins ties.
            EpochPolicy::HighestEpoch => domain
                .entries
                .iter()
                .enumerate()
                .filter_map(|(position, entry)| entry.epoch().map(|e| (position, entry, Some(e))))
                .max_by_key(|(position, _, epoch)| (*epoch, std::cmp::Reverse(*position))),
        }
        .ok_or_else(no_key)?;

        let malformed = |reason| VaultError::MalformedKey {
            domain: self.domain.clone(),
            position,
            epoch,
            reason,
        };
        let bytes = entry.key().and_then(|key| key.to_bytes()).map_err(malformed)?;
        if bytes.is_empty() {
            return Err(no_key());
        }

        debug!(
            domain = %self.domain,
            position,
            epoch = ?epoch,
            entries = domain.entries.len(),
            key_len = bytes.len(),
            "Selected vault entry"
        );

        Ok(SharedKeyCandidate {
            position,
            epoch,
            key: SharedKey::from_bytes(bytes),
        })
    }
}

/// Extract the `finder_hw` shared key from a serialized vault response,
/// taking the first entry.
pub fn extract_shared_key(vault_response: impl AsRef<[u8]>) -> VaultResult<SharedKey> {
    VaultKeyExtractor::default().extract(vault_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_entry() {
        let key = extract_shared_key(r#"{"finder_hw":[{"epoch":1,"key":{"0":10,"1":20}}]}"#)
            .unwrap();
        assert_eq!(key.as_bytes(), &[10, 20]);
    }

    #[test]
    fn test_accepts_bytes_input() {
        let input: &[u8] = br#"{"finder_hw":[{"epoch":1,"key":{"0":7}}]}"#;
        assert_eq!(extract_shared_key(input).unwrap().as_bytes(), &[7]);
    }

    #[test]
    fn test_missing_domain() {
        let result = extract_shared_key(r#"{"other":[{"epoch":1,"key":{"0":1}}]}"#);
        assert!(matches!(
            result,
            Err(VaultError::NoSuitableKey { ref domain }) if domain == "finder_hw"
        ));
    }

    #[test]
    fn test_empty_domain() {
        let result = extract_shared_key(r#"{"finder_hw":[]}"#);
        assert!(matches!(result, Err(VaultError::NoSuitableKey { .. })));
    }

    #[test]
    fn test_empty_key_is_not_returned() {
        let result = extract_shared_key(r#"{"finder_hw":[{"epoch":1,"key":{}}]}"#);
        assert!(matches!(result, Err(VaultError::NoSuitableKey { .. })));
    }

    #[test]
    fn test_empty_object() {
        assert!(matches!(
            extract_shared_key("{}"),
            Err(VaultError::NoSuitableKey { .. })
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            extract_shared_key("not json"),
            Err(VaultError::Parse(_))
        ));
        assert!(matches!(extract_shared_key("[1,2]"), Err(VaultError::Parse(_))));
    }

    #[test]
    fn test_byte_order_follows_numeric_index() {
        // Lexicographic order would put "10" before "2".
        let mut pairs: Vec<String> = (0..12)
            .rev()
            .map(|i| format!("\"{}\":{}", i, i * 3))
            .collect();
        pairs.swap(0, 5);
        let json = format!(r#"{{"finder_hw":[{{"epoch":1,"key":{{{}}}}}]}}"#, pairs.join(","));

        let key = extract_shared_key(json).unwrap();
        let expected: Vec<u8> = (0..12).map(|i| i * 3).collect();
        assert_eq!(key.as_bytes(), expected.as_slice());
    }

    #[test]
    fn test_first_entry_wins_by_default() {
        let json = r#"{"finder_hw":[
            {"epoch":1,"key":{"0":1}},
            {"epoch":5,"key":{"0":5}}
        ]}"#;
        assert_eq!(extract_shared_key(json).unwrap().as_bytes(), &[1]);
    }

    #[test]
    fn test_highest_epoch_policy() {
        let json = r#"{"finder_hw":[
            {"epoch":3,"key":{"0":3}},
            {"epoch":9,"key":{"0":9}},
            {"epoch":9,"key":{"0":99}},
            {"epoch":2,"key":{"0":2}}
        ]}"#;
        let extractor = VaultKeyExtractor::new().with_policy(EpochPolicy::HighestEpoch);
        let response = json.parse::<VaultResponse>().unwrap();
        let candidate = extractor.extract_entry(&response).unwrap();
        assert_eq!(candidate.epoch, Some(9));
        assert_eq!(candidate.position, 1);
        assert_eq!(candidate.key.as_bytes(), &[9]);
    }

    #[test]
    fn test_only_selected_entry_is_decoded() {
        let json = r#"{"finder_hw":[
            {"epoch":1,"key":{"0":1}},
            {"epoch":2,"key":{"0":300}}
        ]}"#;
        assert_eq!(extract_shared_key(json).unwrap().as_bytes(), &[1]);

        let extractor = VaultKeyExtractor::new().with_policy(EpochPolicy::HighestEpoch);
        assert!(matches!(
            extractor.extract(json),
            Err(VaultError::MalformedKey { epoch: Some(2), position: 1, .. })
        ));
    }

    #[test]
    fn test_gap_in_indices_is_malformed() {
        let result = extract_shared_key(r#"{"finder_hw":[{"epoch":4,"key":{"0":1,"2":3}}]}"#);
        assert!(matches!(result, Err(VaultError::MalformedKey { epoch: Some(4), .. })));
    }

    #[test]
    fn test_non_numeric_index_is_malformed() {
        let result = extract_shared_key(r#"{"finder_hw":[{"epoch":1,"key":{"0":1,"x":3}}]}"#);
        assert!(matches!(result, Err(VaultError::MalformedKey { .. })));
    }

    #[test]
    fn test_domain_order_preserved() {
        let json = r#"{"zeta":[],"finder_hw":[{"epoch":1,"key":{"0":1}}],"alpha":[]}"#;
        let response = json.parse::<VaultResponse>().unwrap();
        let names: Vec<&str> = response.domains.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "finder_hw", "alpha"]);
    }

    #[test]
    fn test_non_entry_fields_are_skipped() {
        let json = r#"{"version":2,"finder_hw":[{"epoch":1,"key":{"0":42}}]}"#;
        let response = json.parse::<VaultResponse>().unwrap();
        assert_eq!(response.domains.len(), 1);
        assert_eq!(extract_shared_key(json).unwrap().as_bytes(), &[42]);
    }

    #[test]
    fn test_custom_domain() {
        let json = r#"{"finder_hw":[{"epoch":1,"key":{"0":1}}],"other":[{"epoch":1,"key":{"0":2}}]}"#;
        let extractor = VaultKeyExtractor::new().with_domain("other");
        assert_eq!(extractor.extract(json).unwrap().as_bytes(), &[2]);
    }

    #[test]
    fn test_from_config() {
        let config = VaultConfig {
            domain: "finder_sw".to_string(),
            epoch_policy: EpochPolicy::HighestEpoch,
        };
        let extractor = VaultKeyExtractor::from_config(&config);
        assert_eq!(extractor.domain(), "finder_sw");
        assert_eq!(extractor.policy(), EpochPolicy::HighestEpoch);
    }

    #[test]
    fn test_key_material_debug_is_redacted() {
        let response: VaultResponse = r#"{"finder_hw":[{"epoch":1,"key":{"0":171}}]}"#
            .parse()
            .unwrap();
        let key = response.domains[0].entries[0].key().unwrap();
        let rendered = format!("{:?}", key);
        assert_eq!(rendered, "KeyMaterial(1 entries)");
        assert!(!format!("{:?}", response).contains("171"));
    }

    #[test]
    fn test_malformed_later_entry_does_not_hide_first() {
        let key = extract_shared_key(
            r#"{"finder_hw":[{"epoch":1,"key":{"0":10,"1":20}},{"key":{"0":1}}]}"#,
        )
        .unwrap();
        assert_eq!(key.as_bytes(), &[10, 20]);

        let key = extract_shared_key(
            r#"{"finder_hw":[{"epoch":1,"key":{"0":7}},{"epoch":2,"key":[1,2]},"junk",null]}"#,
        )
        .unwrap();
        assert_eq!(key.as_bytes(), &[7]);
    }

    #[test]
    fn test_non_integer_epoch() {
        let json = r#"{"finder_hw":[{"epoch":1.0,"key":{"0":10}}]}"#;
        assert_eq!(extract_shared_key(json).unwrap().as_bytes(), &[10]);

        let json = r#"{"finder_hw":[{"epoch":"late","key":{"0":10}}]}"#;
        let response = json.parse::<VaultResponse>().unwrap();
        let candidate = VaultKeyExtractor::new().extract_entry(&response).unwrap();
        assert_eq!(candidate.epoch, None);
        assert_eq!(candidate.key.as_bytes(), &[10]);
    }

    #[test]
    fn test_highest_epoch_skips_unreadable_epochs() {
        let json = r#"{"finder_hw":[
            {"epoch":"99","key":{"0":99}},
            {"epoch":2.5,"key":{"0":25}},
            {"key":{"0":0}},
            {"epoch":4.0,"key":{"0":4}},
            {"epoch":3,"key":{"0":3}}
        ]}"#;
        let extractor = VaultKeyExtractor::new().with_policy(EpochPolicy::HighestEpoch);
        let candidate = extractor.extract_entry(&json.parse().unwrap()).unwrap();
        assert_eq!(candidate.epoch, Some(4));
        assert_eq!(candidate.key.as_bytes(), &[4]);

        let no_epochs = r#"{"finder_hw":[{"key":{"0":1}}]}"#;
        assert!(matches!(
            extractor.extract(no_epochs),
            Err(VaultError::NoSuitableKey { .. })
        ));
    }

    #[test]
    fn test_selected_entry_shape_errors_are_malformed() {
        for json in [
            r#"{"finder_hw":[{"epoch":1,"key":[10,20]}]}"#,
            r#"{"finder_hw":[{"epoch":1}]}"#,
            r#"{"finder_hw":["not an entry"]}"#,
        ] {
            assert!(
                matches!(
                    extract_shared_key(json),
                    Err(VaultError::MalformedKey { position: 0, .. })
                ),
                "{}",
                json
            );
        }
    }

    #[test]
    fn test_non_canonical_index_is_malformed() {
        let result = extract_shared_key(r#"{"finder_hw":[{"epoch":1,"key":{"0":10,"01":20}}]}"#);
        assert!(matches!(result, Err(VaultError::MalformedKey { .. })));

        let result = extract_shared_key(r#"{"finder_hw":[{"epoch":1,"key":{"00":10}}]}"#);
        assert!(matches!(result, Err(VaultError::MalformedKey { .. })));
    }

    #[test]
    fn test_entry_debug_hides_key() {
        let response: VaultResponse = r#"{"finder_hw":[{"epoch":3,"key":{"0":171}}]}"#
            .parse()
            .unwrap();
        let rendered = format!("{:?}", response.domains[0].entries[0]);
        assert!(rendered.contains("Some(3)"));
        assert!(!rendered.contains("171"));
    }
}
