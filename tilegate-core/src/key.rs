//! Cache key derivation.
//!
//! A [`CacheKey`] is the lowercase hex digest of the raw request query.
//! Byte-identical queries always map to the same key; no normalization is
//! applied, so `a=1&b=2` and `b=2&a=1` are different tiles.

use std::fmt;
use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ConfigError;
use crate::query::RequestQuery;

/// Digest used to fingerprint queries.
///
/// `Md5` yields 128-bit keys and matches the file names of caches populated
/// by earlier deployments. `Sha256` yields 256-bit keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDigest {
    #[default]
    Md5,
    Sha256,
}

impl KeyDigest {
    /// Length of the hex-encoded key produced by this digest.
    pub fn hex_len(&self) -> usize {
        match self {
            KeyDigest::Md5 => 32,
            KeyDigest::Sha256 => 64,
        }
    }

    /// Derive the cache key for a query.
    pub fn derive(&self, query: &RequestQuery) -> CacheKey {
        CacheKey(self.digest_hex(query.as_bytes()))
    }

    fn digest_hex(&self, input: &[u8]) -> String {
        match self {
            KeyDigest::Md5 => hex::encode(Md5::digest(input)),
            KeyDigest::Sha256 => hex::encode(Sha256::digest(input)),
        }
    }
}

impl FromStr for KeyDigest {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(KeyDigest::Md5),
            "sha256" | "sha-256" => Ok(KeyDigest::Sha256),
            other => Err(ConfigError::InvalidValue {
                field: "key_digest".to_string(),
                value: other.to_string(),
                reason: "expected md5 or sha256".to_string(),
            }),
        }
    }
}

/// Fixed-length hex fingerprint naming a cached tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive a key with the default digest.
    pub fn derive(query: &RequestQuery) -> Self {
        KeyDigest::default().derive(query)
    }

    /// Accept an existing hex key (e.g. a file name from the cache root).
    ///
    /// Returns `None` unless the input is non-empty lowercase hex, which
    /// also guarantees the key is safe to use as a single path component.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let valid = !hex.is_empty()
            && hex
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        valid.then(|| Self(hex.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
