//! Content-addressed cache keys

use crate::error::{CacheError, Result};
use crate::fetch::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;

/// Digest used to derive cache keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Hex digest of `data`
    pub fn hex_digest(&self, data: &[u8]) -> String {
        match self {
            DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
            DigestAlgorithm::Sha384 => hex::encode(Sha384::digest(data)),
            DigestAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha384" => Ok(DigestAlgorithm::Sha384),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            other => Err(CacheError::ConfigError(format!(
                "unsupported digest algorithm: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Sha256 => write!(f, "sha256"),
            DigestAlgorithm::Sha384 => write!(f, "sha384"),
            DigestAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

/// Deterministic identifier of a logical request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a request.
    ///
    /// The hashed document covers method, host, path, parameters, body and the
    /// salt. Maps are ordered, so two descriptors that differ only in the order
    /// parameters were added produce the same key; the response hook is never
    /// serialized.
    ///
    /// Request headers are not hashed. Two requests that differ only in
    /// `Authorization`, `Accept` or similar headers share one entry, so
    /// callers caching per-user data (`Classification::Private` profiles in
    /// particular) must carry the user-distinguishing value in `parameters`
    /// or in the salt.
    pub fn derive(
        connection: &Connection,
        algorithm: DigestAlgorithm,
        salt: Option<&str>,
    ) -> Result<Self> {
        let document = json!({
            "method": connection.method.to_ascii_uppercase(),
            "host": connection.host.to_ascii_lowercase(),
            "path": connection.path,
            "parameters": connection.parameters,
            "body": connection.body,
            "salt": salt,
        });
        let bytes = serde_json::to_vec(&document)?;
        Ok(CacheKey(algorithm.hex_digest(&bytes)))
    }

    /// Wrap an already-derived key (e.g. read back from storage)
    pub fn from_raw(raw: impl Into<String>) -> Self {
        CacheKey(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
