//! Per-route cache policy

use crate::cache::types::Classification;
use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};

/// Cache policy for one route, loaded with the rest of the function's
/// configuration and never mutated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheProfile {
    /// Name used in logs
    pub name: String,

    /// Lifetime of a fresh entry, and the interval length when
    /// `expiration_is_on_interval` is set
    pub default_expiration_seconds: u64,

    /// Align expiry to the next interval boundary in the configured time zone
    #[serde(default)]
    pub expiration_is_on_interval: bool,

    /// Ignore `cache-control`/`expires` hints from the origin
    #[serde(default)]
    pub override_origin_header_expiration: bool,

    /// Upstream headers persisted with the entry
    #[serde(default)]
    pub headers_to_retain: Vec<String>,

    #[serde(default)]
    pub classification: Classification,
}

impl CacheProfile {
    pub fn new(name: impl Into<String>, default_expiration_seconds: u64) -> Self {
        Self {
            name: name.into(),
            default_expiration_seconds,
            expiration_is_on_interval: false,
            override_origin_header_expiration: false,
            headers_to_retain: Vec::new(),
            classification: Classification::Public,
        }
    }

    pub fn on_interval(mut self, enabled: bool) -> Self {
        self.expiration_is_on_interval = enabled;
        self
    }

    pub fn override_origin_expiration(mut self, enabled: bool) -> Self {
        self.override_origin_header_expiration = enabled;
        self
    }

    pub fn retain_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.headers_to_retain = headers
            .into_iter()
            .map(|h| h.as_ref().trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        self
    }

    pub fn classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_expiration_seconds == 0 {
            return Err(CacheError::ConfigError(format!(
                "profile '{}': default_expiration_seconds must be greater than 0",
                self.name
            )));
        }
        Ok(())
    }
}
