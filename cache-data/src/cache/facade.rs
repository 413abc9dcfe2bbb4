//! Read-side view of an orchestration result

use crate::cache::entry::{CacheEntry, EntryUpdate};
use crate::cache::expiration::http_date;
use crate::cache::headers::{HeaderValue, Headers};
use crate::cache::types::{CacheStatus, CacheTier, Classification};
use crate::error::{CacheError, Result};
use serde::de::DeserializeOwned;

/// What a caller gets back from
/// [`CacheableDataAccess::get_data`](crate::cache::access::CacheableDataAccess::get_data).
///
/// Every accessor yields a concrete value or `None`; header accessors can
/// never surface an unusable value because [`Headers`] cannot hold one.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheFacade {
    entry: Option<CacheEntry>,
    status: CacheStatus,
    tier: CacheTier,
}

impl CacheFacade {
    pub(crate) fn new(entry: CacheEntry, status: CacheStatus, tier: CacheTier) -> Self {
        Self {
            entry: Some(entry),
            status,
            tier,
        }
    }

    /// A facade holding nothing
    pub fn empty() -> Self {
        Self {
            entry: None,
            status: CacheStatus::Original,
            tier: CacheTier::Origin,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    pub fn status(&self) -> CacheStatus {
        self.status
    }

    pub fn tier(&self) -> CacheTier {
        self.tier
    }

    pub fn is_degraded(&self) -> bool {
        self.status == CacheStatus::Degraded
    }

    pub fn entry(&self) -> Option<&CacheEntry> {
        self.entry.as_ref()
    }

    pub fn into_entry(self) -> Option<CacheEntry> {
        self.entry
    }

    pub fn headers(&self) -> Option<&Headers> {
        self.entry.as_ref().map(|entry| &entry.headers)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.headers().and_then(|headers| headers.get(name))
    }

    pub fn body(&self) -> Option<&str> {
        self.entry.as_ref().and_then(|entry| entry.body.as_deref())
    }

    /// Parse the body as JSON
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self
            .body()
            .ok_or_else(|| CacheError::NotFound("cached entry has no body".to_string()))?;
        Ok(serde_json::from_str(body)?)
    }

    pub fn status_code(&self) -> Option<u16> {
        self.entry.as_ref().map(|entry| entry.status_code)
    }

    /// Upstream status of the failed refresh behind a degraded result
    pub fn error_code(&self) -> Option<u16> {
        self.entry.as_ref().and_then(|entry| entry.error_code)
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.entry.as_ref().map(|entry| entry.expires_at)
    }

    pub fn classification(&self) -> Option<Classification> {
        self.entry.as_ref().map(|entry| entry.classification)
    }

    pub fn etag(&self) -> Option<&str> {
        self.header("etag").and_then(HeaderValue::as_str)
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.header("last-modified").and_then(HeaderValue::as_str)
    }

    /// Headers for the function's own response: the retained headers plus
    /// `cache-control` and `expires` derived from the entry's expiry.
    /// Private entries are marked `private`.
    pub fn response_headers(&self, now: i64) -> Headers {
        let Some(entry) = &self.entry else {
            return Headers::new();
        };

        let mut headers = entry.headers.clone();
        let max_age = entry.seconds_until_expiration(now);
        let scope = match entry.classification {
            Classification::Public => "public",
            Classification::Private => "private",
        };
        headers.insert_text("cache-control", &format!("{}, max-age={}", scope, max_age));
        match http_date(entry.expires_at) {
            Some(expires) => {
                headers.insert_text("expires", &expires);
            }
            None => {
                headers.remove("expires");
            }
        }
        headers
    }

    pub(crate) fn entry_mut(&mut self) -> Option<&mut CacheEntry> {
        self.entry.as_mut()
    }

    pub(crate) fn update(&mut self, update: EntryUpdate, status: CacheStatus) {
        if let Some(entry) = self.entry.as_mut() {
            entry.update(update);
            self.status = status;
            self.tier = CacheTier::Origin;
        }
    }

    pub(crate) fn extend_expires(&mut self, grace_seconds: u64, now: i64, error_code: Option<u16>) {
        if let Some(entry) = self.entry.as_mut() {
            entry.extend_expires(grace_seconds, now);
            entry.error_code = error_code;
            self.status = CacheStatus::Degraded;
        }
    }
}
