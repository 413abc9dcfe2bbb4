//! Cache entry with expiration and purge horizon

use crate::cache::headers::Headers;
use crate::cache::key::CacheKey;
use crate::cache::types::Classification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The unit of storage and the unit of truth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cache key
    pub key: CacheKey,

    /// Decoded body; where it is persisted is decided by the codec
    pub body: Option<String>,

    /// Retained and computed headers
    pub headers: Headers,

    pub status_code: u16,

    /// Upstream status of the last failed refresh, if any
    pub error_code: Option<u16>,

    /// Epoch seconds after which the entry is stale
    pub expires_at: i64,

    /// Epoch seconds after which the durable store may reclaim the row
    pub purge_at: i64,

    pub classification: Classification,

    /// Whether the body was (or will be) persisted in the blob store
    pub in_blob_store: bool,
}

/// What a refresh does to the stored body
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BodyUpdate {
    /// Not-modified revalidation: the current body stays
    #[default]
    Keep,

    /// New origin response; `None` when it carried no body (e.g. 204)
    Replace(Option<String>),
}

/// Fresh data to merge over an existing entry
#[derive(Debug, Clone, Default)]
pub struct EntryUpdate {
    pub body: BodyUpdate,
    pub headers: Headers,
    pub status_code: u16,
    pub expires_at: i64,
    pub purge_at: i64,
    pub classification: Classification,
}

impl CacheEntry {
    /// Create a new entry expiring at `expires_at`
    pub fn new(
        key: CacheKey,
        body: Option<String>,
        headers: Headers,
        status_code: u16,
        classification: Classification,
        expires_at: i64,
        purge_at: i64,
    ) -> Self {
        Self {
            key,
            body,
            headers,
            status_code,
            error_code: None,
            expires_at,
            purge_at: purge_at.max(expires_at),
            classification,
            in_blob_store: false,
        }
    }

    /// Check if the entry has expired as of `now` (epoch seconds)
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// Check if the durable store may already have reclaimed this entry
    pub fn is_purgeable(&self, now: i64) -> bool {
        now >= self.purge_at
    }

    /// Seconds of freshness left, zero when stale
    pub fn seconds_until_expiration(&self, now: i64) -> u64 {
        (self.expires_at - now).max(0) as u64
    }

    pub fn expires_at_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.expires_at, 0)
    }

    /// Merge a refresh over this entry.
    ///
    /// Headers from the update override existing ones and the error code is
    /// cleared. A replaced body that differs from the current one also drops
    /// validators the update does not supply, since they described the old body.
    pub fn update(&mut self, update: EntryUpdate) {
        if let BodyUpdate::Replace(body) = update.body {
            if body != self.body {
                for name in ["etag", "last-modified"] {
                    if !update.headers.contains(name) {
                        self.headers.remove(name);
                    }
                }
            }
            self.body = body;
        }
        self.headers.merge(&update.headers);
        self.status_code = update.status_code;
        self.error_code = None;
        self.expires_at = update.expires_at;
        self.purge_at = update.purge_at.max(update.expires_at);
        self.classification = update.classification;
    }

    /// Push expiration forward by `grace_seconds` from whichever is later,
    /// the current expiry or `now`. Body and headers are untouched.
    pub fn extend_expires(&mut self, grace_seconds: u64, now: i64) {
        self.expires_at = self.expires_at.max(now) + grace_seconds as i64;
        self.purge_at = self.purge_at.max(self.expires_at);
    }

    /// Approximate in-memory size in bytes
    pub fn calculate_size(&self) -> usize {
        self.key.as_str().len()
            + self.body.as_ref().map(|b| b.len()).unwrap_or(0)
            + self.headers.approximate_size()
            + std::mem::size_of::<CacheEntry>()
    }
}
