//! Read-through orchestration
//!
//! One call runs `LOOKUP → FRESH | STALE | MISS → FETCH? → PERSIST → RETURN`:
//!
//! - the memory tier is consulted first, then the table store (resolving a
//!   blob pointer when the body overflowed);
//! - a fresh entry is returned without contacting the origin;
//! - a stale entry is revalidated with `if-none-match`/`if-modified-since`,
//!   attached only when the stored value is usable;
//! - a failed refresh extends the stale entry by the configured grace period
//!   and serves it as degraded;
//! - results are written blob first, then table, then memory.

use crate::cache::codec::{generate_entity_tag, EntryCodec};
use crate::cache::config::CacheDataConfig;
use crate::cache::entry::{BodyUpdate, CacheEntry, EntryUpdate};
use crate::cache::expiration::{compute_expiration, http_date};
use crate::cache::facade::CacheFacade;
use crate::cache::headers::{HeaderValue, Headers};
use crate::cache::key::CacheKey;
use crate::cache::profile::CacheProfile;
use crate::cache::store::{MemoryCache, MemoryLookup};
use crate::cache::types::{CacheStatus, CacheTier};
use crate::error::{CacheError, Result};
use crate::fetch::{Connection, DataFetcher, FetchResponse};
use crate::storage::{BlobStore, TableStore};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-call knobs
#[derive(Debug, Clone, Copy, Default)]
pub struct LookupOptions {
    /// Skip the cached entry and fetch without conditional headers
    pub force_refresh: bool,

    /// Clock override in epoch seconds; the system clock when `None`
    pub now: Option<i64>,
}

impl LookupOptions {
    pub fn at(now: i64) -> Self {
        Self {
            now: Some(now),
            ..Default::default()
        }
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }
}

/// The read-through cache in front of a data-access function.
///
/// Built once per process and shared (`Arc`) by every invocation.
pub struct CacheableDataAccess {
    config: Arc<CacheDataConfig>,
    codec: EntryCodec,
    memory: MemoryCache,
    table: Arc<dyn TableStore>,
    blob: Arc<dyn BlobStore>,
}

/// How a fetch attempt ended
enum FetchOutcome {
    NotModified(FetchResponse),
    Fresh(FetchResponse),
    Failed(CacheError),
}

impl CacheableDataAccess {
    pub fn new(
        config: CacheDataConfig,
        table: Arc<dyn TableStore>,
        blob: Arc<dyn BlobStore>,
    ) -> Result<Self> {
        config.validate()?;
        let codec = EntryCodec::from_config(&config)?;
        let memory = MemoryCache::new(config.memory.clone());

        info!(
            table = %config.table_name,
            bucket = %config.bucket_name,
            memory_tier = config.memory.enabled,
            "Initialized cacheable data access"
        );

        Ok(Self {
            config: Arc::new(config),
            codec,
            memory,
            table,
            blob,
        })
    }

    pub fn config(&self) -> &CacheDataConfig {
        &self.config
    }

    /// The process-local tier, e.g. for statistics
    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    /// Cache key this instance derives for `connection`
    pub fn key_for(&self, connection: &Connection) -> Result<CacheKey> {
        CacheKey::derive(
            connection,
            self.config.digest_algorithm,
            self.config.key_salt.as_deref(),
        )
    }

    /// Serve `connection` through the cache using the system clock
    pub async fn get_data<F>(
        &self,
        profile: &CacheProfile,
        fetcher: &F,
        connection: Connection,
    ) -> Result<CacheFacade>
    where
        F: DataFetcher + ?Sized,
    {
        self.get_data_with(profile, fetcher, connection, LookupOptions::default())
            .await
    }

    /// Serve `connection` through the cache.
    ///
    /// Fails only when nothing is cached and the fetch fails; every other
    /// failure is absorbed and logged.
    pub async fn get_data_with<F>(
        &self,
        profile: &CacheProfile,
        fetcher: &F,
        connection: Connection,
        options: LookupOptions,
    ) -> Result<CacheFacade>
    where
        F: DataFetcher + ?Sized,
    {
        profile.validate()?;
        let now = options.now.unwrap_or_else(|| Utc::now().timestamp());
        let key = self.key_for(&connection)?;

        let cached = self.lookup(&key, now).await;

        if let Some((entry, tier)) = &cached {
            if !options.force_refresh && !entry.is_expired(now) {
                info!(key = %key, profile = %profile.name, tier = %tier, status = %CacheStatus::Cached, "Serving fresh entry");
                return Ok(CacheFacade::new(entry.clone(), CacheStatus::Cached, *tier));
            }
        }

        let mut request = connection;
        if let (Some((entry, _)), false) = (&cached, options.force_refresh) {
            let etag = request.attach_header("if-none-match", entry.headers.get("etag"));
            let modified =
                request.attach_header("if-modified-since", entry.headers.get("last-modified"));
            debug!(key = %key, if_none_match = etag, if_modified_since = modified, "Revalidating stale entry");
        } else {
            debug!(key = %key, force_refresh = options.force_refresh, "Fetching from origin");
        }

        let outcome = match fetcher.fetch(request).await {
            Ok(response) if response.is_not_modified() && cached.is_some() => {
                FetchOutcome::NotModified(response)
            }
            Ok(response) if response.is_not_modified() => FetchOutcome::Failed(CacheError::fetch(
                Some(304),
                "origin answered not modified but nothing is cached",
            )),
            Ok(response) if response.success => FetchOutcome::Fresh(response),
            Ok(response) => FetchOutcome::Failed(CacheError::fetch(
                Some(response.status_code),
                format!("origin returned status {}", response.status_code),
            )),
            Err(err @ CacheError::FetchFailure { .. }) => FetchOutcome::Failed(err),
            Err(err) => FetchOutcome::Failed(CacheError::fetch(err.upstream_status(), err.to_string())),
        };

        let mut facade = match outcome {
            FetchOutcome::NotModified(response) => {
                let Some((entry, tier)) = cached else {
                    return Err(CacheError::fetch(Some(304), "nothing cached to revalidate"));
                };
                let update = self.not_modified_update(profile, &entry, &response, now);
                let mut facade = CacheFacade::new(entry, CacheStatus::Cached, tier);
                facade.update(update, CacheStatus::OriginalNotModified);
                facade
            }
            FetchOutcome::Fresh(response) => {
                self.fresh_result(profile, &key, cached, response, now)
            }
            FetchOutcome::Failed(err) => match cached {
                Some((entry, tier)) if err.is_recoverable() => {
                    warn!(
                        key = %key,
                        profile = %profile.name,
                        error = %err,
                        grace_seconds = self.config.stale_grace_seconds,
                        "Refresh failed, serving stale entry"
                    );
                    let mut facade = CacheFacade::new(entry, CacheStatus::Cached, tier);
                    facade.extend_expires(self.config.stale_grace_seconds, now, err.upstream_status());
                    facade
                }
                _ => {
                    warn!(key = %key, profile = %profile.name, error = %err, "Fetch failed with nothing to serve");
                    return Err(err);
                }
            },
        };

        if let Some(entry) = facade.entry_mut() {
            entry.in_blob_store = self.persist(entry, now).await;
        }

        info!(
            key = %key,
            profile = %profile.name,
            tier = %facade.tier(),
            status = %facade.status(),
            "Data access complete"
        );
        Ok(facade)
    }

    /// Memory tier, then durable storage. Read and decode problems count as
    /// a miss. A stale memory copy is the fallback when the durable tier has
    /// nothing newer.
    async fn lookup(&self, key: &CacheKey, now: i64) -> Option<(CacheEntry, CacheTier)> {
        let local = match self.memory.lookup(key, now).await {
            MemoryLookup::Fresh(entry) => return Some((entry, CacheTier::Memory)),
            MemoryLookup::Stale(entry) => Some((entry, CacheTier::Memory)),
            MemoryLookup::Miss => None,
        };

        match self.read_durable(key, now).await {
            Ok(Some(entry)) => {
                debug!(key = %key, expired = entry.is_expired(now), "Durable tier hit");
                if let Some((stale, tier)) = local {
                    if stale.expires_at > entry.expires_at {
                        return Some((stale, tier));
                    }
                }
                if !entry.is_expired(now) {
                    self.memory.insert(entry.clone(), now).await;
                }
                Some((entry, CacheTier::Durable))
            }
            Ok(None) => {
                debug!(key = %key, stale_local = local.is_some(), "Durable tier miss");
                local
            }
            Err(err) if err.is_miss() => {
                warn!(key = %key, error = %err, "Discarding unusable record");
                local
            }
            Err(err) => {
                warn!(
                    key = %key,
                    error = %err,
                    stale_local = local.is_some(),
                    "Durable lookup failed, treating as miss"
                );
                local
            }
        }
    }

    async fn read_durable(&self, key: &CacheKey, now: i64) -> Result<Option<CacheEntry>> {
        let Some(record) = self.table.read(key).await? else {
            return Ok(None);
        };

        if now >= record.purge_at {
            debug!(key = %key, purge_at = record.purge_at, "Record past purge horizon");
            return Ok(None);
        }

        let blob = match record.blob_pointer() {
            Some(pointer) => Some(self.blob.read(pointer).await?.ok_or_else(|| {
                CacheError::NotFound(format!("blob object {} not found", pointer))
            })?),
            None => None,
        };

        self.codec.decode(&record, blob.as_deref()).map(Some)
    }

    /// Blob first, then table, then memory. Returns whether the body lives in
    /// the blob store. Failures are logged and never surface.
    async fn persist(&self, entry: &CacheEntry, now: i64) -> bool {
        let encoded = match self.codec.encode(entry) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(key = %entry.key, error = %err, "Could not encode entry, not persisting");
                return entry.in_blob_store;
            }
        };
        let in_blob_store = encoded.record.data.in_blob_store;

        let mut table_write = true;
        if let Some(blob) = encoded.blob {
            if let Err(err) = self.blob.write(&blob.key, blob.bytes).await {
                warn!(key = %entry.key, blob_key = %blob.key, error = %err, "Blob write failed, skipping table write");
                table_write = false;
            }
        }

        if table_write {
            match self.table.write(encoded.record).await {
                Ok(()) => debug!(key = %entry.key, in_blob_store, "Persisted entry"),
                Err(err) => warn!(key = %entry.key, error = %err, "Table write failed"),
            }
        }

        let mut local = entry.clone();
        local.in_blob_store = in_blob_store;
        self.memory.insert(local, now).await;

        in_blob_store
    }

    fn not_modified_update(
        &self,
        profile: &CacheProfile,
        entry: &CacheEntry,
        response: &FetchResponse,
        now: i64,
    ) -> EntryUpdate {
        let origin = Headers::from_pairs(&response.headers);
        let expires_at = compute_expiration(profile, now, &origin, self.config.time_zone);

        let mut headers = origin.retain_allowed(&profile.headers_to_retain);
        copy_validators(&origin, &mut headers);

        EntryUpdate {
            body: BodyUpdate::Keep,
            headers,
            status_code: entry.status_code,
            expires_at,
            purge_at: expires_at + self.config.purge_after_seconds(),
            classification: profile.classification,
        }
    }

    fn fresh_result(
        &self,
        profile: &CacheProfile,
        key: &CacheKey,
        previous: Option<(CacheEntry, CacheTier)>,
        response: FetchResponse,
        now: i64,
    ) -> CacheFacade {
        let origin = Headers::from_pairs(&response.headers);
        let expires_at = compute_expiration(profile, now, &origin, self.config.time_zone);
        let purge_at = expires_at + self.config.purge_after_seconds();

        let previous_entry = previous.as_ref().map(|(entry, _)| entry);
        let body_changed = previous_entry.map_or(true, |entry| entry.body != response.body);
        let had_etag = previous_entry.is_some_and(|entry| entry.headers.contains("etag"));

        let mut headers = origin.retain_allowed(&profile.headers_to_retain);
        copy_validators(&origin, &mut headers);

        if !headers.contains("etag") && (body_changed || !had_etag) {
            if let Some(body) = &response.body {
                headers.insert_text("etag", &generate_entity_tag(body));
            }
        }
        if !headers.contains("last-modified") && body_changed {
            if let Some(date) = http_date(now).and_then(HeaderValue::text) {
                headers.insert("last-modified", date);
            }
        }

        match previous {
            Some((entry, tier)) => {
                let update = EntryUpdate {
                    body: BodyUpdate::Replace(response.body),
                    headers,
                    status_code: response.status_code,
                    expires_at,
                    purge_at,
                    classification: profile.classification,
                };
                let mut facade = CacheFacade::new(entry, CacheStatus::Cached, tier);
                facade.update(update, CacheStatus::Original);
                facade
            }
            None => {
                let entry = CacheEntry::new(
                    key.clone(),
                    response.body,
                    headers,
                    response.status_code,
                    profile.classification,
                    expires_at,
                    purge_at,
                );
                CacheFacade::new(entry, CacheStatus::Original, CacheTier::Origin)
            }
        }
    }
}

/// Validators are always kept for revalidation, whatever the allow-list says
fn copy_validators(origin: &Headers, headers: &mut Headers) {
    for name in ["etag", "last-modified"] {
        if let Some(value) = origin.get(name) {
            headers.insert(name, value.clone());
        }
    }
}
