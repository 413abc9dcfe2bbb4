//! Process-local tier with LRU eviction and memory limits

use crate::cache::{
    config::MemoryTierConfig,
    entry::CacheEntry,
    key::CacheKey,
    types::CacheStats,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// A cached entry together with its bookkeeping; never persisted
#[derive(Debug, Clone)]
pub struct MemoryEntry {
    pub entry: CacheEntry,

    /// Epoch seconds of the last read or write
    pub last_touched: i64,

    /// Approximate footprint counted against `max_size_bytes`
    pub size_bytes: usize,
}

/// Result of a memory tier lookup
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryLookup {
    Fresh(CacheEntry),

    /// Expired but still inside its purge horizon; usable for revalidation
    /// or stale serving
    Stale(CacheEntry),

    Miss,
}

/// Bounded in-process cache shared by invocations of a warm process
///
/// - Thread-safe async access via RwLock
/// - Expired entries kept as stale until their purge horizon
/// - LRU eviction when the entry count or size limit is reached
/// - Disabled instances miss every lookup and ignore inserts
#[derive(Debug, Clone)]
pub struct MemoryCache {
    config: MemoryTierConfig,
    store: Arc<RwLock<CacheStore>>,
}

#[derive(Debug, Default)]
struct CacheStore {
    /// Main storage: key -> entry
    entries: HashMap<CacheKey, MemoryEntry>,

    /// LRU tracking: front is least recently used
    lru_queue: VecDeque<CacheKey>,

    stats: CacheStats,

    current_size_bytes: usize,
}

impl CacheStore {
    fn touch(&mut self, key: &CacheKey) {
        self.lru_queue.retain(|k| k != key);
        self.lru_queue.push_back(key.clone());
    }

    fn remove_entry(&mut self, key: &CacheKey) -> Option<MemoryEntry> {
        let removed = self.entries.remove(key)?;
        self.lru_queue.retain(|k| k != key);
        self.current_size_bytes = self.current_size_bytes.saturating_sub(removed.size_bytes);
        self.refresh_stats();
        Some(removed)
    }

    fn refresh_stats(&mut self) {
        self.stats.entries = self.entries.len();
        self.stats.size_bytes = self.current_size_bytes;
    }
}

impl MemoryCache {
    pub fn new(config: MemoryTierConfig) -> Self {
        if config.enabled {
            info!(
                max_entries = config.max_entries,
                max_size_bytes = config.max_size_bytes,
                "Initializing in-memory cache tier"
            );
        }

        Self {
            config,
            store: Arc::new(RwLock::new(CacheStore::default())),
        }
    }

    /// A tier that never holds anything
    pub fn disabled() -> Self {
        Self::new(MemoryTierConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Look up a non-expired entry
    pub async fn get(&self, key: &CacheKey, now: i64) -> Option<CacheEntry> {
        match self.lookup(key, now).await {
            MemoryLookup::Fresh(entry) => Some(entry),
            MemoryLookup::Stale(_) | MemoryLookup::Miss => None,
        }
    }

    /// Look up an entry, fresh or stale. Entries past their purge horizon
    /// are evicted and reported as a miss.
    pub async fn lookup(&self, key: &CacheKey, now: i64) -> MemoryLookup {
        if !self.config.enabled {
            return MemoryLookup::Miss;
        }

        let mut store = self.store.write().await;

        let (expired, purgeable) = match store.entries.get(key) {
            Some(cached) => (cached.entry.is_expired(now), cached.entry.is_purgeable(now)),
            None => {
                debug!(key = %key, "Memory tier miss");
                store.stats.misses += 1;
                return MemoryLookup::Miss;
            }
        };

        if purgeable {
            debug!(key = %key, "Memory tier entry past purge horizon");
            store.remove_entry(key);
            store.stats.evictions_ttl += 1;
            store.stats.misses += 1;
            return MemoryLookup::Miss;
        }

        store.touch(key);
        let Some(cached) = store.entries.get_mut(key) else {
            return MemoryLookup::Miss;
        };
        cached.last_touched = now;
        let entry = cached.entry.clone();

        if expired {
            debug!(key = %key, "Memory tier entry stale");
            store.stats.misses += 1;
            MemoryLookup::Stale(entry)
        } else {
            debug!(key = %key, "Memory tier hit");
            store.stats.hits += 1;
            MemoryLookup::Fresh(entry)
        }
    }

    /// Insert or replace an entry. Returns whether it was stored.
    pub async fn insert(&self, entry: CacheEntry, now: i64) -> bool {
        if !self.config.enabled {
            return false;
        }

        let size_bytes = entry.calculate_size();
        if size_bytes > self.config.max_size_bytes {
            warn!(
                key = %entry.key,
                size = size_bytes,
                limit = self.config.max_size_bytes,
                "Entry larger than the in-memory tier, not caching"
            );
            return false;
        }

        let key = entry.key.clone();
        let mut store = self.store.write().await;

        if store.remove_entry(&key).is_some() {
            debug!(key = %key, "Replacing memory tier entry");
        }

        self.evict_if_needed(&mut store, size_bytes);

        store.entries.insert(
            key.clone(),
            MemoryEntry {
                entry,
                last_touched: now,
                size_bytes,
            },
        );
        store.lru_queue.push_back(key);
        store.current_size_bytes += size_bytes;
        store.refresh_stats();
        true
    }

    pub async fn remove(&self, key: &CacheKey) -> Option<CacheEntry> {
        let mut store = self.store.write().await;
        store.remove_entry(key).map(|removed| removed.entry)
    }

    /// Check if a key is held, without touching it
    pub async fn contains_key(&self, key: &CacheKey) -> bool {
        self.store.read().await.entries.contains_key(key)
    }

    pub async fn clear(&self) {
        let mut store = self.store.write().await;
        let count = store.entries.len();
        store.entries.clear();
        store.lru_queue.clear();
        store.current_size_bytes = 0;
        store.refresh_stats();
        debug!("Cleared {} entries from memory tier", count);
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats.clone()
    }

    pub async fn size_bytes(&self) -> usize {
        self.store.read().await.current_size_bytes
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.entries.is_empty()
    }

    /// Make room for an entry of `needed_size` bytes
    fn evict_if_needed(&self, store: &mut CacheStore, needed_size: usize) {
        while store.entries.len() >= self.config.max_entries {
            match store.lru_queue.front().cloned() {
                Some(key) => {
                    debug!(key = %key, "Evicting memory tier entry due to max_entries limit");
                    store.remove_entry(&key);
                    store.stats.evictions_size += 1;
                }
                None => break,
            }
        }

        while store.current_size_bytes + needed_size > self.config.max_size_bytes {
            match store.lru_queue.front().cloned() {
                Some(key) => {
                    debug!(key = %key, "Evicting memory tier entry due to size limit");
                    store.remove_entry(&key);
                    store.stats.evictions_size += 1;
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::headers::Headers;
    use crate::cache::types::Classification;

    fn config(max_entries: usize, max_size_bytes: usize) -> MemoryTierConfig {
        MemoryTierConfig {
            enabled: true,
            max_entries,
            max_size_bytes,
        }
    }

    fn entry(key: &str, body: &str, expires_at: i64) -> CacheEntry {
        CacheEntry::new(
            CacheKey::from_raw(key),
            Some(body.to_string()),
            Headers::new(),
            200,
            Classification::Public,
            expires_at,
            expires_at,
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let cache = MemoryCache::new(config(10, 1024 * 1024));
        assert!(cache.insert(entry("a", "value", 2000), 1000).await);

        let hit = cache.get(&CacheKey::from_raw("a"), 1500).await;
        assert_eq!(hit.and_then(|e| e.body).as_deref(), Some("value"));

        assert!(cache.get(&CacheKey::from_raw("b"), 1500).await.is_none());

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!(stats.size_bytes > 0);
    }

    #[tokio::test]
    async fn test_disabled_tier_is_pass_through() {
        let cache = MemoryCache::disabled();
        assert!(!cache.is_enabled());
        assert!(!cache.insert(entry("a", "value", 2000), 1000).await);
        assert!(cache.get(&CacheKey::from_raw("a"), 1000).await.is_none());
        assert_eq!(cache.lookup(&CacheKey::from_raw("a"), 1000).await, MemoryLookup::Miss);
        assert!(cache.is_empty().await);
    }

    fn stale_entry(key: &str, expires_at: i64, purge_at: i64) -> CacheEntry {
        let mut stale = entry(key, "value", expires_at);
        stale.purge_at = purge_at;
        stale
    }

    #[tokio::test]
    async fn test_expired_entry_kept_as_stale() {
        let cache = MemoryCache::new(config(10, 1024 * 1024));
        cache.insert(stale_entry("a", 2000, 5000), 1000).await;

        assert!(cache.get(&CacheKey::from_raw("a"), 2500).await.is_none());
        match cache.lookup(&CacheKey::from_raw("a"), 2500).await {
            MemoryLookup::Stale(found) => assert_eq!(found.body.as_deref(), Some("value")),
            other => panic!("expected stale entry, got {:?}", other),
        }
        assert!(cache.contains_key(&CacheKey::from_raw("a")).await);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.evictions_ttl, 0);
    }

    #[tokio::test]
    async fn test_purgeable_entry_dropped_on_lookup() {
        let cache = MemoryCache::new(config(10, 1024 * 1024));
        cache.insert(entry("a", "value", 2000), 1000).await;

        assert!(cache.get(&CacheKey::from_raw("a"), 2000).await.is_none());
        assert!(!cache.contains_key(&CacheKey::from_raw("a")).await);

        let stats = cache.stats().await;
        assert_eq!(stats.evictions_ttl, 1);
        assert_eq!(stats.entries, 0);
        assert_eq!(cache.size_bytes().await, 0);
    }

    #[tokio::test]
    async fn test_lru_eviction_by_count() {
        let cache = MemoryCache::new(config(2, 1024 * 1024));
        cache.insert(entry("a", "1", 9000), 1000).await;
        cache.insert(entry("b", "2", 9000), 1001).await;

        // touch "a" so "b" becomes least recently used
        assert!(cache.get(&CacheKey::from_raw("a"), 1002).await.is_some());

        cache.insert(entry("c", "3", 9000), 1003).await;
        assert_eq!(cache.len().await, 2);
        assert!(cache.contains_key(&CacheKey::from_raw("a")).await);
        assert!(!cache.contains_key(&CacheKey::from_raw("b")).await);
        assert!(cache.contains_key(&CacheKey::from_raw("c")).await);
        assert_eq!(cache.stats().await.evictions_size, 1);
    }

    #[tokio::test]
    async fn test_eviction_by_size() {
        let one = entry("a", &"x".repeat(1000), 9000).calculate_size();
        let cache = MemoryCache::new(config(100, one * 2 + 10));

        cache.insert(entry("a", &"x".repeat(1000), 9000), 1000).await;
        cache.insert(entry("b", &"x".repeat(1000), 9000), 1000).await;
        cache.insert(entry("c", &"x".repeat(1000), 9000), 1000).await;

        assert_eq!(cache.len().await, 2);
        assert!(!cache.contains_key(&CacheKey::from_raw("a")).await);
        assert!(cache.size_bytes().await <= one * 2 + 10);
    }

    #[tokio::test]
    async fn test_oversized_entry_skipped() {
        let cache = MemoryCache::new(config(10, 64));
        assert!(!cache.insert(entry("a", &"x".repeat(1000), 9000), 1000).await);
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_replace_keeps_size_consistent() {
        let cache = MemoryCache::new(config(10, 1024 * 1024));
        cache.insert(entry("a", "short", 9000), 1000).await;
        cache.insert(entry("a", &"x".repeat(500), 9000), 1001).await;

        assert_eq!(cache.len().await, 1);
        let expected = entry("a", &"x".repeat(500), 9000).calculate_size();
        assert_eq!(cache.size_bytes().await, expected);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let cache = MemoryCache::new(config(10, 1024 * 1024));
        cache.insert(entry("a", "1", 9000), 1000).await;
        cache.insert(entry("b", "2", 9000), 1000).await;

        assert!(cache.remove(&CacheKey::from_raw("a")).await.is_some());
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
        assert_eq!(cache.stats().await.entries, 0);
    }
}
