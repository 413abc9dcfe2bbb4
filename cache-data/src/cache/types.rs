//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistics for the process-local tier
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Number of entries currently in cache
    pub entries: usize,

    /// Total approximate size of cached entries in bytes
    pub size_bytes: usize,

    /// Number of evictions due to count or size limits
    pub evictions_size: u64,

    /// Number of entries dropped because they had expired
    pub evictions_ttl: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate total evictions
    pub fn total_evictions(&self) -> u64 {
        self.evictions_size + self.evictions_ttl
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, entries: {}, size: {} bytes, evictions: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.entries,
            self.size_bytes,
            self.total_evictions()
        )
    }
}

/// Public/private designation of an entry; private entries are encrypted at rest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    #[default]
    Public,
    Private,
}

impl Classification {
    pub fn requires_encryption(&self) -> bool {
        matches!(self, Classification::Private)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Public => write!(f, "public"),
            Classification::Private => write!(f, "private"),
        }
    }
}

/// Where the data handed back to the caller was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTier {
    /// Process-local memory tier
    Memory,

    /// Table store (and blob store for overflowed bodies)
    Durable,

    /// Fetched from the upstream origin during this call
    Origin,
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheTier::Memory => write!(f, "memory"),
            CacheTier::Durable => write!(f, "durable"),
            CacheTier::Origin => write!(f, "origin"),
        }
    }
}

/// Outcome of one orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    /// Fresh entry served without contacting the origin
    Cached,

    /// Full body fetched from the origin
    Original,

    /// Origin confirmed the cached body is still current
    OriginalNotModified,

    /// Refresh failed; the stale entry was extended and served
    Degraded,
}

impl CacheStatus {
    /// Whether the origin was contacted successfully during the run
    pub fn from_origin(&self) -> bool {
        matches!(self, CacheStatus::Original | CacheStatus::OriginalNotModified)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStatus::Cached => write!(f, "cache"),
            CacheStatus::Original => write!(f, "original"),
            CacheStatus::OriginalNotModified => write!(f, "original:not-modified"),
            CacheStatus::Degraded => write!(f, "cache:degraded"),
        }
    }
}
