//! Process-wide configuration
//!
//! Built once at cold start, either through [`CacheDataConfig::builder`] or
//! from the environment with [`CacheDataConfig::from_env`], then handed to
//! [`CacheableDataAccess::new`](crate::cache::access::CacheableDataAccess::new).

use crate::cache::crypto::{EncryptionAlgorithm, SecureDataKey};
use crate::cache::key::DigestAlgorithm;
use crate::error::{CacheError, Result};
use chrono_tz::Tz;
use std::str::FromStr;

pub const ENV_TABLE_NAME: &str = "CACHE_DATA_TABLE_NAME";
pub const ENV_BUCKET_NAME: &str = "CACHE_DATA_BUCKET_NAME";
pub const ENV_BLOB_KEY_PREFIX: &str = "CACHE_DATA_BLOB_KEY_PREFIX";
pub const ENV_ID_HASH_ALGORITHM: &str = "CACHE_DATA_ID_HASH_ALGORITHM";
pub const ENV_ID_HASH_SALT: &str = "CACHE_DATA_ID_HASH_SALT";
pub const ENV_SECURE_DATA_ALGORITHM: &str = "CACHE_DATA_SECURE_DATA_ALGORITHM";
pub const ENV_SECURE_DATA_KEY: &str = "CACHE_DATA_SECURE_DATA_KEY";
pub const ENV_MAX_INLINE_KB: &str = "CACHE_DATA_MAX_INLINE_KB";
pub const ENV_PURGE_EXPIRED_AFTER_HOURS: &str = "CACHE_DATA_PURGE_EXPIRED_AFTER_HOURS";
pub const ENV_TIME_ZONE_FOR_INTERVAL: &str = "CACHE_DATA_TIME_ZONE_FOR_INTERVAL";
pub const ENV_STALE_GRACE_SECONDS: &str = "CACHE_DATA_STALE_GRACE_SECONDS";
pub const ENV_USE_IN_MEMORY: &str = "CACHE_DATA_USE_IN_MEMORY";
pub const ENV_IN_MEMORY_MAX_ENTRIES: &str = "CACHE_DATA_IN_MEMORY_MAX_ENTRIES";
pub const ENV_IN_MEMORY_MAX_MB: &str = "CACHE_DATA_IN_MEMORY_MAX_MB";

const DEFAULT_BLOB_KEY_PREFIX: &str = "cache";
const DEFAULT_MAX_INLINE_BYTES: usize = 400 * 1024;
const DEFAULT_PURGE_EXPIRED_AFTER_HOURS: u64 = 24;
const DEFAULT_MEMORY_MAX_ENTRIES: usize = 1_000;
const DEFAULT_MEMORY_MAX_SIZE_BYTES: usize = 64 * 1024 * 1024;

/// Settings of the process-local tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTierConfig {
    /// Off by default; every lookup misses and inserts are ignored
    pub enabled: bool,
    pub max_entries: usize,
    pub max_size_bytes: usize,
}

impl Default for MemoryTierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_entries: DEFAULT_MEMORY_MAX_ENTRIES,
            max_size_bytes: DEFAULT_MEMORY_MAX_SIZE_BYTES,
        }
    }
}

/// Configuration shared by every invocation of a warm process
#[derive(Debug, Clone)]
pub struct CacheDataConfig {
    /// Table holding one record per cache key
    pub table_name: String,

    /// Bucket receiving overflowed bodies
    pub bucket_name: String,

    /// Prefix of blob object keys
    pub blob_key_prefix: String,

    pub digest_algorithm: DigestAlgorithm,

    /// Mixed into every key so deployments never share entries by accident
    pub key_salt: Option<String>,

    pub encryption_algorithm: EncryptionAlgorithm,

    /// Required as soon as a private profile is used
    pub secure_data_key: Option<SecureDataKey>,

    /// Records whose serialized size exceeds this move their body to the blob store
    pub max_inline_bytes: usize,

    /// How long after expiry the durable store may reclaim a record
    pub purge_expired_after_hours: u64,

    /// Zone in which interval expirations are aligned
    pub time_zone: Tz,

    /// Extension granted to a stale entry when a refresh fails
    pub stale_grace_seconds: u64,

    pub memory: MemoryTierConfig,
}

impl CacheDataConfig {
    pub fn builder() -> CacheDataConfigBuilder {
        CacheDataConfigBuilder::default()
    }

    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parse the configuration from any name → value lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut builder = Self::builder();

        if let Some(table) = get(ENV_TABLE_NAME) {
            builder = builder.table_name(table);
        }
        if let Some(bucket) = get(ENV_BUCKET_NAME) {
            builder = builder.bucket_name(bucket);
        }
        if let Some(prefix) = get(ENV_BLOB_KEY_PREFIX) {
            builder = builder.blob_key_prefix(prefix);
        }
        if let Some(algorithm) = get(ENV_ID_HASH_ALGORITHM) {
            builder = builder.digest_algorithm(algorithm.parse()?);
        }
        if let Some(salt) = get(ENV_ID_HASH_SALT) {
            builder = builder.key_salt(salt);
        }
        if let Some(algorithm) = get(ENV_SECURE_DATA_ALGORITHM) {
            builder = builder.encryption_algorithm(algorithm.parse()?);
        }
        if let Some(key) = get(ENV_SECURE_DATA_KEY) {
            builder = builder.secure_data_key(SecureDataKey::from_hex(&key)?);
        }
        if let Some(kb) = get(ENV_MAX_INLINE_KB) {
            builder = builder.max_inline_bytes(parse_number::<usize>(ENV_MAX_INLINE_KB, &kb)? * 1024);
        }
        if let Some(hours) = get(ENV_PURGE_EXPIRED_AFTER_HOURS) {
            builder = builder.purge_expired_after_hours(parse_number(ENV_PURGE_EXPIRED_AFTER_HOURS, &hours)?);
        }
        if let Some(zone) = get(ENV_TIME_ZONE_FOR_INTERVAL) {
            builder = builder.time_zone(parse_time_zone(&zone)?);
        }
        if let Some(grace) = get(ENV_STALE_GRACE_SECONDS) {
            builder = builder.stale_grace_seconds(parse_number(ENV_STALE_GRACE_SECONDS, &grace)?);
        }
        if let Some(enabled) = get(ENV_USE_IN_MEMORY) {
            builder = builder.use_in_memory(parse_flag(ENV_USE_IN_MEMORY, &enabled)?);
        }
        if let Some(entries) = get(ENV_IN_MEMORY_MAX_ENTRIES) {
            builder = builder.in_memory_max_entries(parse_number(ENV_IN_MEMORY_MAX_ENTRIES, &entries)?);
        }
        if let Some(mb) = get(ENV_IN_MEMORY_MAX_MB) {
            builder = builder
                .in_memory_max_size_bytes(parse_number::<usize>(ENV_IN_MEMORY_MAX_MB, &mb)? * 1024 * 1024);
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(CacheError::ConfigError("table_name must not be empty".to_string()));
        }

        if self.bucket_name.trim().is_empty() {
            return Err(CacheError::ConfigError("bucket_name must not be empty".to_string()));
        }

        if self.max_inline_bytes == 0 {
            return Err(CacheError::ConfigError(
                "max_inline_bytes must be greater than 0".to_string(),
            ));
        }

        if self.stale_grace_seconds == 0 {
            return Err(CacheError::ConfigError(
                "stale_grace_seconds must be greater than 0".to_string(),
            ));
        }

        if self.memory.enabled && (self.memory.max_entries == 0 || self.memory.max_size_bytes == 0) {
            return Err(CacheError::ConfigError(
                "in-memory tier limits must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Seconds a record outlives its expiry in the durable store
    pub fn purge_after_seconds(&self) -> i64 {
        (self.purge_expired_after_hours * 3600) as i64
    }
}

/// Builder for [`CacheDataConfig`] with validation
#[derive(Debug, Default)]
pub struct CacheDataConfigBuilder {
    table_name: Option<String>,
    bucket_name: Option<String>,
    blob_key_prefix: Option<String>,
    digest_algorithm: Option<DigestAlgorithm>,
    key_salt: Option<String>,
    encryption_algorithm: Option<EncryptionAlgorithm>,
    secure_data_key: Option<SecureDataKey>,
    max_inline_bytes: Option<usize>,
    purge_expired_after_hours: Option<u64>,
    time_zone: Option<Tz>,
    stale_grace_seconds: Option<u64>,
    memory: MemoryTierConfig,
}

impl CacheDataConfigBuilder {
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    pub fn bucket_name(mut self, name: impl Into<String>) -> Self {
        self.bucket_name = Some(name.into());
        self
    }

    pub fn blob_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.blob_key_prefix = Some(prefix.into());
        self
    }

    pub fn digest_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest_algorithm = Some(algorithm);
        self
    }

    pub fn key_salt(mut self, salt: impl Into<String>) -> Self {
        self.key_salt = Some(salt.into());
        self
    }

    pub fn encryption_algorithm(mut self, algorithm: EncryptionAlgorithm) -> Self {
        self.encryption_algorithm = Some(algorithm);
        self
    }

    pub fn secure_data_key(mut self, key: SecureDataKey) -> Self {
        self.secure_data_key = Some(key);
        self
    }

    pub fn max_inline_bytes(mut self, bytes: usize) -> Self {
        self.max_inline_bytes = Some(bytes);
        self
    }

    pub fn purge_expired_after_hours(mut self, hours: u64) -> Self {
        self.purge_expired_after_hours = Some(hours);
        self
    }

    pub fn time_zone(mut self, zone: Tz) -> Self {
        self.time_zone = Some(zone);
        self
    }

    pub fn stale_grace_seconds(mut self, seconds: u64) -> Self {
        self.stale_grace_seconds = Some(seconds);
        self
    }

    /// Enable or disable the process-local tier
    pub fn use_in_memory(mut self, enabled: bool) -> Self {
        self.memory.enabled = enabled;
        self
    }

    pub fn in_memory_max_entries(mut self, max: usize) -> Self {
        self.memory.max_entries = max;
        self
    }

    pub fn in_memory_max_size_bytes(mut self, size: usize) -> Self {
        self.memory.max_size_bytes = size;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<CacheDataConfig> {
        let config = CacheDataConfig {
            table_name: self.table_name.ok_or_else(|| missing(ENV_TABLE_NAME))?,
            bucket_name: self.bucket_name.ok_or_else(|| missing(ENV_BUCKET_NAME))?,
            blob_key_prefix: self
                .blob_key_prefix
                .unwrap_or_else(|| DEFAULT_BLOB_KEY_PREFIX.to_string()),
            digest_algorithm: self.digest_algorithm.unwrap_or_default(),
            key_salt: self.key_salt,
            encryption_algorithm: self.encryption_algorithm.unwrap_or_default(),
            secure_data_key: self.secure_data_key,
            max_inline_bytes: self.max_inline_bytes.unwrap_or(DEFAULT_MAX_INLINE_BYTES),
            purge_expired_after_hours: self
                .purge_expired_after_hours
                .unwrap_or(DEFAULT_PURGE_EXPIRED_AFTER_HOURS),
            time_zone: self.time_zone.unwrap_or(Tz::UTC),
            stale_grace_seconds: self
                .stale_grace_seconds
                .ok_or_else(|| missing(ENV_STALE_GRACE_SECONDS))?,
            memory: self.memory,
        };

        config.validate()?;
        Ok(config)
    }
}

fn missing(name: &str) -> CacheError {
    CacheError::ConfigError(format!("{} is required", name))
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| CacheError::ConfigError(format!("{} is not a valid number: {}", name, value)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(CacheError::ConfigError(format!(
            "{} is not a valid boolean: {}",
            name, value
        ))),
    }
}

fn parse_time_zone(value: &str) -> Result<Tz> {
    value
        .parse::<Tz>()
        .map_err(|e| CacheError::ConfigError(format!("unknown time zone {}: {}", value, e)))
}
