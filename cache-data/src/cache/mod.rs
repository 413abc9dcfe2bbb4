//! # Read-Through Caching Layer
//!
//! Multi-tier cache placed between a function handler and the data-access
//! function that calls the upstream API.
//!
//! ## Features
//!
//! - **Tiered lookup**: optional process-local tier, then a durable table store
//! - **Body overflow**: large bodies move transparently to a blob store
//! - **Conditional revalidation**: stale entries are refreshed with validators
//! - **Stale serving**: failed refreshes extend and serve the stale entry
//! - **Encryption at rest**: private entries are sealed with AES-256-GCM
//! - **Interval expiration**: expiries aligned to boundaries in a time zone
//!
//! ## Example
//!
//! ```no_run
//! use cache_data::cache::{CacheDataConfig, CacheProfile, CacheableDataAccess};
//! use cache_data::fetch::{Connection, FetchResponse};
//! use cache_data::storage::{InMemoryBlobStore, InMemoryTableStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> cache_data::Result<()> {
//! let config = CacheDataConfig::builder()
//!     .table_name("cache-table")
//!     .bucket_name("cache-bucket")
//!     .stale_grace_seconds(60)
//!     .build()?;
//!
//! let access = CacheableDataAccess::new(
//!     config,
//!     Arc::new(InMemoryTableStore::new()),
//!     Arc::new(InMemoryBlobStore::new()),
//! )?;
//!
//! let profile = CacheProfile::new("forecast", 300).retain_headers(["content-type"]);
//! let fetcher = |_connection: Connection| async move {
//!     Ok::<_, cache_data::CacheError>(FetchResponse::ok(r#"{"temp": 21}"#))
//! };
//!
//! let result = access
//!     .get_data(&profile, &fetcher, Connection::get("api.example.com", "/forecast"))
//!     .await?;
//! println!("{} -> {:?}", result.status(), result.body());
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod entry;
pub mod expiration;
pub mod facade;
pub mod headers;
pub mod key;
pub mod profile;
pub mod store;
pub mod types;

pub use access::{CacheableDataAccess, LookupOptions};
pub use codec::{generate_entity_tag, EncodedEntry, EntryCodec};
pub use config::{CacheDataConfig, CacheDataConfigBuilder, MemoryTierConfig};
pub use crypto::{DataCipher, EncryptedBody, EncryptionAlgorithm, SecureDataKey};
pub use entry::{BodyUpdate, CacheEntry, EntryUpdate};
pub use expiration::compute_expiration;
pub use facade::CacheFacade;
pub use headers::{get_header, is_valid_outgoing_header_value, HeaderValue, Headers, NO_VALUE_TOKEN};
pub use key::{CacheKey, DigestAlgorithm};
pub use profile::CacheProfile;
pub use store::{MemoryCache, MemoryEntry, MemoryLookup};
pub use types::{CacheStats, CacheStatus, CacheTier, Classification};
