//! # cache-data
//!
//! A read-through, multi-tier cache engine for short-lived serverless
//! functions that front slow or rate-limited upstream HTTP APIs.
//!
//! ## Features
//!
//! - Process-local tier (off by default) in front of a durable table store
//! - Oversized bodies routed through a blob store behind a single pointer
//! - Expiration from origin headers, fixed offsets or time-zone aligned intervals
//! - Conditional revalidation that never sends an unusable validator
//! - Degraded stale serving when the origin or a store fails
//! - Encryption at rest for private entries
//!
//! ## Usage
//!
//! ```no_run
//! use cache_data::{CacheDataConfig, CacheProfile, CacheableDataAccess, Connection, FetchResponse};
//! use cache_data::storage::{InMemoryBlobStore, InMemoryTableStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let access = CacheableDataAccess::new(
//!         CacheDataConfig::from_env()?,
//!         Arc::new(InMemoryTableStore::new()),
//!         Arc::new(InMemoryBlobStore::new()),
//!     )?;
//!
//!     let profile = CacheProfile::new("games", 3600).on_interval(true);
//!     let fetcher = |_connection: Connection| async move {
//!         Ok::<_, cache_data::CacheError>(FetchResponse::ok("[]"))
//!     };
//!
//!     let games = access
//!         .get_data(&profile, &fetcher, Connection::get("api.example.com", "/games"))
//!         .await?;
//!     println!("status: {}", games.status());
//!     Ok(())
//! }
//! ```
//!
//! ## Storage
//!
//! The [`storage::TableStore`] and [`storage::BlobStore`] traits are the only
//! seams to durable storage; cloud adapters implement them outside this crate.
//! In-memory implementations are provided for tests and local runs.

pub mod cache;
pub mod error;
pub mod fetch;
pub mod storage;

// Re-export main types for convenience
pub use cache::{
    CacheDataConfig, CacheDataConfigBuilder, CacheEntry, CacheFacade, CacheKey, CacheProfile,
    CacheStats, CacheStatus, CacheTier, CacheableDataAccess, Classification, HeaderValue,
    Headers, LookupOptions, MemoryCache,
};
pub use error::{CacheError, Result, StoreKind};
pub use fetch::{Connection, DataFetcher, FetchResponse, ResponseHook};
