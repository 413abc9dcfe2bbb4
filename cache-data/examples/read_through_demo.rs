//! Read-Through Cache Demo
//!
//! Walks one request through a miss, a fresh hit, a revalidation and a
//! degraded refresh using the in-memory stores.
//!
//! Usage:
//!   cargo run --example read_through_demo
//!
//! Environment variables:
//!   RUST_LOG - log filter (default: cache_data=debug,read_through_demo=info)

use cache_data::storage::{InMemoryBlobStore, InMemoryTableStore};
use cache_data::{
    CacheDataConfig, CacheError, CacheProfile, CacheableDataAccess, Connection, FetchResponse,
    LookupOptions,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "cache_data=debug,read_through_demo=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("=== Read-Through Cache Demo ===");

    let config = CacheDataConfig::builder()
        .table_name("demo-cache")
        .bucket_name("demo-cache-overflow")
        .stale_grace_seconds(60)
        .use_in_memory(true)
        .build()?;

    let access = CacheableDataAccess::new(
        config,
        Arc::new(InMemoryTableStore::new()),
        Arc::new(InMemoryBlobStore::new()),
    )?;

    let profile = CacheProfile::new("forecast", 300).retain_headers(["content-type"]);

    // Origin: answers 200, then 304 when revalidated, then fails
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let fetcher = move |connection: Connection| {
        let call = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            info!(path = %connection.path, headers = ?connection.headers, "Origin called");
            match call {
                0 => Ok(FetchResponse::ok(r#"{"temp": 21, "sky": "clear"}"#)
                    .with_header("Content-Type", "application/json")),
                1 => Ok(FetchResponse::not_modified()),
                _ => Err(CacheError::fetch(Some(503), "upstream unavailable")),
            }
        }
    };

    let connection = Connection::get("weather.example.com", "/v1/forecast")
        .parameter("city", "chicago")
        .parameter("units", "metric");

    for (label, now) in [
        ("cold miss", 1_000),
        ("fresh hit", 1_100),
        ("stale, revalidated", 1_400),
        ("stale, origin down", 1_800),
    ] {
        let result = access
            .get_data_with(&profile, &fetcher, connection.clone(), LookupOptions::at(now))
            .await?;

        info!(
            step = label,
            status = %result.status(),
            tier = %result.tier(),
            expires_at = ?result.expires_at(),
            etag = ?result.etag(),
            "Result"
        );
    }

    info!("Origin calls: {}", calls.load(Ordering::SeqCst));
    info!("Memory tier: {}", access.memory().stats().await);

    Ok(())
}
