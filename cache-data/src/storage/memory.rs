//! In-memory storage adapters for tests and local runs

use super::{BlobStore, TableRecord, TableStore};
use crate::cache::key::CacheKey;
use crate::error::{CacheError, Result, StoreKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Table store backed by a `HashMap`
#[derive(Debug, Default)]
pub struct InMemoryTableStore {
    records: RwLock<HashMap<CacheKey, TableRecord>>,
    unavailable: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StorageUnavailable` until switched back
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn remove(&self, key: &CacheKey) -> Option<TableRecord> {
        self.records.write().await.remove(key)
    }

    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    /// Place a record directly, bypassing the availability switch
    pub async fn insert_raw(&self, record: TableRecord) {
        self.records.write().await.insert(record.key.clone(), record);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CacheError::storage(StoreKind::Table, "table store is unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn read(&self, key: &CacheKey) -> Result<Option<TableRecord>> {
        self.check_available()?;
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn write(&self, record: TableRecord) -> Result<()> {
        self.check_available()?;
        debug!(key = %record.key, "Writing table record");
        self.records.write().await.insert(record.key.clone(), record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Blob store backed by a `HashMap`
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    unavailable: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StorageUnavailable` until switched back
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.write().await.remove(key)
    }

    pub async fn clear(&self) {
        self.objects.write().await.clear();
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CacheError::storage(StoreKind::Blob, "blob store is unavailable"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.check_available()?;
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.check_available()?;
        debug!(key = %key, size = bytes.len(), "Writing blob object");
        self.objects.write().await.insert(key.to_string(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RecordData;
    use std::collections::BTreeMap;

    fn record(key: &str) -> TableRecord {
        TableRecord {
            key: CacheKey::from_raw(key),
            expires_at: 100,
            purge_at: 200,
            data: RecordData {
                body: None,
                headers: BTreeMap::new(),
                status_code: 200,
                error_code: None,
                classification: Default::default(),
                in_blob_store: false,
            },
        }
    }

    #[tokio::test]
    async fn test_table_store_read_write() {
        let store = InMemoryTableStore::new();
        assert!(store.read(&CacheKey::from_raw("a")).await.unwrap().is_none());

        store.write(record("a")).await.unwrap();
        let read = store.read(&CacheKey::from_raw("a")).await.unwrap();
        assert_eq!(read.map(|r| r.expires_at), Some(100));
        assert_eq!(store.len().await, 1);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_table_store_unavailable() {
        let store = InMemoryTableStore::new();
        store.set_available(false);

        let err = store.read(&CacheKey::from_raw("a")).await.unwrap_err();
        assert!(matches!(
            err,
            CacheError::StorageUnavailable {
                store: StoreKind::Table,
                ..
            }
        ));
        assert!(store.write(record("a")).await.is_err());

        store.set_available(true);
        assert!(store.write(record("a")).await.is_ok());
    }

    #[tokio::test]
    async fn test_blob_store_read_write() {
        let store = InMemoryBlobStore::new();
        store.write("cache/a.json", b"hello".to_vec()).await.unwrap();
        assert_eq!(
            store.read("cache/a.json").await.unwrap(),
            Some(b"hello".to_vec())
        );
        assert!(store.read("cache/b.json").await.unwrap().is_none());

        store.set_available(false);
        assert!(store.read("cache/a.json").await.is_err());
    }
}
