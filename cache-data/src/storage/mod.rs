//! Durable storage adapters
//!
//! Two narrow seams: a key-value [`TableStore`] holding one record per cache
//! key, and an object [`BlobStore`] holding bodies too large to inline. No
//! caching logic lives here. Implementations translate their SDK errors into
//! [`CacheError::StorageUnavailable`](crate::error::CacheError::StorageUnavailable).

pub mod memory;

use crate::cache::crypto::EncryptedBody;
use crate::cache::key::CacheKey;
use crate::cache::types::Classification;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub use memory::{InMemoryBlobStore, InMemoryTableStore};

/// Persisted form of a body. A record holds exactly one of these, so a body
/// can never be half inline and half in the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoredBody {
    /// Plain text body
    Text { value: String },

    /// Body of a private entry
    Encrypted(EncryptedBody),

    /// The body lives in the blob store under `blob_key`
    Pointer { blob_key: String },
}

/// The `data` attribute of a table record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordData {
    #[serde(default)]
    pub body: Option<StoredBody>,

    /// Raw header map; sanitized by the codec on the way out
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,

    pub status_code: u16,

    #[serde(default)]
    pub error_code: Option<u16>,

    #[serde(default)]
    pub classification: Classification,

    #[serde(default)]
    pub in_blob_store: bool,
}

/// One row of the table store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRecord {
    pub key: CacheKey,
    pub expires_at: i64,
    pub purge_at: i64,
    pub data: RecordData,
}

impl TableRecord {
    /// Blob key the body points to, if the record carries a pointer
    pub fn blob_pointer(&self) -> Option<&str> {
        match &self.data.body {
            Some(StoredBody::Pointer { blob_key }) => Some(blob_key),
            _ => None,
        }
    }
}

/// An overflowed body ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobObject {
    pub key: String,
    pub bytes: Vec<u8>,
}

/// Durable key-value store
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Read the record for `key`, `None` if there is none
    async fn read(&self, key: &CacheKey) -> Result<Option<TableRecord>>;

    /// Insert or replace the record for `record.key`
    async fn write(&self, record: TableRecord) -> Result<()>;
}

/// Durable object store
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the object at `key`, `None` if there is none
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Insert or replace the object at `key`
    async fn write(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
}
