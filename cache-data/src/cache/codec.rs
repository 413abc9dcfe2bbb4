//! Entry codec: `CacheEntry` ⇄ table record (+ optional blob object)

use crate::cache::config::CacheDataConfig;
use crate::cache::crypto::DataCipher;
use crate::cache::entry::CacheEntry;
use crate::cache::headers::Headers;
use crate::cache::key::CacheKey;
use crate::error::{CacheError, Result};
use crate::storage::{BlobObject, RecordData, StoredBody, TableRecord};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Quoted SHA-256 hex digest of a body, used when the origin sends no `etag`
pub fn generate_entity_tag(body: &str) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(body.as_bytes())))
}

/// A record ready for the table store, plus the blob to write first if the
/// body overflowed
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedEntry {
    pub record: TableRecord,
    pub blob: Option<BlobObject>,
}

/// Converts entries to and from their persisted form
#[derive(Debug, Clone)]
pub struct EntryCodec {
    cipher: Option<DataCipher>,
    max_inline_bytes: usize,
    blob_key_prefix: String,
}

impl EntryCodec {
    pub fn new(cipher: Option<DataCipher>, max_inline_bytes: usize, blob_key_prefix: impl Into<String>) -> Self {
        Self {
            cipher,
            max_inline_bytes,
            blob_key_prefix: blob_key_prefix.into(),
        }
    }

    /// Build the codec described by the process configuration
    pub fn from_config(config: &CacheDataConfig) -> Result<Self> {
        let cipher = config
            .secure_data_key
            .as_ref()
            .map(|key| DataCipher::new(config.encryption_algorithm, key))
            .transpose()?;
        Ok(Self::new(cipher, config.max_inline_bytes, config.blob_key_prefix.clone()))
    }

    pub fn max_inline_bytes(&self) -> usize {
        self.max_inline_bytes
    }

    /// Object key under which an overflowed body of `key` is stored
    pub fn blob_key_for(&self, key: &CacheKey) -> String {
        let prefix = self.blob_key_prefix.trim_end_matches('/');
        if prefix.is_empty() {
            format!("{}.json", key)
        } else {
            format!("{}/{}.json", prefix, key)
        }
    }

    /// Encode an entry. Private bodies are encrypted; when the resulting
    /// record is larger than the inline limit the sealed body is moved to a
    /// blob object and replaced by a pointer.
    pub fn encode(&self, entry: &CacheEntry) -> Result<EncodedEntry> {
        let sealed = entry.body.as_deref().map(|body| self.seal(entry, body)).transpose()?;

        let mut record = TableRecord {
            key: entry.key.clone(),
            expires_at: entry.expires_at,
            purge_at: entry.purge_at.max(entry.expires_at),
            data: RecordData {
                body: sealed,
                headers: entry.headers.to_raw(),
                status_code: entry.status_code,
                error_code: entry.error_code,
                classification: entry.classification,
                in_blob_store: false,
            },
        };

        let inline_size = serde_json::to_vec(&record)?.len();
        if inline_size <= self.max_inline_bytes {
            return Ok(EncodedEntry { record, blob: None });
        }

        let Some(body) = record.data.body.take() else {
            // Nothing to move out; headers alone are over the limit
            return Ok(EncodedEntry { record, blob: None });
        };

        let blob_key = self.blob_key_for(&entry.key);
        debug!(
            key = %entry.key,
            size = inline_size,
            limit = self.max_inline_bytes,
            "Record exceeds inline limit, moving body to blob store"
        );

        let blob = BlobObject {
            key: blob_key.clone(),
            bytes: serde_json::to_vec(&body)?,
        };
        record.data.body = Some(StoredBody::Pointer { blob_key });
        record.data.in_blob_store = true;

        Ok(EncodedEntry {
            record,
            blob: Some(blob),
        })
    }

    /// Decode a record, with the bytes of its blob object when it points to one.
    ///
    /// A pointer without the flag (or the reverse), a missing blob, a body
    /// that cannot be decrypted or a private body stored in clear are all
    /// `DecodeFailure`.
    pub fn decode(&self, record: &TableRecord, blob: Option<&[u8]>) -> Result<CacheEntry> {
        let data = &record.data;

        let stored = match (data.in_blob_store, &data.body) {
            (true, Some(StoredBody::Pointer { blob_key })) => {
                let bytes = blob.ok_or_else(|| {
                    CacheError::DecodeFailure(format!("blob object {} is missing", blob_key))
                })?;
                let stored: StoredBody = serde_json::from_slice(bytes).map_err(|e| {
                    CacheError::DecodeFailure(format!("blob object {} is unreadable: {}", blob_key, e))
                })?;
                if matches!(stored, StoredBody::Pointer { .. }) {
                    return Err(CacheError::DecodeFailure(format!(
                        "blob object {} holds another pointer",
                        blob_key
                    )));
                }
                Some(stored)
            }
            (true, _) => {
                return Err(CacheError::DecodeFailure(
                    "record is flagged as stored in blob but has no pointer".to_string(),
                ))
            }
            (false, Some(StoredBody::Pointer { .. })) => {
                return Err(CacheError::DecodeFailure(
                    "record has a blob pointer but is not flagged as stored in blob".to_string(),
                ))
            }
            (false, body) => body.clone(),
        };

        let body = stored.map(|stored| self.open(record, stored)).transpose()?;

        Ok(CacheEntry {
            key: record.key.clone(),
            body,
            headers: Headers::from_raw(&data.headers),
            status_code: data.status_code,
            error_code: data.error_code,
            expires_at: record.expires_at,
            purge_at: record.purge_at.max(record.expires_at),
            classification: data.classification,
            in_blob_store: data.in_blob_store,
        })
    }

    fn seal(&self, entry: &CacheEntry, body: &str) -> Result<StoredBody> {
        if !entry.classification.requires_encryption() {
            return Ok(StoredBody::Text {
                value: body.to_string(),
            });
        }
        let cipher = self.cipher.as_ref().ok_or_else(|| {
            CacheError::EncryptionError(format!(
                "entry {} is private but no secure data key is configured",
                entry.key
            ))
        })?;
        Ok(StoredBody::Encrypted(cipher.encrypt(body)?))
    }

    fn open(&self, record: &TableRecord, stored: StoredBody) -> Result<String> {
        match stored {
            StoredBody::Text { .. } if record.data.classification.requires_encryption() => {
                Err(CacheError::DecodeFailure(format!(
                    "private entry {} is stored unencrypted",
                    record.key
                )))
            }
            StoredBody::Text { value } => Ok(value),
            StoredBody::Encrypted(sealed) => {
                let cipher = self.cipher.as_ref().ok_or_else(|| {
                    CacheError::DecodeFailure(format!(
                        "entry {} is encrypted but no secure data key is configured",
                        record.key
                    ))
                })?;
                cipher.decrypt(&sealed)
            }
            StoredBody::Pointer { blob_key } => Err(CacheError::DecodeFailure(format!(
                "unresolved blob pointer {}",
                blob_key
            ))),
        }
    }
}
