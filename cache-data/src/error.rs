//! Error types for cache operations
//!
//! This module defines the error taxonomy shared by the storage adapters,
//! the entry codec and the orchestrator. Storage SDK errors never leak past
//! this boundary: adapters translate them into [`CacheError::StorageUnavailable`].

use std::fmt;
use thiserror::Error;

/// Which durable tier a storage error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// Durable key-value store holding the cache records
    Table,
    /// Durable object store holding overflowed bodies
    Blob,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Table => write!(f, "table store"),
            StoreKind::Blob => write!(f, "blob store"),
        }
    }
}

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// A table or blob store call failed or timed out
    #[error("Storage unavailable ({store}): {message}")]
    StorageUnavailable { store: StoreKind, message: String },

    /// A persisted record could not be turned back into an entry
    #[error("Decode failure: {0}")]
    DecodeFailure(String),

    /// The fetch collaborator failed or reported `success == false`
    #[error("Fetch failure: {message}")]
    FetchFailure {
        status_code: Option<u16>,
        message: String,
    },

    /// No entry, or a pointer without a target
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Encrypting a body failed
    #[error("Encryption error: {0}")]
    EncryptionError(String),
}

impl CacheError {
    /// Build a storage error for the given tier
    pub fn storage(store: StoreKind, message: impl Into<String>) -> Self {
        CacheError::StorageUnavailable {
            store,
            message: message.into(),
        }
    }

    /// Build a fetch failure, optionally carrying the upstream status code
    pub fn fetch(status_code: Option<u16>, message: impl Into<String>) -> Self {
        CacheError::FetchFailure {
            status_code,
            message: message.into(),
        }
    }

    /// Status code reported by the upstream, when the failure carried one
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            CacheError::FetchFailure { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Whether a stale entry may be served in place of this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CacheError::StorageUnavailable { .. } | CacheError::FetchFailure { .. }
        )
    }

    /// Whether a lookup hitting this error should be treated as a miss
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::DecodeFailure(_) | CacheError::NotFound(_))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::SerializationError(err.to_string())
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;
