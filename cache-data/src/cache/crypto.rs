//! Encryption of private bodies at rest (AES-256-GCM)

use crate::error::{CacheError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const NONCE_LEN: usize = 12;

/// Encryption algorithm applied to private entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
}

impl FromStr for EncryptionAlgorithm {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-256-gcm" | "aes256gcm" => Ok(EncryptionAlgorithm::Aes256Gcm),
            other => Err(CacheError::ConfigError(format!(
                "unsupported encryption algorithm: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionAlgorithm::Aes256Gcm => write!(f, "aes-256-gcm"),
        }
    }
}

/// 256-bit key for private entries; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct SecureDataKey([u8; 32]);

impl SecureDataKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse the 64-character hex form stored in the parameter store
    pub fn from_hex(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| CacheError::ConfigError(format!("secure data key is not hex: {}", e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            CacheError::ConfigError("secure data key must be 32 bytes (64 hex chars)".to_string())
        })?;
        Ok(Self(bytes))
    }

    /// Generate a random key, e.g. to seed a parameter store
    pub fn generate() -> Self {
        Self(rand::random())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for SecureDataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureDataKey([redacted])")
    }
}

/// Ciphertext and nonce, hex encoded for storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBody {
    pub nonce: String,
    pub ciphertext: String,
}

/// Process-wide cipher built once from the configured key
#[derive(Clone)]
pub struct DataCipher {
    cipher: Aes256Gcm,
    algorithm: EncryptionAlgorithm,
}

impl DataCipher {
    pub fn new(algorithm: EncryptionAlgorithm, key: &SecureDataKey) -> Result<Self> {
        let cipher = match algorithm {
            EncryptionAlgorithm::Aes256Gcm => Aes256Gcm::new_from_slice(&key.0)
                .map_err(|e| CacheError::ConfigError(format!("invalid secure data key: {}", e)))?,
        };
        Ok(Self { cipher, algorithm })
    }

    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<EncryptedBody> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CacheError::EncryptionError(format!("encryption failed: {}", e)))?;

        Ok(EncryptedBody {
            nonce: hex::encode(nonce_bytes),
            ciphertext: hex::encode(ciphertext),
        })
    }

    pub fn decrypt(&self, body: &EncryptedBody) -> Result<String> {
        let nonce_bytes = hex::decode(&body.nonce)
            .map_err(|e| CacheError::DecodeFailure(format!("invalid nonce encoding: {}", e)))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CacheError::DecodeFailure(format!(
                "nonce must be {} bytes, got {}",
                NONCE_LEN,
                nonce_bytes.len()
            )));
        }
        let ciphertext = hex::decode(&body.ciphertext)
            .map_err(|e| CacheError::DecodeFailure(format!("invalid ciphertext encoding: {}", e)))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|e| CacheError::DecodeFailure(format!("decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| CacheError::DecodeFailure(format!("invalid UTF-8: {}", e)))
    }
}

impl fmt::Debug for DataCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataCipher")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
