//! EncryptedRecord and RecordMetadata types stored inside a vault.
//!
//! All binary fields serialize as base64 strings in JSON.  The timestamps
//! are plain metadata; they are covered by the manifest signature but not
//! by the per-record signature.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{VaultError, Result};

/// Longest record id accepted.
const MAX_ID_LEN: usize = 256;

/// A single encrypted, signed record stored in the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    /// Record key, e.g. a person's name (`"john_doe"`).
    pub id: String,

    /// SEC1 compressed ephemeral public key used for this record's ECDH.
    #[serde(with = "crate::encoding::base64_bytes")]
    pub ephemeral_public_key: Vec<u8>,

    #[serde(with = "crate::encoding::base64_bytes")]
    pub nonce: Vec<u8>,

    #[serde(with = "crate::encoding::base64_bytes")]
    pub ciphertext: Vec<u8>,

    #[serde(with = "crate::encoding::base64_bytes")]
    pub tag: Vec<u8>,

    /// ECDSA signature by the vault identity over the plaintext digest.
    #[serde(with = "crate::encoding::base64_bytes")]
    pub signature: Vec<u8>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Lightweight metadata about a record (no ciphertext).
///
/// Returned by `SecureStore::list_records` so callers can show record ids
/// and timestamps without decrypting anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMetadata {
    pub id: String,
    pub size: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EncryptedRecord {
    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            id: self.id.clone(),
            size: self.ciphertext.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Validate that a record id is safe to store.
///
/// Ids are person-name keys such as `"John Doe"`: any non-empty UTF-8
/// string of at most 256 characters without control characters.
pub fn validate_record_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(VaultError::InvalidRecordId(
            "record id cannot be empty".into(),
        ));
    }
    if id.chars().count() > MAX_ID_LEN {
        return Err(VaultError::InvalidRecordId(format!(
            "record id cannot exceed {MAX_ID_LEN} characters"
        )));
    }
    if id.chars().any(char::is_control) {
        return Err(VaultError::InvalidRecordId(format!(
            "{id:?} contains control characters"
        )));
    }
    Ok(())
}
