//! Binary vault file format and whole-file checksum.
//!
//! A `.vault` file has this layout:
//!
//! ```text
//! [FVLT: 4 bytes][version: 2 bytes LE][header_len: 4 bytes LE][header JSON][records JSON][SHA-256: 32 bytes]
//! ```
//!
//! - **Magic** (`FVLT`): identifies the file as a FaceVault vault.
//! - **Version**: format version (currently `1`).
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the records JSON begins.
//! - **Header JSON**: serialized `VaultHeader`.
//! - **Records JSON**: serialized `Vec<EncryptedRecord>`, in vault order.
//! - **SHA-256**: checksum over every preceding byte.
//!
//! The checksum is unkeyed: it catches truncation and bit rot before any
//! JSON is parsed.  Tampering is caught by the identity wrap, the record
//! tags and signatures, and the manifest signature.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::record::EncryptedRecord;
use crate::crypto::identity::WrappedIdentity;
use crate::crypto::kdf::{MIN_ITERATIONS, MIN_SALT_LEN};
use crate::errors::{VaultError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every vault file.
const MAGIC: &[u8; 4] = b"FVLT";

/// Current binary format version.
pub const CURRENT_VERSION: u16 = 1;

/// Size of the checksum appended to the file (SHA-256 = 32 bytes).
const CHECKSUM_LEN: usize = 32;

/// Fixed-size prefix: 4 (magic) + 2 (version) + 4 (header_len).
const PREFIX_LEN: usize = 10;

/// Smallest byte count that can hold a vault: prefix plus checksum.
pub const MIN_FILE_LEN: usize = PREFIX_LEN + CHECKSUM_LEN;

/// Domain separator for the identity-wrap associated data.
const BINDING_DOMAIN: &[u8] = b"facevault-header:v1";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Metadata stored at the beginning of a vault file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultHeader {
    /// PBKDF2 salt for this vault's password.
    #[serde(with = "crate::encoding::base64_bytes")]
    pub salt: Vec<u8>,

    /// PBKDF2 iteration count used when the salt was chosen.
    pub kdf_iterations: u32,

    /// SEC1 compressed identity public key (not secret).
    #[serde(with = "crate::encoding::base64_bytes")]
    pub public_key: Vec<u8>,

    /// The identity scalar, encrypted under the password-derived key.
    pub wrapped_identity: WrappedIdentity,

    /// Identity signature over the ordered record set.
    #[serde(with = "crate::encoding::base64_bytes")]
    pub manifest_signature: Vec<u8>,

    /// When this vault was first created.
    pub created_at: DateTime<Utc>,

    /// When the password was last rotated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotated_at: Option<DateTime<Utc>>,
}

/// The whole persisted container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vault {
    pub version: u16,
    pub header: VaultHeader,
    pub records: Vec<EncryptedRecord>,
}

impl Vault {
    /// Find a record by id.
    pub fn record(&self, id: &str) -> Option<&EncryptedRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

/// Associated data for the identity wrap.
///
/// Binds the wrapped scalar to the format version, salt, work factor and
/// public key, so none of them can be edited without breaking the unwrap.
pub fn binding_context(version: u16, salt: &[u8], kdf_iterations: u32, public_key: &[u8]) -> Vec<u8> {
    let mut ctx = Vec::with_capacity(BINDING_DOMAIN.len() + 2 + 8 + salt.len() + 4 + 8 + public_key.len());
    ctx.extend_from_slice(BINDING_DOMAIN);
    ctx.extend_from_slice(&version.to_le_bytes());
    ctx.extend_from_slice(&(salt.len() as u64).to_le_bytes());
    ctx.extend_from_slice(salt);
    ctx.extend_from_slice(&kdf_iterations.to_le_bytes());
    ctx.extend_from_slice(&(public_key.len() as u64).to_le_bytes());
    ctx.extend_from_slice(public_key);
    ctx
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// Serialize a vault into its on-disk byte representation.
pub fn encode(vault: &Vault) -> Result<Vec<u8>> {
    let header_bytes = serde_json::to_vec(&vault.header)
        .map_err(|e| VaultError::Serialization(format!("header: {e}")))?;
    let records_bytes = serde_json::to_vec(&vault.records)
        .map_err(|e| VaultError::Serialization(format!("records: {e}")))?;

    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        VaultError::Serialization(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;
    let total = PREFIX_LEN + header_bytes.len() + records_bytes.len() + CHECKSUM_LEN;
    let mut buf = Vec::with_capacity(total);

    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.extend_from_slice(&vault.version.to_le_bytes()); // 2 bytes LE
    buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(&header_bytes); // header JSON
    buf.extend_from_slice(&records_bytes); // records JSON

    let checksum = Sha256::digest(&buf);
    buf.extend_from_slice(&checksum); // 32 bytes

    Ok(buf)
}

/// Parse and validate vault bytes.
///
/// Order of checks: size, magic, checksum, version, then JSON.
pub fn decode(data: &[u8]) -> Result<Vault> {
    if data.len() < MIN_FILE_LEN {
        return Err(VaultError::Format(
            "file too small to be a valid vault".into(),
        ));
    }

    if &data[0..4] != MAGIC {
        return Err(VaultError::Format("missing FVLT magic bytes".into()));
    }

    // --- Whole-file checksum, before anything else is interpreted ---

    let body_end = data.len() - CHECKSUM_LEN;
    let expected = Sha256::digest(&data[..body_end]);
    if expected.as_slice() != &data[body_end..] {
        return Err(VaultError::Integrity);
    }

    // --- Parse the fixed-size prefix ---

    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != CURRENT_VERSION {
        return Err(VaultError::Format(format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let header_len_u32 = u32::from_le_bytes([data[6], data[7], data[8], data[9]]);
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        VaultError::Format(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|end| *end <= body_end)
        .ok_or_else(|| VaultError::Format("header length exceeds file size".into()))?;

    // --- Deserialize the two JSON sections ---

    let header: VaultHeader = serde_json::from_slice(&data[PREFIX_LEN..header_end])
        .map_err(|e| VaultError::Format(format!("header JSON: {e}")))?;

    let records: Vec<EncryptedRecord> = serde_json::from_slice(&data[header_end..body_end])
        .map_err(|e| VaultError::Format(format!("records JSON: {e}")))?;

    validate(&header, &records)?;

    Ok(Vault {
        version,
        header,
        records,
    })
}

/// Structural checks that need no key material.
fn validate(header: &VaultHeader, records: &[EncryptedRecord]) -> Result<()> {
    if header.salt.len() < MIN_SALT_LEN {
        return Err(VaultError::Format(format!(
            "salt shorter than {MIN_SALT_LEN} bytes"
        )));
    }
    if header.kdf_iterations < MIN_ITERATIONS {
        return Err(VaultError::Format(format!(
            "kdf iteration count {} below minimum {MIN_ITERATIONS}",
            header.kdf_iterations
        )));
    }

    let mut seen = std::collections::HashSet::with_capacity(records.len());
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(VaultError::Format(format!(
                "duplicate record id '{}'",
                record.id
            )));
        }
    }
    Ok(())
}
