//! Record encryption, signing and verification.
//!
//! Each record is protected twice:
//!
//! 1. **Confidentiality + integrity**: a fresh ephemeral secp256k1 key is
//!    agreed (ECDH) with the vault identity's public point, HKDF turns the
//!    shared secret into a one-time AES-256-GCM key, and the record id is
//!    authenticated as associated data.
//! 2. **Origin**: the identity signs
//!    `SHA-256(domain || len(id) || id || plaintext)` with ECDSA, so a
//!    record that decrypts cleanly but was not produced by this identity
//!    is still rejected.
//!
//! The manifest signature covers the ordered record set: each record's id,
//! ephemeral public key and timestamps.  Records cannot be dropped,
//! duplicated, reordered or swapped for an older version without
//! detection.  Ciphertext, tag and signature stay outside it, so damage to
//! one record surfaces when that record is decrypted and leaves the rest
//! readable.

use chrono::Utc;
use k256::ecdh::diffie_hellman;
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::encryption;
use super::identity::{random_secret, Identity, PublicIdentity};
use super::keys;
use crate::errors::{VaultError, Result};
use crate::vault::record::EncryptedRecord;

/// Length of a compact (r || s) ECDSA signature.
pub const SIGNATURE_LEN: usize = 64;

const RECORD_AAD_DOMAIN: &[u8] = b"facevault-record-aad:v1";
const RECORD_SIG_DOMAIN: &[u8] = b"facevault-record-sig:v1";
const MANIFEST_DOMAIN: &[u8] = b"facevault-manifest:v1";

/// Sign `data` with the identity's private scalar (RFC 6979 ECDSA over
/// SHA-256).
pub fn sign(data: &[u8], identity: &Identity) -> Result<Vec<u8>> {
    let signing_key = SigningKey::from(identity.secret());
    let signature: Signature = signing_key
        .try_sign(data)
        .map_err(|e| VaultError::Encryption(format!("signing failed: {e}")))?;
    Ok(signature.to_bytes().to_vec())
}

/// Verify a signature produced by `sign`.  Malformed input returns `false`.
pub fn verify(data: &[u8], signature: &[u8], public: &PublicIdentity) -> bool {
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    VerifyingKey::from(public.as_key())
        .verify(data, &signature)
        .is_ok()
}

/// Encrypt and sign `plaintext` as the record `id`.
pub fn encrypt_record(id: &str, plaintext: &[u8], identity: &Identity) -> Result<EncryptedRecord> {
    let ephemeral = random_secret()?;
    let ephemeral_public = ephemeral
        .public_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec();

    let recipient_public = identity.public().to_sec1_bytes();
    let shared = diffie_hellman(
        ephemeral.to_nonzero_scalar(),
        identity.public().as_key().as_affine(),
    );
    let record_key = keys::derive_record_key(
        shared.raw_secret_bytes().as_slice(),
        &ephemeral_public,
        &recipient_public,
    )?;

    let sealed = encryption::seal(record_key.as_slice(), &record_aad(id), plaintext)?;
    let signature = sign(&record_digest(id, plaintext), identity)?;

    let now = Utc::now();
    Ok(EncryptedRecord {
        id: id.to_string(),
        ephemeral_public_key: ephemeral_public,
        nonce: sealed.nonce,
        ciphertext: sealed.ciphertext,
        tag: sealed.tag,
        signature,
        created_at: now,
        updated_at: now,
    })
}

/// Decrypt a record and verify both its tag and its signature.
///
/// Returns `VaultError::Integrity` if either check fails; the two cases
/// are not distinguished.
pub fn decrypt_record(record: &EncryptedRecord, identity: &Identity) -> Result<Zeroizing<Vec<u8>>> {
    let ephemeral =
        PublicKey::from_sec1_bytes(&record.ephemeral_public_key).map_err(|_| VaultError::Integrity)?;

    let shared = diffie_hellman(identity.secret().to_nonzero_scalar(), ephemeral.as_affine());
    let record_key = keys::derive_record_key(
        shared.raw_secret_bytes().as_slice(),
        &record.ephemeral_public_key,
        &identity.public().to_sec1_bytes(),
    )?;

    let plaintext = encryption::open(
        record_key.as_slice(),
        &record_aad(&record.id),
        &record.nonce,
        &record.ciphertext,
        &record.tag,
    )?;

    if !verify(
        &record_digest(&record.id, &plaintext),
        &record.signature,
        identity.public(),
    ) {
        return Err(VaultError::Integrity);
    }

    Ok(plaintext)
}

/// Sign the ordered record set.
pub fn sign_manifest(records: &[EncryptedRecord], identity: &Identity) -> Result<Vec<u8>> {
    sign(&manifest_digest(records), identity)
}

/// Verify a manifest signature against the ordered record set.
pub fn verify_manifest(records: &[EncryptedRecord], signature: &[u8], public: &PublicIdentity) -> bool {
    verify(&manifest_digest(records), signature, public)
}

fn record_aad(id: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(RECORD_AAD_DOMAIN.len() + 8 + id.len());
    aad.extend_from_slice(RECORD_AAD_DOMAIN);
    put_field(&mut aad, id.as_bytes());
    aad
}

fn record_digest(id: &str, plaintext: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(RECORD_SIG_DOMAIN);
    hasher.update((id.len() as u64).to_le_bytes());
    hasher.update(id.as_bytes());
    hasher.update(plaintext);
    finish(hasher)
}

fn manifest_digest(records: &[EncryptedRecord]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(MANIFEST_DOMAIN);
    hasher.update((records.len() as u64).to_le_bytes());
    for record in records {
        for field in [record.id.as_bytes(), record.ephemeral_public_key.as_slice()] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
        for ts in [record.created_at, record.updated_at] {
            hasher.update(ts.timestamp().to_le_bytes());
            hasher.update(ts.timestamp_subsec_nanos().to_le_bytes());
        }
    }
    finish(hasher)
}

fn put_field(buf: &mut Vec<u8>, field: &[u8]) {
    buf.extend_from_slice(&(field.len() as u64).to_le_bytes());
    buf.extend_from_slice(field);
}

fn finish(hasher: Sha256) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}
