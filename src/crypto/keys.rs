//! Subkey derivation helpers using HKDF-SHA256.
//!
//! From the password-derived secret we derive:
//! - A **wrapping key** that encrypts the identity scalar.
//! - A **canary key** whose double hash confirms the password.
//!
//! From an ECDH shared secret we derive:
//! - A one-time **record key** for a single encrypted record.
//!
//! Each derivation uses its own `info` string, so no two purposes ever
//! share key material.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::errors::{VaultError, Result};

/// Length of derived sub-keys (256 bits).
const KEY_LEN: usize = 32;

const WRAP_INFO: &[u8] = b"facevault-wrap-key:v1";
const CANARY_INFO: &[u8] = b"facevault-canary:v1";
const RECORD_INFO: &[u8] = b"facevault-record-key:v1";

/// Derive the identity wrapping key from the password-derived secret.
pub fn derive_wrapping_key(master: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    hkdf_derive(master, None, WRAP_INFO)
}

/// Derive the canary subkey from the password-derived secret.
pub fn derive_canary_key(master: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    hkdf_derive(master, None, CANARY_INFO)
}

/// Derive a one-time record key from an ECDH shared secret.
///
/// Both public keys go into the HKDF salt so the key is bound to this
/// exact ephemeral/recipient pair.
pub fn derive_record_key(
    shared_secret: &[u8],
    ephemeral_public: &[u8],
    recipient_public: &[u8],
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let mut salt = Vec::with_capacity(ephemeral_public.len() + recipient_public.len());
    salt.extend_from_slice(ephemeral_public);
    salt.extend_from_slice(recipient_public);
    hkdf_derive(shared_secret, Some(&salt), RECORD_INFO)
}

/// Internal helper: HKDF-SHA256 extract-then-expand with the given `info`.
fn hkdf_derive(ikm: &[u8], salt: Option<&[u8]>, info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(salt, ikm);

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info, okm.as_mut_slice())
        .map_err(|e| VaultError::KeyDerivation(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}
