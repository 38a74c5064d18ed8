//! AES-256-GCM authenticated encryption with a detached tag.
//!
//! Each call to `seal` draws a fresh random 12-byte nonce.  The nonce,
//! ciphertext and 16-byte tag are returned as separate fields because the
//! vault stores them separately.  Associated data is authenticated but not
//! encrypted.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use zeroize::Zeroizing;

use super::random;
use crate::errors::{VaultError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Output of `seal`.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub tag: Vec<u8>,
}

/// Encrypt `plaintext` under a 32-byte `key`, authenticating `aad`.
pub fn seal(key: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Sealed> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::Encryption(format!("invalid key length: {e}")))?;

    let nonce: [u8; NONCE_LEN] = random::bytes()?;

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), aad, &mut buffer)
        .map_err(|e| VaultError::Encryption(format!("encryption error: {e}")))?;

    Ok(Sealed {
        nonce: nonce.to_vec(),
        ciphertext: buffer,
        tag: tag.to_vec(),
    })
}

/// Decrypt and verify data produced by `seal`.
///
/// Any failure (wrong key, altered nonce, ciphertext, tag or `aad`) yields
/// `VaultError::Integrity`; no partial plaintext is ever returned.
pub fn open(
    key: &[u8],
    aad: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    if nonce.len() != NONCE_LEN || tag.len() != TAG_LEN {
        return Err(VaultError::Integrity);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| VaultError::Integrity)?;

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(nonce),
            aad,
            buffer.as_mut_slice(),
            Tag::from_slice(tag),
        )
        .map_err(|_| VaultError::Integrity)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0xABu8; 32];

    #[test]
    fn seal_then_open() {
        let sealed = seal(&KEY, b"ctx", b"feature-vector").unwrap();
        assert_eq!(sealed.nonce.len(), NONCE_LEN);
        assert_eq!(sealed.tag.len(), TAG_LEN);

        let plain = open(&KEY, b"ctx", &sealed.nonce, &sealed.ciphertext, &sealed.tag).unwrap();
        assert_eq!(plain.as_slice(), b"feature-vector");
    }

    #[test]
    fn nonces_are_fresh() {
        let a = seal(&KEY, b"", b"same").unwrap();
        let b = seal(&KEY, b"", b"same").unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn wrong_aad_fails() {
        let sealed = seal(&KEY, b"john_doe", b"x").unwrap();
        let result = open(&KEY, b"jane_doe", &sealed.nonce, &sealed.ciphertext, &sealed.tag);
        assert!(matches!(result, Err(VaultError::Integrity)));
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = seal(&KEY, b"", b"x").unwrap();
        let result = open(&[0x11u8; 32], b"", &sealed.nonce, &sealed.ciphertext, &sealed.tag);
        assert!(matches!(result, Err(VaultError::Integrity)));
    }

    #[test]
    fn truncated_tag_fails() {
        let sealed = seal(&KEY, b"", b"x").unwrap();
        let result = open(&KEY, b"", &sealed.nonce, &sealed.ciphertext, &sealed.tag[..8]);
        assert!(matches!(result, Err(VaultError::Integrity)));
    }
}
