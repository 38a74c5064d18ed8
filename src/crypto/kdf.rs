//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The iteration count is chosen when the vault is created and stored in
//! the vault header next to the salt, so raising the default later never
//! locks anyone out of an existing vault.
//!
//! The derived secret is never used directly.  `DerivedKey` splits it via
//! HKDF into a wrapping key (encrypts the identity scalar) and a canary
//! (double SHA-256 of a separate subkey, stored to confirm the password).

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::keys;
use super::random;
use crate::errors::{VaultError, Result};

/// Length of a freshly generated salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Shortest salt accepted when reading an existing vault.
pub const MIN_SALT_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Lowest PBKDF2 iteration count FaceVault will derive with.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Iteration count for new vaults when nothing else is configured.
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Length of the password canary (SHA-256 output).
pub const CANARY_LEN: usize = 32;

/// Per-vault random salt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordSalt(Vec<u8>);

impl PasswordSalt {
    /// Generate a new random salt.
    pub fn generate() -> Result<Self> {
        let salt: [u8; SALT_LEN] = random::bytes()?;
        Ok(Self(salt.to_vec()))
    }

    /// Wrap salt bytes read from disk, rejecting salts that are too short.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < MIN_SALT_LEN {
            return Err(VaultError::Format(format!(
                "salt must be at least {MIN_SALT_LEN} bytes (got {})",
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A 32-byte password-derived secret, wiped from memory on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey {
    bytes: [u8; KEY_LEN],
}

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Subkey used to encrypt the identity scalar.
    pub fn wrapping_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        keys::derive_wrapping_key(&self.bytes)
    }

    /// Password verification value: `SHA-256(SHA-256(canary_subkey))`.
    ///
    /// Safe to persist; it is never used as an encryption key.
    pub fn canary(&self) -> Result<[u8; CANARY_LEN]> {
        let canary_key = keys::derive_canary_key(&self.bytes)?;
        let first = Sha256::digest(canary_key.as_slice());
        let second = Sha256::digest(first);

        let mut out = [0u8; CANARY_LEN];
        out.copy_from_slice(&second);
        Ok(out)
    }
}

/// Derive a key from `password` and `salt` with the given work factor.
///
/// Deterministic: the same inputs always yield the same key.  The caller
/// owns `password` and is responsible for wiping it.
pub fn derive(password: &[u8], salt: &PasswordSalt, iterations: u32) -> Result<DerivedKey> {
    if iterations < MIN_ITERATIONS {
        return Err(VaultError::KeyDerivation(format!(
            "PBKDF2 iterations must be at least {MIN_ITERATIONS} (got {iterations})"
        )));
    }

    let mut key = DerivedKey {
        bytes: [0u8; KEY_LEN],
    };
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt.as_bytes(), iterations, &mut key.bytes);
    Ok(key)
}
