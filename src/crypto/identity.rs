//! The vault's long-lived secp256k1 identity.
//!
//! One scalar serves two roles: ECDSA signing key (record origin, manifest)
//! and ECDH agreement key (per-record ephemeral exchange).  On disk the
//! scalar only ever exists wrapped under a password-derived key; in memory
//! `k256::SecretKey` wipes itself on drop.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, Zeroizing};

use super::encryption;
use super::kdf::DerivedKey;
use super::random;
use crate::errors::{VaultError, Result};

/// Length of a secp256k1 scalar in bytes.
pub const SCALAR_LEN: usize = 32;

/// Rejection-sampling bound.  A healthy RNG needs one draw; the chance of
/// needing a second is about 2^-128.
const MAX_SAMPLE_ATTEMPTS: usize = 16;

/// Bytes of the SHA-256 hash kept for the display fingerprint.
const FINGERPRINT_LEN: usize = 20;

/// A secp256k1 public point.  Needs no secrets to verify signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicIdentity {
    key: PublicKey,
}

impl PublicIdentity {
    /// Parse a SEC1-encoded point (compressed or uncompressed).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let key = PublicKey::from_sec1_bytes(bytes)
            .map_err(|_| VaultError::Format("invalid secp256k1 public key".into()))?;
        Ok(Self { key })
    }

    /// SEC1 compressed encoding (33 bytes).
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        self.key.to_encoded_point(true).as_bytes().to_vec()
    }

    /// Short printable identifier: base64 of the first 20 bytes of
    /// SHA-256 over the compressed point.
    pub fn fingerprint(&self) -> String {
        let hash = Sha256::digest(self.to_sec1_bytes());
        BASE64.encode(&hash[..FINGERPRINT_LEN])
    }

    pub(crate) fn as_key(&self) -> &PublicKey {
        &self.key
    }
}

/// An unlocked identity: private scalar plus its public point.
pub struct Identity {
    secret: SecretKey,
    public: PublicIdentity,
}

impl Identity {
    /// Sample a uniformly random scalar in `[1, n-1]` and derive its point.
    pub fn generate() -> Result<Self> {
        Ok(Self::from_secret(random_secret()?))
    }

    /// Rebuild an identity from raw scalar bytes.
    pub fn from_scalar_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SCALAR_LEN {
            return Err(VaultError::Format("identity scalar has wrong length".into()));
        }
        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| VaultError::Format("identity scalar out of range".into()))?;
        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let public = PublicIdentity {
            key: secret.public_key(),
        };
        Self { secret, public }
    }

    pub fn public(&self) -> &PublicIdentity {
        &self.public
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// Constant-time comparison of the private scalars.
    pub fn ct_eq(&self, other: &Identity) -> Choice {
        self.secret.ct_eq(&other.secret)
    }

    fn scalar_bytes(&self) -> Zeroizing<[u8; SCALAR_LEN]> {
        let mut field_bytes = self.secret.to_bytes();
        let mut out = Zeroizing::new([0u8; SCALAR_LEN]);
        out.copy_from_slice(&field_bytes);
        field_bytes.as_mut_slice().zeroize();
        out
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("public", &self.public.fingerprint())
            .finish_non_exhaustive()
    }
}

/// Draw a fresh secret scalar by rejection sampling.
///
/// Also used for the per-record ephemeral keys.
pub(crate) fn random_secret() -> Result<SecretKey> {
    for _ in 0..MAX_SAMPLE_ATTEMPTS {
        let candidate = Zeroizing::new(random::bytes::<SCALAR_LEN>()?);
        // `from_slice` rejects zero and anything >= the curve order.
        if let Ok(secret) = SecretKey::from_slice(candidate.as_slice()) {
            return Ok(secret);
        }
    }
    Err(VaultError::Entropy(
        "random source failed to produce a valid scalar".into(),
    ))
}

/// The identity scalar encrypted under a password-derived wrapping key,
/// together with the password canary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedIdentity {
    #[serde(with = "crate::encoding::base64_bytes")]
    pub nonce: Vec<u8>,
    #[serde(with = "crate::encoding::base64_bytes")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "crate::encoding::base64_bytes")]
    pub tag: Vec<u8>,
    #[serde(with = "crate::encoding::base64_bytes")]
    pub canary: Vec<u8>,
}

/// Encrypt the identity scalar under `key`.
///
/// `context` is authenticated alongside the ciphertext; the vault passes
/// its header parameters here so they cannot be swapped independently.
pub fn wrap(identity: &Identity, key: &DerivedKey, context: &[u8]) -> Result<WrappedIdentity> {
    let wrapping_key = key.wrapping_key()?;
    let scalar = identity.scalar_bytes();
    let sealed = encryption::seal(wrapping_key.as_slice(), context, scalar.as_slice())?;

    Ok(WrappedIdentity {
        nonce: sealed.nonce,
        ciphertext: sealed.ciphertext,
        tag: sealed.tag,
        canary: key.canary()?.to_vec(),
    })
}

/// Decrypt and verify a wrapped identity.
///
/// The canary comparison and the AEAD open both always run and their
/// outcomes are combined before branching, so a wrong password and a
/// damaged wrap follow the same path and both return
/// `VaultError::Authentication`.
pub fn unwrap(wrapped: &WrappedIdentity, key: &DerivedKey, context: &[u8]) -> Result<Identity> {
    let wrapping_key = key.wrapping_key()?;
    let canary = key.canary()?;

    let canary_ok = canary.as_slice().ct_eq(wrapped.canary.as_slice());
    let opened = encryption::open(
        wrapping_key.as_slice(),
        context,
        &wrapped.nonce,
        &wrapped.ciphertext,
        &wrapped.tag,
    )
    .ok();
    let open_ok = Choice::from(u8::from(opened.is_some()));

    match opened {
        Some(scalar) if bool::from(canary_ok & open_ok) => {
            Identity::from_scalar_bytes(&scalar).map_err(|_| VaultError::Authentication)
        }
        _ => Err(VaultError::Authentication),
    }
}
