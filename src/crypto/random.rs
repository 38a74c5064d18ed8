//! Access to the operating system's secure random source.
//!
//! Every nonce, salt and private scalar in FaceVault comes through here so
//! that a failing RNG surfaces as `VaultError::Entropy` instead of a panic.

use rand::TryRngCore;

use crate::errors::{VaultError, Result};

/// Fill `buf` with bytes from the OS CSPRNG.
pub fn fill(buf: &mut [u8]) -> Result<()> {
    rand::rngs::OsRng
        .try_fill_bytes(buf)
        .map_err(|e| VaultError::Entropy(e.to_string()))
}

/// Return `N` fresh random bytes.
pub fn bytes<const N: usize>() -> Result<[u8; N]> {
    let mut out = [0u8; N];
    fill(&mut out)?;
    Ok(out)
}
