//! Cryptographic primitives for FaceVault.
//!
//! This module provides:
//! - Secure randomness with explicit entropy errors (`random`)
//! - PBKDF2 password-based key derivation (`kdf`)
//! - HKDF subkey derivation (`keys`)
//! - AES-256-GCM with detached tags (`encryption`)
//! - The secp256k1 vault identity and its password wrap (`identity`)
//! - Record encryption, ECDSA signing and verification (`codec`)

pub mod codec;
pub mod encryption;
pub mod identity;
pub mod kdf;
pub mod keys;
pub mod random;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{derive, Identity, sign, verify, ...};
pub use codec::{decrypt_record, encrypt_record, sign, verify};
pub use identity::{unwrap, wrap, Identity, PublicIdentity, WrappedIdentity};
pub use kdf::{derive, DerivedKey, PasswordSalt};
