use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in FaceVault.
///
/// `Authentication` and `Integrity` carry no detail.  A wrong password and
/// a corrupted wrap look the same, as do a bad tag and a bad signature.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Cryptographic failures ---
    #[error("Authentication failed")]
    Authentication,

    #[error("Integrity check failed — data is corrupted or has been tampered with")]
    Integrity,

    #[error("Insufficient entropy from the system random source: {0}")]
    Entropy(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    // --- Vault file errors ---
    #[error("Invalid vault format: {0}")]
    Format(String),

    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    AlreadyExists(PathBuf),

    #[error("Timed out waiting for the vault lock at {0}")]
    LockTimeout(PathBuf),

    // --- Session / record errors ---
    #[error("Vault is locked — unlock it first")]
    NotUnlocked,

    #[error("Record '{0}' not found")]
    RecordNotFound(String),

    #[error("Invalid record id: {0}")]
    InvalidRecordId(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Coarse error classification handed to collaborators (admin console,
/// face-database loader) instead of the full error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Integrity,
    Format,
    NotUnlocked,
    AlreadyExists,
    Entropy,
    LockTimeout,
    NotFound,
    InvalidInput,
    Io,
    Other,
}

impl VaultError {
    /// Classify this error for callers that only need the kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication => ErrorKind::Authentication,
            Self::Integrity => ErrorKind::Integrity,
            Self::Format(_) => ErrorKind::Format,
            Self::NotUnlocked => ErrorKind::NotUnlocked,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Entropy(_) => ErrorKind::Entropy,
            Self::LockTimeout(_) => ErrorKind::LockTimeout,
            Self::VaultNotFound(_) | Self::RecordNotFound(_) => ErrorKind::NotFound,
            Self::InvalidRecordId(_) | Self::Config(_) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Io,
            Self::KeyDerivation(_)
            | Self::Encryption(_)
            | Self::Serialization(_)
            | Self::CommandFailed(_) => ErrorKind::Other,
        }
    }
}

/// Convenience type alias for FaceVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
