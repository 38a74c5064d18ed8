//! Vault module — the encrypted record container.
//!
//! This module provides:
//! - `EncryptedRecord` and `RecordMetadata` types (`record`)
//! - Binary vault format with a whole-file checksum (`format`)
//! - Atomic, backed-up file writes (`file`)
//! - Cross-process write lock (`lock`)
//! - The `SecureStore` lifecycle facade (`store`)

pub mod file;
pub mod format;
pub mod lock;
pub mod record;
pub mod store;

// Re-export the most commonly used items.
pub use format::{Vault, VaultHeader};
pub use record::{EncryptedRecord, RecordMetadata};
pub use store::{SecureStore, StoreOptions, StoreState};
