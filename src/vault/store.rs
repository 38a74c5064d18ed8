//! `SecureStore`: the lifecycle facade over one vault file.
//!
//! ```text
//! Uninitialized --initialize--> Locked --unlock--> Unlocked --lock--> Locked
//!                                                  Unlocked --destroy--> Uninitialized
//! ```
//!
//! While unlocked the store exclusively owns the identity scalar; it is
//! wiped on `lock`, on a failed `unlock`, and when the store is dropped.
//! The password-derived key never outlives the call that derived it.
//!
//! Every mutation takes the vault lock, re-reads the file, builds the
//! complete new `Vault` in memory and commits it with one `file::save`.
//! If any step fails the file on disk is unchanged.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::file;
use super::format::{self, Vault, VaultHeader, CURRENT_VERSION};
use super::lock::VaultLock;
use super::record::{validate_record_id, EncryptedRecord, RecordMetadata};
use crate::crypto::codec;
use crate::crypto::identity::{self, Identity, PublicIdentity};
use crate::crypto::kdf::{self, DerivedKey, PasswordSalt, DEFAULT_ITERATIONS};
use crate::errors::{VaultError, Result};
use crate::faces::FaceEntry;

/// Default time to wait for another writer to release the vault.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables applied when creating or re-keying a vault.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// PBKDF2 work factor for new salts (`initialize`, `rotate_password`).
    /// Existing vaults always unlock with the count stored in their header.
    pub kdf_iterations: u32,
    /// How long a writer waits for the vault lock.
    pub lock_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            kdf_iterations: DEFAULT_ITERATIONS,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Locked,
    Unlocked,
}

struct Session {
    identity: Identity,
    vault: Vault,
}

/// Handle to one vault file.  Construct one per vault and pass it by
/// reference to collaborators; only one handle should mutate a given path
/// at a time.
pub struct SecureStore {
    path: PathBuf,
    options: StoreOptions,
    session: Option<Session>,
}

impl SecureStore {
    // ------------------------------------------------------------------
    // Construction and state
    // ------------------------------------------------------------------

    /// Create a handle for the vault at `path`.  Performs no I/O.
    pub fn new(path: impl Into<PathBuf>, options: StoreOptions) -> Self {
        Self {
            path: path.into(),
            options,
            session: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> StoreState {
        if self.session.is_some() {
            StoreState::Unlocked
        } else if self.exists() {
            StoreState::Locked
        } else {
            StoreState::Uninitialized
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    /// Whether a vault (or its backup copy) exists on disk.
    pub fn exists(&self) -> bool {
        self.path.exists() || file::backup_path(&self.path).exists()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Create a new vault protected by `password`.
    ///
    /// Generates a fresh identity and salt and writes the empty vault.
    /// The store stays locked afterwards.
    pub fn initialize(&mut self, password: &[u8]) -> Result<()> {
        let _guard = self.acquire_lock()?;
        if self.exists() {
            return Err(VaultError::AlreadyExists(self.path.clone()));
        }

        let iterations = self.options.kdf_iterations;
        let identity = Identity::generate()?;
        let salt = PasswordSalt::generate()?;
        let key = kdf::derive(password, &salt, iterations)?;

        let vault = seal_vault(&identity, &key, &salt, iterations, Utc::now(), None, Vec::new())?;
        file::save(&vault, &self.path)?;

        info!(
            vault = %self.path.display(),
            fingerprint = %identity.public().fingerprint(),
            kdf_iterations = iterations,
            "vault initialized"
        );
        Ok(())
    }

    /// Unlock the vault with `password`.
    ///
    /// On any failure the store is left locked.
    pub fn unlock(&mut self, password: &[u8]) -> Result<()> {
        self.session = None;

        let vault = file::recover(&self.path)?;
        let identity = match open_identity(&vault, password) {
            Ok(identity) => identity,
            Err(err) => {
                warn!(vault = %self.path.display(), "unlock rejected");
                return Err(err);
            }
        };
        check_manifest(&vault, &identity)?;

        info!(
            vault = %self.path.display(),
            records = vault.records.len(),
            "vault unlocked"
        );
        self.session = Some(Session { identity, vault });
        Ok(())
    }

    /// Drop the unlocked identity.  Idempotent.
    pub fn lock(&mut self) {
        if self.session.take().is_some() {
            info!(vault = %self.path.display(), "vault locked");
        }
    }

    /// Check `password` against the vault on disk without changing state.
    pub fn verify_password(&self, password: &[u8]) -> Result<bool> {
        let vault = file::recover(&self.path)?;
        match open_identity(&vault, password) {
            Ok(_) => Ok(true),
            Err(VaultError::Authentication) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// The vault's public key.  Available while locked.
    pub fn public_identity(&self) -> Result<PublicIdentity> {
        match &self.session {
            Some(session) => Ok(session.identity.public().clone()),
            None => {
                let vault = file::recover(&self.path)?;
                PublicIdentity::from_sec1_bytes(&vault.header.public_key)
            }
        }
    }

    /// Change the vault password.
    ///
    /// `old_password` is checked again even though the store is unlocked.
    /// The identity keeps its scalar; it is re-wrapped under a key from a
    /// new salt, and every record is re-encrypted with a fresh ephemeral
    /// key.  All of it is committed in a single save.
    pub fn rotate_password(&mut self, old_password: &[u8], new_password: &[u8]) -> Result<()> {
        if self.session.is_none() {
            return Err(VaultError::NotUnlocked);
        }
        let _guard = self.acquire_lock()?;
        let iterations = self.options.kdf_iterations;
        let session = self.session.as_mut().ok_or(VaultError::NotUnlocked)?;
        refresh(&self.path, session)?;

        let claimed = open_identity(&session.vault, old_password)?;
        if !bool::from(claimed.ct_eq(&session.identity)) {
            return Err(VaultError::Authentication);
        }
        drop(claimed);

        let mut records = Vec::with_capacity(session.vault.records.len());
        for record in &session.vault.records {
            let plaintext = codec::decrypt_record(record, &session.identity)?;
            let mut fresh = codec::encrypt_record(&record.id, &plaintext, &session.identity)?;
            fresh.created_at = record.created_at;
            fresh.updated_at = record.updated_at;
            records.push(fresh);
        }

        let salt = PasswordSalt::generate()?;
        let key = kdf::derive(new_password, &salt, iterations)?;
        let vault = seal_vault(
            &session.identity,
            &key,
            &salt,
            iterations,
            session.vault.header.created_at,
            Some(Utc::now()),
            records,
        )?;
        file::save(&vault, &self.path)?;
        let records = vault.records.len();
        session.vault = vault;
        file::refresh_backup(&self.path)?;

        info!(
            vault = %self.path.display(),
            records,
            "vault password rotated"
        );
        Ok(())
    }

    /// Permanently delete the vault, its backup and its lock file.
    ///
    /// Requires an unlocked store and the current password.  On success the
    /// session is dropped and the store reports `Uninitialized`; on any
    /// failure it stays unlocked and the files are untouched.
    pub fn destroy(&mut self, password: &[u8]) -> Result<()> {
        let session = self.session.as_ref().ok_or(VaultError::NotUnlocked)?;
        let guard = self.acquire_lock()?;

        let vault = file::recover(&self.path)?;
        let claimed = open_identity(&vault, password)?;
        if !bool::from(claimed.ct_eq(&session.identity)) {
            return Err(VaultError::Authentication);
        }
        drop(claimed);

        file::remove(&self.path)?;
        self.session = None;

        let lock_file = guard.path().to_path_buf();
        drop(guard);
        match fs::remove_file(&lock_file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        warn!(vault = %self.path.display(), "vault destroyed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Records
    // ------------------------------------------------------------------

    /// Encrypt `plaintext`, store it as `id` (replacing any existing record
    /// with that id) and persist the vault.
    pub fn encrypt_record(&mut self, id: &str, plaintext: &[u8]) -> Result<EncryptedRecord> {
        validate_record_id(id)?;
        if self.session.is_none() {
            return Err(VaultError::NotUnlocked);
        }
        let _guard = self.acquire_lock()?;
        let session = self.session.as_mut().ok_or(VaultError::NotUnlocked)?;
        refresh(&self.path, session)?;

        let mut record = codec::encrypt_record(id, plaintext, &session.identity)?;
        let mut records = session.vault.records.clone();
        match records.iter_mut().find(|r| r.id == id) {
            Some(existing) => {
                record.created_at = existing.created_at;
                *existing = record.clone();
            }
            None => records.push(record.clone()),
        }

        commit_records(&self.path, session, records)?;
        debug!(record = id, "record stored");
        Ok(record)
    }

    /// Decrypt and verify the record `id`.
    pub fn decrypt_record(&self, id: &str) -> Result<Zeroizing<Vec<u8>>> {
        let session = self.session()?;
        let record = session
            .vault
            .record(id)
            .ok_or_else(|| VaultError::RecordNotFound(id.to_string()))?;
        codec::decrypt_record(record, &session.identity)
    }

    /// Remove the record `id` and persist the vault.
    pub fn remove_record(&mut self, id: &str) -> Result<()> {
        if self.session.is_none() {
            return Err(VaultError::NotUnlocked);
        }
        let _guard = self.acquire_lock()?;
        let session = self.session.as_mut().ok_or(VaultError::NotUnlocked)?;
        refresh(&self.path, session)?;

        let before = session.vault.records.len();
        let records: Vec<EncryptedRecord> = session
            .vault
            .records
            .iter()
            .filter(|r| r.id != id)
            .cloned()
            .collect();
        if records.len() == before {
            return Err(VaultError::RecordNotFound(id.to_string()));
        }

        commit_records(&self.path, session, records)?;
        debug!(record = id, "record removed");
        Ok(())
    }

    /// Metadata for every record, in vault order.  No decryption.
    pub fn list_records(&self) -> Result<Vec<RecordMetadata>> {
        Ok(self
            .session()?
            .vault
            .records
            .iter()
            .map(EncryptedRecord::metadata)
            .collect())
    }

    pub fn contains_record(&self, id: &str) -> Result<bool> {
        Ok(self.session()?.vault.record(id).is_some())
    }

    // ------------------------------------------------------------------
    // Face database
    // ------------------------------------------------------------------

    /// Store a face entry under its name.
    pub fn put_face(&mut self, entry: &FaceEntry) -> Result<EncryptedRecord> {
        let payload = entry.to_payload()?;
        self.encrypt_record(&entry.name, &payload)
    }

    /// Load and verify the face entry stored as `name`.
    pub fn get_face(&self, name: &str) -> Result<FaceEntry> {
        let payload = self.decrypt_record(name)?;
        let entry = FaceEntry::from_payload(&payload)?;
        if entry.name != name {
            return Err(VaultError::Integrity);
        }
        Ok(entry)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(VaultError::NotUnlocked)
    }

    fn acquire_lock(&self) -> Result<VaultLock> {
        VaultLock::acquire(&self.path, self.options.lock_timeout)
    }
}

/// Build a complete vault around `identity`, wrapped under `key`.
fn seal_vault(
    identity: &Identity,
    key: &DerivedKey,
    salt: &PasswordSalt,
    kdf_iterations: u32,
    created_at: chrono::DateTime<Utc>,
    rotated_at: Option<chrono::DateTime<Utc>>,
    records: Vec<EncryptedRecord>,
) -> Result<Vault> {
    let public_key = identity.public().to_sec1_bytes();
    let context = format::binding_context(CURRENT_VERSION, salt.as_bytes(), kdf_iterations, &public_key);
    let wrapped_identity = identity::wrap(identity, key, &context)?;
    let manifest_signature = codec::sign_manifest(&records, identity)?;

    Ok(Vault {
        version: CURRENT_VERSION,
        header: VaultHeader {
            salt: salt.as_bytes().to_vec(),
            kdf_iterations,
            public_key,
            wrapped_identity,
            manifest_signature,
            created_at,
            rotated_at,
        },
        records,
    })
}

/// Derive the key for `password` and unwrap the vault identity.
fn open_identity(vault: &Vault, password: &[u8]) -> Result<Identity> {
    let header = &vault.header;
    let salt = PasswordSalt::from_bytes(header.salt.clone())?;
    let key = kdf::derive(password, &salt, header.kdf_iterations)?;
    let context = format::binding_context(
        vault.version,
        &header.salt,
        header.kdf_iterations,
        &header.public_key,
    );

    let identity = identity::unwrap(&header.wrapped_identity, &key, &context)?;
    if identity.public().to_sec1_bytes() != header.public_key {
        return Err(VaultError::Integrity);
    }
    Ok(identity)
}

fn check_manifest(vault: &Vault, identity: &Identity) -> Result<()> {
    if codec::verify_manifest(
        &vault.records,
        &vault.header.manifest_signature,
        identity.public(),
    ) {
        Ok(())
    } else {
        Err(VaultError::Integrity)
    }
}

/// Re-read the vault under the write lock so a mutation starts from what
/// is actually on disk.
fn refresh(path: &Path, session: &mut Session) -> Result<()> {
    let vault = file::recover(path)?;
    if vault.header.public_key != session.identity.public().to_sec1_bytes() {
        return Err(VaultError::Integrity);
    }
    check_manifest(&vault, &session.identity)?;
    session.vault = vault;
    Ok(())
}

/// Persist a new record set under the current header and re-sign it.
fn commit_records(path: &Path, session: &mut Session, records: Vec<EncryptedRecord>) -> Result<()> {
    let mut header = session.vault.header.clone();
    header.manifest_signature = codec::sign_manifest(&records, &session.identity)?;

    let vault = Vault {
        version: session.vault.version,
        header,
        records,
    };
    file::save(&vault, path)?;
    session.vault = vault;
    Ok(())
}
