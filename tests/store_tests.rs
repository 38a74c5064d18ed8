//! Integration tests for the `SecureStore` lifecycle.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use facevault::crypto::kdf::MIN_ITERATIONS;
use facevault::errors::{ErrorKind, VaultError};
use facevault::faces::FaceEntry;
use facevault::vault::lock::VaultLock;
use facevault::vault::{file, SecureStore, StoreOptions, StoreState};
use tempfile::TempDir;

fn options() -> StoreOptions {
    StoreOptions {
        kdf_iterations: MIN_ITERATIONS,
        lock_timeout: Duration::from_millis(200),
    }
}

/// Helper: a fresh temp dir and a vault path inside it.
fn vault_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("faces.vault");
    (dir, path)
}

fn unlocked(path: &Path, password: &[u8]) -> SecureStore {
    let mut store = SecureStore::new(path, options());
    store.unlock(password).expect("unlock");
    store
}

const JOHN: &[u8] = br#"{"name":"john_doe","vector":[0.12,0.98,-0.33,0.5]}"#;

// ---------------------------------------------------------------------------
// End-to-end admin scenario
// ---------------------------------------------------------------------------

#[test]
fn initialize_enroll_rotate_and_reopen() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());

    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();

    let record = store.encrypt_record("john_doe", JOHN).unwrap();
    assert!(!record.signature.is_empty());
    assert_eq!(store.decrypt_record("john_doe").unwrap().as_slice(), JOHN);

    store.rotate_password(b"admin123", b"Str0ngP@ss!").unwrap();
    store.lock();

    assert!(matches!(
        store.unlock(b"admin123"),
        Err(VaultError::Authentication)
    ));
    assert_eq!(store.state(), StoreState::Locked);

    store.unlock(b"Str0ngP@ss!").unwrap();
    assert_eq!(store.decrypt_record("john_doe").unwrap().as_slice(), JOHN);
}

#[test]
fn rotation_preserves_every_record_and_identity() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();
    let fingerprint = store.public_identity().unwrap().fingerprint();

    let payloads: Vec<(String, Vec<u8>)> = (0..5)
        .map(|i| (format!("person_{i}"), format!("[{i}.25,{i}.5]").into_bytes()))
        .collect();
    for (id, payload) in &payloads {
        store.encrypt_record(id, payload).unwrap();
    }
    let before = store.list_records().unwrap();

    store.rotate_password(b"admin123", b"Str0ngP@ss!").unwrap();
    store.lock();

    let store = unlocked(&path, b"Str0ngP@ss!");
    assert_eq!(store.public_identity().unwrap().fingerprint(), fingerprint);

    let after = store.list_records().unwrap();
    assert_eq!(after.len(), before.len());
    for (b, a) in before.iter().zip(&after) {
        assert_eq!(b.id, a.id);
        assert_eq!(b.created_at, a.created_at);
    }
    for (id, payload) in &payloads {
        assert_eq!(store.decrypt_record(id).unwrap().as_slice(), payload.as_slice());
    }
    assert!(file::load(&path).unwrap().header.rotated_at.is_some());
}

#[test]
fn rotation_with_wrong_old_password_changes_nothing() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();
    store.encrypt_record("john_doe", JOHN).unwrap();
    let on_disk = fs::read(&path).unwrap();

    assert!(matches!(
        store.rotate_password(b"not-the-password", b"Str0ngP@ss!"),
        Err(VaultError::Authentication)
    ));
    assert_eq!(fs::read(&path).unwrap(), on_disk);
    assert!(store.verify_password(b"admin123").unwrap());
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[test]
fn wrong_password_never_unlocks() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();

    for attempt in [&b"admin124"[..], &b""[..], &b"ADMIN123"[..], &b"admin123 "[..]] {
        let err = store.unlock(attempt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(!store.is_unlocked());
    }
}

#[test]
fn verify_password_does_not_unlock() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();

    assert!(store.verify_password(b"admin123").unwrap());
    assert!(!store.verify_password(b"nope-nope").unwrap());
    assert_eq!(store.state(), StoreState::Locked);
}

#[test]
fn initialize_twice_is_already_exists() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    let on_disk = fs::read(&path).unwrap();

    let mut again = SecureStore::new(&path, options());
    assert!(matches!(
        again.initialize(b"other-pass"),
        Err(VaultError::AlreadyExists(_))
    ));
    assert_eq!(fs::read(&path).unwrap(), on_disk);
}

#[test]
fn unlock_missing_vault_is_not_found() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    assert_eq!(store.state(), StoreState::Uninitialized);
    assert!(matches!(
        store.unlock(b"admin123"),
        Err(VaultError::VaultNotFound(_))
    ));
}

#[test]
fn public_identity_is_available_while_locked() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    let locked_fp = store.public_identity().unwrap().fingerprint();

    store.unlock(b"admin123").unwrap();
    assert_eq!(store.public_identity().unwrap().fingerprint(), locked_fp);
}

// ---------------------------------------------------------------------------
// Tamper detection
// ---------------------------------------------------------------------------

/// Flip one bit in a record field and rewrite the file with a valid
/// checksum, as an attacker with write access could.
fn tamper(path: &Path, index: usize, field: &str) {
    let mut vault = file::load(path).unwrap();
    let record = &mut vault.records[index];
    let bytes = match field {
        "ciphertext" => &mut record.ciphertext,
        "tag" => &mut record.tag,
        "signature" => &mut record.signature,
        other => panic!("unknown field {other}"),
    };
    bytes[0] ^= 0x80;
    file::save(&vault, path).unwrap();
}

#[test]
fn flipped_bit_in_any_stored_record_is_integrity_error() {
    for field in ["ciphertext", "tag", "signature"] {
        for index in 0..3 {
            let (_dir, path) = vault_path();
            let mut store = SecureStore::new(&path, options());
            store.initialize(b"admin123").unwrap();
            store.unlock(b"admin123").unwrap();
            for i in 0..3 {
                store.encrypt_record(&format!("person_{i}"), JOHN).unwrap();
            }
            store.lock();

            tamper(&path, index, field);

            // Damage to one record is reported by that record alone.
            let store = unlocked(&path, b"admin123");
            for i in 0..3 {
                let result = store.decrypt_record(&format!("person_{i}"));
                if i == index {
                    assert!(
                        matches!(result, Err(VaultError::Integrity)),
                        "{field} of record {index} tamper was not detected"
                    );
                } else {
                    assert_eq!(result.unwrap().as_slice(), JOHN);
                }
            }
        }
    }
}

#[test]
fn damaged_record_blocks_rotation() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();
    store.encrypt_record("alice", b"[1.0]").unwrap();
    store.lock();

    tamper(&path, 0, "tag");
    let on_disk = fs::read(&path).unwrap();

    let mut store = unlocked(&path, b"admin123");
    assert!(matches!(
        store.rotate_password(b"admin123", b"Str0ngP@ss!"),
        Err(VaultError::Integrity)
    ));
    assert_eq!(fs::read(&path).unwrap(), on_disk);
}

/// Flip one byte in the middle of the vault file without fixing the
/// checksum.
fn corrupt_file(path: &Path) {
    let mut bytes = fs::read(path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x01;
    fs::write(path, bytes).unwrap();
}

#[test]
fn corrupted_file_after_rotation_does_not_accept_old_password() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();
    store.rotate_password(b"admin123", b"Str0ngP@ss!").unwrap();
    store.lock();

    corrupt_file(&path);

    assert!(matches!(store.unlock(b"admin123"), Err(VaultError::Integrity)));
    assert!(matches!(
        store.unlock(b"Str0ngP@ss!"),
        Err(VaultError::Integrity)
    ));
    assert!(!store.is_unlocked());
}

#[test]
fn corrupted_file_does_not_silently_drop_recent_records() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();
    store.encrypt_record("alice", b"[1.0]").unwrap();
    store.encrypt_record("bob", b"[2.0]").unwrap();
    store.lock();
    let backup_before = fs::read(file::backup_path(&path)).unwrap();

    corrupt_file(&path);

    assert!(matches!(store.unlock(b"admin123"), Err(VaultError::Integrity)));
    // Nothing was written over the backup either.
    assert_eq!(fs::read(file::backup_path(&path)).unwrap(), backup_before);
}

#[test]
fn backup_after_rotation_uses_the_new_password() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();
    store.encrypt_record("john_doe", JOHN).unwrap();
    store.rotate_password(b"admin123", b"Str0ngP@ss!").unwrap();
    store.lock();

    assert_eq!(
        fs::read(file::backup_path(&path)).unwrap(),
        fs::read(&path).unwrap()
    );

    // Lose the primary entirely: the backup must not revive the old password.
    fs::remove_file(&path).unwrap();
    assert!(matches!(
        store.unlock(b"admin123"),
        Err(VaultError::Authentication)
    ));
    store.unlock(b"Str0ngP@ss!").unwrap();
    assert_eq!(store.decrypt_record("john_doe").unwrap().as_slice(), JOHN);
}

#[test]
fn reordered_records_are_detected() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();
    store.encrypt_record("alice", b"[1.0]").unwrap();
    store.encrypt_record("bob", b"[2.0]").unwrap();
    store.lock();

    let mut vault = file::load(&path).unwrap();
    vault.records.swap(0, 1);
    file::save(&vault, &path).unwrap();

    assert!(matches!(store.unlock(b"admin123"), Err(VaultError::Integrity)));
}

#[test]
fn edited_kdf_iterations_fail_authentication() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();

    let mut vault = file::load(&path).unwrap();
    vault.header.kdf_iterations += 1;
    file::save(&vault, &path).unwrap();

    assert!(matches!(
        store.unlock(b"admin123"),
        Err(VaultError::Authentication)
    ));
}

// ---------------------------------------------------------------------------
// Records and faces
// ---------------------------------------------------------------------------

#[test]
fn record_crud() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();

    let first = store.encrypt_record("john_doe", b"[1.0]").unwrap();
    let second = store.encrypt_record("john_doe", b"[2.0]").unwrap();
    assert_eq!(first.created_at, second.created_at);
    assert!(second.updated_at >= first.updated_at);
    assert_eq!(store.list_records().unwrap().len(), 1);
    assert_eq!(store.decrypt_record("john_doe").unwrap().as_slice(), b"[2.0]");

    assert!(store.contains_record("john_doe").unwrap());
    store.remove_record("john_doe").unwrap();
    assert!(!store.contains_record("john_doe").unwrap());
    assert!(matches!(
        store.remove_record("john_doe"),
        Err(VaultError::RecordNotFound(_))
    ));
    assert!(matches!(
        store.decrypt_record("john_doe"),
        Err(VaultError::RecordNotFound(_))
    ));
}

#[test]
fn invalid_record_id_is_rejected() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();

    assert!(matches!(
        store.encrypt_record("john\ndoe", b"x"),
        Err(VaultError::InvalidRecordId(_))
    ));
    assert!(matches!(
        store.encrypt_record("", b"x"),
        Err(VaultError::InvalidRecordId(_))
    ));
}

#[test]
fn face_vectors_roundtrip_exactly() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();

    let vector = vec![0.12, -0.987_654_321_012_345_6, 1e-300, 0.1 + 0.2];
    let entry = FaceEntry::new("john_doe", vector.clone()).unwrap();
    store.put_face(&entry).unwrap();
    store.lock();

    let store = unlocked(&path, b"admin123");
    let loaded = store.get_face("john_doe").unwrap();
    assert_eq!(loaded.name, "john_doe");
    for (a, b) in loaded.vector.iter().zip(&vector) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn face_names_with_spaces_are_stored() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();

    let entry = FaceEntry::new("John Doe", vec![0.12, 0.98, -0.33]).unwrap();
    store.put_face(&entry).unwrap();
    store.lock();

    let store = unlocked(&path, b"admin123");
    assert!(store.contains_record("John Doe").unwrap());
    assert_eq!(store.get_face("John Doe").unwrap(), entry);
}

#[test]
fn changes_from_another_handle_are_picked_up() {
    let (_dir, path) = vault_path();
    let mut first = SecureStore::new(&path, options());
    first.initialize(b"admin123").unwrap();
    first.unlock(b"admin123").unwrap();

    let mut second = unlocked(&path, b"admin123");
    second.encrypt_record("alice", b"[1.0]").unwrap();

    // `first` re-reads the file before writing, so alice survives.
    first.encrypt_record("bob", b"[2.0]").unwrap();
    let ids: Vec<String> = first.list_records().unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["alice".to_string(), "bob".to_string()]);
}

// ---------------------------------------------------------------------------
// Locking and destroy
// ---------------------------------------------------------------------------

#[test]
fn held_lock_times_out_writers() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();

    let guard = VaultLock::acquire(&path, Duration::from_millis(50)).unwrap();
    let err = store.encrypt_record("john_doe", b"[1.0]").unwrap_err();
    assert!(matches!(err, VaultError::LockTimeout(_)));
    drop(guard);

    store.encrypt_record("john_doe", b"[1.0]").unwrap();
}

#[test]
fn destroy_removes_vault_and_backup() {
    let (dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();
    store.unlock(b"admin123").unwrap();
    store.encrypt_record("john_doe", b"[1.0]").unwrap();
    assert!(file::backup_path(&path).exists());

    store.destroy(b"admin123").unwrap();

    assert_eq!(store.state(), StoreState::Uninitialized);
    assert!(!path.exists());
    assert!(!file::backup_path(&path).exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn destroy_requires_unlock_and_password() {
    let (_dir, path) = vault_path();
    let mut store = SecureStore::new(&path, options());
    store.initialize(b"admin123").unwrap();

    let mut locked = SecureStore::new(&path, options());
    assert!(matches!(
        locked.destroy(b"admin123"),
        Err(VaultError::NotUnlocked)
    ));

    let mut store = unlocked(&path, b"admin123");
    store.encrypt_record("john_doe", JOHN).unwrap();
    assert!(matches!(
        store.destroy(b"wrong-pass"),
        Err(VaultError::Authentication)
    ));
    assert!(path.exists());

    // A failed destroy leaves the session usable.
    assert_eq!(store.state(), StoreState::Unlocked);
    assert_eq!(store.decrypt_record("john_doe").unwrap().as_slice(), JOHN);

    store.destroy(b"admin123").unwrap();
    assert_eq!(store.state(), StoreState::Uninitialized);
    assert!(matches!(
        store.decrypt_record("john_doe"),
        Err(VaultError::NotUnlocked)
    ));
}
