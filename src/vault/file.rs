//! Crash-safe reading and writing of vault files.
//!
//! Writes go through three steps:
//!
//! 1. `stage`: encode, write to `.<name>.tmp` in the same directory, fsync.
//! 2. `commit`: copy the current vault to `<name>.bak` and fsync it.
//! 3. `commit`: rename the temp file over the vault, then fsync the
//!    directory.
//!
//! The rename is the only externally visible transition.  A crash before
//! it leaves the old vault in place; a crash after it leaves the new one.
//! If the primary is missing or truncated below its fixed prefix,
//! `recover` falls back to the backup copy.  Any other damage is an error.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::format::{self, Vault};
use crate::errors::{VaultError, Result};

/// Path of the backup copy kept next to the vault: `<name>.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    sibling(path, |name| format!("{name}.bak"))
}

/// Path of the staging file: `.<name>.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    sibling(path, |name| format!(".{name}.tmp"))
}

fn backup_temp_path(path: &Path) -> PathBuf {
    sibling(path, |name| format!(".{name}.bak.tmp"))
}

fn sibling(path: &Path, rename: impl FnOnce(&str) -> String) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new("."));
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    parent.join(rename(&name))
}

/// Read and decode a single vault file.  No fallback.
pub fn load(path: &Path) -> Result<Vault> {
    if !path.exists() {
        return Err(VaultError::VaultNotFound(path.to_path_buf()));
    }
    let data = fs::read(path)?;
    format::decode(&data)
}

/// Load the vault, falling back to the backup copy only when the primary
/// looks like what an interrupted write leaves behind: missing, or shorter
/// than the fixed prefix plus checksum.
///
/// A primary of plausible size that fails its checksum or does not parse
/// is reported as is; serving the backup then could roll back a password
/// rotation or recent records.  If the backup is unusable too, the
/// primary's error is returned.
pub fn recover(path: &Path) -> Result<Vault> {
    let err = match load(path) {
        Ok(vault) => return Ok(vault),
        Err(err) => err,
    };
    if !left_by_crash(path, &err) {
        return Err(err);
    }

    let backup = backup_path(path);
    if !backup.exists() {
        return Err(err);
    }
    match load(&backup) {
        Ok(vault) => {
            warn!(
                vault = %path.display(),
                error = %err,
                "primary vault missing or truncated, loaded backup copy"
            );
            Ok(vault)
        }
        Err(_) => Err(err),
    }
}

fn left_by_crash(path: &Path, err: &VaultError) -> bool {
    match err {
        VaultError::VaultNotFound(_) => true,
        VaultError::Format(_) => fs::metadata(path)
            .map(|meta| meta.len() < format::MIN_FILE_LEN as u64)
            .unwrap_or(false),
        _ => false,
    }
}

/// Overwrite the backup copy with the current primary.
///
/// Called after a password rotation commits, so the backup never holds the
/// identity wrapped under a retired password.  The copy goes through its
/// own temp file and rename, so the backup is never torn.
pub fn refresh_backup(path: &Path) -> Result<()> {
    let backup = backup_path(path);
    let temp = backup_temp_path(path);

    let bytes = fs::read(path)?;
    let mut file = open_private(&temp)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    fs::rename(&temp, &backup)?;
    sync_parent_dir(path)?;

    debug!(backup = %backup.display(), "refreshed vault backup");
    Ok(())
}

/// Write `vault` to `path` atomically, keeping the previous version as a
/// backup.
pub fn save(vault: &Vault, path: &Path) -> Result<()> {
    stage(vault, path)?.commit()
}

/// A fully written and synced temp file that has not replaced the vault
/// yet.  Dropping it without `commit` deletes the temp file.
#[derive(Debug)]
pub struct StagedWrite {
    target: PathBuf,
    temp: PathBuf,
    committed: bool,
}

/// Encode `vault` and write it to the staging path next to `path`.
pub fn stage(vault: &Vault, path: &Path) -> Result<StagedWrite> {
    let bytes = format::encode(vault)?;

    let parent = path.parent().unwrap_or(Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent)?;
    }

    let temp = temp_path(path);
    let mut file = open_private(&temp)?;
    file.write_all(&bytes)?;
    file.sync_all()?;

    debug!(temp = %temp.display(), bytes = bytes.len(), "staged vault write");

    Ok(StagedWrite {
        target: path.to_path_buf(),
        temp,
        committed: false,
    })
}

impl StagedWrite {
    /// Back up the current vault and atomically replace it.
    pub fn commit(mut self) -> Result<()> {
        // A damaged primary must not replace a good backup.
        if load(&self.target).is_ok() {
            let backup = backup_path(&self.target);
            fs::copy(&self.target, &backup)?;
            File::open(&backup)?.sync_all()?;
        }

        fs::rename(&self.temp, &self.target)?;
        self.committed = true;
        sync_parent_dir(&self.target)?;

        debug!(vault = %self.target.display(), "committed vault write");
        Ok(())
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.temp);
        }
    }
}

/// Delete the vault, its backup and any stray staging files.
pub fn remove(path: &Path) -> Result<()> {
    for file in [
        path.to_path_buf(),
        backup_path(path),
        temp_path(path),
        backup_temp_path(path),
    ] {
        match fs::remove_file(&file) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    sync_parent_dir(path)
}

/// Open a file for writing with owner-only permissions on Unix.
fn open_private(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    Ok(options.open(path)?)
}

/// Persist a rename or unlink by syncing the containing directory.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
