//! Cooperative cross-process lock serializing vault writes.
//!
//! The lock is an advisory `flock` on `<name>.lock` next to the vault.  It
//! only excludes other FaceVault writers; readers never take it.  A blocked
//! acquirer polls until its timeout and then gives up with
//! `VaultError::LockTimeout` rather than waiting forever.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::errors::{VaultError, Result};

/// Delay between lock attempts while another writer holds it.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Path of the lock file for a vault: `<name>.lock`.
pub fn lock_path(vault_path: &Path) -> PathBuf {
    let mut name = vault_path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    vault_path.with_file_name(name)
}

/// Guard holding the exclusive vault lock.  Released on drop.
#[derive(Debug)]
pub struct VaultLock {
    file: File,
    path: PathBuf,
}

impl VaultLock {
    /// Acquire the lock for `vault_path`, waiting at most `timeout`.
    pub fn acquire(vault_path: &Path, timeout: Duration) -> Result<Self> {
        let path = lock_path(vault_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let deadline = Instant::now() + timeout;
        loop {
            if try_lock_exclusive(&file)? {
                debug!(lock = %path.display(), "acquired vault lock");
                return Ok(Self { file, path });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(VaultError::LockTimeout(path));
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        let _ = unlock(&self.file);
        debug!(lock = %self.path.display(), "released vault lock");
    }
}

// ── Unix flock ──────────────────────────────────────────────────────────

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> std::io::Result<bool> {
    use std::os::unix::io::AsRawFd;

    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if result == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    if err.kind() == std::io::ErrorKind::WouldBlock {
        Ok(false)
    } else {
        Err(err)
    }
}

#[cfg(unix)]
fn unlock(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;

    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_UN) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

// Elsewhere the single-writer rule is left to the caller.
#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> std::io::Result<bool> {
    Ok(true)
}

#[cfg(not(unix))]
fn unlock(_file: &File) -> std::io::Result<()> {
    Ok(())
}
