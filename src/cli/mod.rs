//! CLI module — Clap argument parser, output helpers, and command implementations.
//!
//! The admin console only ever sees passwords going in and success or an
//! error kind coming out; key material never crosses this boundary.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{VaultError, Result};
use crate::vault::SecureStore;

/// Minimum password length to prevent trivially weak passwords.
const MIN_PASSWORD_LEN: usize = 8;

/// Environment variable holding the current vault password.
pub const PASSWORD_ENV: &str = "FACEVAULT_PASSWORD";

/// Environment variable holding the replacement password for rotation.
pub const NEW_PASSWORD_ENV: &str = "FACEVAULT_NEW_PASSWORD";

/// FaceVault CLI: encrypted face-database and credential vault.
#[derive(Parser)]
#[command(
    name = "facevault",
    about = "Encrypted face-database and credential vault",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the vault file (default: from .facevault.toml)
    #[arg(long, global = true, env = "FACEVAULT_PATH")]
    pub vault: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault with a fresh signing identity
    Init,

    /// Check a password without unlocking
    Verify,

    /// Store a face feature vector (JSON array file) under a name
    Enroll {
        /// Person's name (record id)
        name: String,
        /// Path to a JSON file containing the feature vector
        vector_file: String,
    },

    /// Decrypt and print a stored face vector
    Show {
        /// Person's name
        name: String,
    },

    /// List all records
    List,

    /// Remove a record
    Remove {
        /// Record id
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Change the vault password
    RotatePassword,

    /// Show vault metadata and the public-key fingerprint
    Info,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the vault path from `--vault` or the project settings.
pub fn vault_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.vault {
        return Ok(PathBuf::from(path));
    }
    let cwd = std::env::current_dir()?;
    Ok(Settings::load(&cwd)?.vault_path(&cwd))
}

/// Build a (locked) store handle for the configured vault.
pub fn open_store(cli: &Cli) -> Result<SecureStore> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    Ok(SecureStore::new(vault_path(cli)?, settings.store_options()))
}

/// Build a store handle and unlock it with the current password.
pub fn unlock_store(cli: &Cli) -> Result<(SecureStore, Zeroizing<String>)> {
    let mut store = open_store(cli)?;
    if !store.exists() {
        return Err(VaultError::VaultNotFound(store.path().to_path_buf()));
    }
    let password = prompt_password()?;
    store.unlock(password.as_bytes())?;
    Ok((store, password))
}

/// Get the vault password, trying in order:
/// 1. `FACEVAULT_PASSWORD` env var (scripted use)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter vault password")
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation.
///
/// Respects `env_var` for scripted use.  Enforces a minimum length.
pub fn prompt_new_password(env_var: &str) -> Result<Zeroizing<String>> {
    if let Ok(pw) = std::env::var(env_var) {
        if !pw.is_empty() {
            check_password_strength(&pw)?;
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt("Choose vault password")
            .with_confirmation(
                "Confirm vault password",
                "Passwords do not match, try again",
            )
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;

        if let Err(e) = check_password_strength(&password) {
            output::warning(&format!("{e}. Try again."));
            continue;
        }

        return Ok(Zeroizing::new(password));
    }
}

fn check_password_strength(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(VaultError::CommandFailed(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_strength() {
        assert!(check_password_strength("admin123").is_ok());
        assert!(check_password_strength("Str0ngP@ss!").is_ok());
        assert!(check_password_strength("short").is_err());
    }

    #[test]
    fn explicit_vault_path_wins() {
        let cli = Cli::parse_from(["facevault", "--vault", "/tmp/x.vault", "list"]);
        assert_eq!(vault_path(&cli).unwrap(), PathBuf::from("/tmp/x.vault"));
    }
}
