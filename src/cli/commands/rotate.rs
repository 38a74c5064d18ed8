//! `facevault rotate-password` — change the vault password.
//!
//! The identity is kept; it is re-wrapped under a key derived from a new
//! salt, and every record is re-encrypted before the single atomic save.

use crate::cli::output;
use crate::cli::{prompt_new_password, unlock_store, Cli, NEW_PASSWORD_ENV};
use crate::errors::Result;

/// Execute the `rotate-password` command.
pub fn execute(cli: &Cli) -> Result<()> {
    // 1. Unlock with the current password.
    output::info("Enter your current vault password.");
    let (mut store, old_password) = unlock_store(cli)?;

    // 2. Prompt for the new password.
    output::info("Choose your new vault password.");
    let new_password = prompt_new_password(NEW_PASSWORD_ENV)?;

    // 3. Re-key and save atomically.
    store.rotate_password(old_password.as_bytes(), new_password.as_bytes())?;
    let count = store.list_records()?.len();
    store.lock();

    output::success(&format!(
        "Password rotated ({count} record(s) re-encrypted)"
    ));
    Ok(())
}
