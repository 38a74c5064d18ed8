//! `facevault verify` — check a password without unlocking the vault.

use crate::cli::output;
use crate::cli::{open_store, prompt_password, Cli};
use crate::errors::{VaultError, Result};

/// Execute the `verify` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let store = open_store(cli)?;
    if !store.exists() {
        return Err(VaultError::VaultNotFound(store.path().to_path_buf()));
    }

    let password = prompt_password()?;
    if store.verify_password(password.as_bytes())? {
        output::success("Password accepted");
        Ok(())
    } else {
        Err(VaultError::Authentication)
    }
}
