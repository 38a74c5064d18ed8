//! `facevault remove` — delete a record from the vault.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{unlock_store, Cli};
use crate::errors::{VaultError, Result};

/// Execute the `remove` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Remove record '{name}'?"))
            .default(false)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    let (mut store, _password) = unlock_store(cli)?;
    store.remove_record(name)?;

    output::success(&format!("Removed record '{name}'"));
    Ok(())
}
