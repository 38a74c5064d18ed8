//! `facevault init` — create a new vault with a fresh signing identity.

use crate::cli::output;
use crate::cli::{open_store, prompt_new_password, Cli, PASSWORD_ENV};
use crate::errors::{VaultError, Result};

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let mut store = open_store(cli)?;

    // 1. Refuse to overwrite an existing vault.
    if store.exists() {
        output::tip("Use `facevault rotate-password` to change the password of an existing vault.");
        return Err(VaultError::AlreadyExists(store.path().to_path_buf()));
    }

    // 2. Prompt for a new password (with confirmation).
    let password = prompt_new_password(PASSWORD_ENV)?;

    // 3. Generate the identity and write the empty vault.
    store.initialize(password.as_bytes())?;
    let fingerprint = store.public_identity()?.fingerprint();

    output::success(&format!("Vault created at {}", store.path().display()));
    output::info(&format!("Public key fingerprint: {fingerprint}"));
    output::tip("Run `facevault enroll <NAME> <VECTOR.json>` to add faces.");

    Ok(())
}
