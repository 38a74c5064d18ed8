//! `facevault show` — decrypt, verify and print one face vector.

use crate::cli::{unlock_store, Cli};
use crate::errors::{VaultError, Result};

/// Execute the `show` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let (store, _password) = unlock_store(cli)?;
    let entry = store.get_face(name)?;

    let json = serde_json::to_string(&entry.vector)
        .map_err(|e| VaultError::Serialization(format!("face vector: {e}")))?;
    println!("{json}");

    Ok(())
}
