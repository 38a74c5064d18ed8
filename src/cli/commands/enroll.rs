//! `facevault enroll` — store a face feature vector under a name.

use std::fs;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{unlock_store, Cli};
use crate::errors::{VaultError, Result};
use crate::faces::FaceEntry;

/// Execute the `enroll` command.
pub fn execute(cli: &Cli, name: &str, vector_file: &str) -> Result<()> {
    // Parse the vector before asking for a password so typos fail fast.
    let raw = Zeroizing::new(fs::read_to_string(vector_file).map_err(|e| {
        VaultError::CommandFailed(format!("cannot read {vector_file}: {e}"))
    })?);
    let vector: Vec<f64> = serde_json::from_str(&raw).map_err(|e| {
        VaultError::Serialization(format!("{vector_file}: expected a JSON array of numbers: {e}"))
    })?;
    let entry = FaceEntry::new(name, vector)?;

    let (mut store, _password) = unlock_store(cli)?;
    let replaced = store.contains_record(name)?;
    store.put_face(&entry)?;

    let verb = if replaced { "Updated" } else { "Enrolled" };
    output::success(&format!(
        "{verb} '{name}' ({} features)",
        entry.vector.len()
    ));

    Ok(())
}
