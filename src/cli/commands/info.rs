//! `facevault info` — show vault metadata without unlocking.

use crate::cli::output;
use crate::cli::{vault_path, Cli};
use crate::crypto::PublicIdentity;
use crate::errors::Result;
use crate::vault::file;

/// Execute the `info` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let path = vault_path(cli)?;
    let vault = file::recover(&path)?;
    let header = &vault.header;
    let public = PublicIdentity::from_sec1_bytes(&header.public_key)?;

    output::info(&format!("Vault:        {}", path.display()));
    println!("  Format:       v{}", vault.version);
    println!("  Records:      {}", vault.records.len());
    println!("  KDF:          PBKDF2-HMAC-SHA256, {} iterations", header.kdf_iterations);
    println!("  Fingerprint:  {}", public.fingerprint());
    println!(
        "  Created:      {}",
        header.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(rotated) = header.rotated_at {
        println!(
            "  Rotated:      {}",
            rotated.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}
