use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::kdf::{DEFAULT_ITERATIONS, MIN_ITERATIONS};
use crate::errors::{VaultError, Result};
use crate::vault::StoreOptions;

/// Project-level configuration, loaded from `.facevault.toml`.
///
/// Every field has a sensible default so FaceVault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) holding the vault file.
    #[serde(default = "default_vault_dir")]
    pub vault_dir: String,

    /// File name of the vault inside `vault_dir`.
    #[serde(default = "default_vault_file")]
    pub vault_file: String,

    /// PBKDF2 iteration count for new vaults and password rotations.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// How long to wait for another writer, in milliseconds.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_vault_dir() -> String {
    "data".to_string()
}

fn default_vault_file() -> String {
    "faces.vault".to_string()
}

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

fn default_lock_timeout_ms() -> u64 {
    5_000
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_dir: default_vault_dir(),
            vault_file: default_vault_file(),
            kdf_iterations: default_kdf_iterations(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".facevault.toml";

    /// Load settings from `<project_dir>/.facevault.toml`.
    ///
    /// If the file does not exist, defaults are returned.  If it exists
    /// but cannot be parsed, or asks for a KDF work factor below the
    /// minimum, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.kdf_iterations < MIN_ITERATIONS {
            return Err(VaultError::Config(format!(
                "kdf_iterations must be at least {MIN_ITERATIONS} (got {})",
                settings.kdf_iterations
            )));
        }

        Ok(settings)
    }

    /// Build the full path to the vault file.
    ///
    /// Example: `project_dir/data/faces.vault`
    pub fn vault_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.vault_dir).join(&self.vault_file)
    }

    /// Convert into store-layer options.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            kdf_iterations: self.kdf_iterations,
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
