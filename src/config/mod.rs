//! Project configuration (`.facevault.toml`).

pub mod settings;

pub use settings::Settings;
