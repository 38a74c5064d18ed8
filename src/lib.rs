pub mod cli;
pub mod config;
pub mod crypto;
mod encoding;
pub mod errors;
pub mod faces;
pub mod vault;
