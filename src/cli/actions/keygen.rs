use crate::enrol::keys::{generate_key, DEFAULT_KEY_PATH};
use anyhow::{Context, Result};
use std::path::Path;

/// Write a fresh private key to `./private.pem`; never overwrites.
/// # Errors
/// Returns an error if the file already exists or cannot be written.
pub fn execute() -> Result<()> {
    execute_at(Path::new(DEFAULT_KEY_PATH))
}

fn execute_at(path: &Path) -> Result<()> {
    generate_key(path).context("Key generation failed")?;

    println!("Private key written to {}", path.display());

    Ok(())
}
