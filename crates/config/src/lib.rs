//! Configuration directory helpers for sift
//!
//! All persistent configuration (OAuth client credentials, cached tokens)
//! lives in a single shared directory (~/.config/sift/). This crate owns
//! that path and the JSON load/save plumbing around it.
//!
//! Call [`init`] at application startup to bootstrap the directory.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Initialize the sift config directory.
///
/// Creates ~/.config/sift/ if it doesn't exist.
/// Call this once at application startup.
pub fn init() -> Result<PathBuf> {
    ensure_config_dir()
}

/// Get the sift config directory (~/.config/sift/)
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sift"))
}

/// Get the path to a file within the sift config directory
pub fn config_path(filename: &str) -> Option<PathBuf> {
    config_dir().map(|p| p.join(filename))
}

/// Check if a file exists in the sift config directory
pub fn config_exists(filename: &str) -> bool {
    config_path(filename).is_some_and(|p| p.exists())
}

/// Load and parse a JSON file from the sift config directory
pub fn load_json<T: DeserializeOwned>(filename: &str) -> Result<T> {
    let path = config_path(filename).context("Could not determine config directory")?;
    load_json_file(&path)
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Save a value as pretty-printed JSON into the sift config directory
pub fn save_json<T: Serialize>(filename: &str, value: &T) -> Result<()> {
    let dir = ensure_config_dir()?;
    let path = dir.join(filename);
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

/// Remove a file from the sift config directory, if present
pub fn remove(filename: &str) -> Result<()> {
    let path = config_path(filename).context("Could not determine config directory")?;
    if path.exists() {
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure the sift config directory exists
pub fn ensure_config_dir() -> Result<PathBuf> {
    let dir = config_dir().context("Could not determine config directory")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    Ok(dir)
}
