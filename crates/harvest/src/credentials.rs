//! OAuth client credential loading
//!
//! Supports loading Google OAuth credentials from (in order of priority):
//! 1. Compile-time embedded credentials (for production builds)
//! 2. JSON file (Google Cloud Console format) in the sift config directory
//! 3. Runtime environment variables (fallback)
//!
//! A missing credential is fatal: the pipeline stops here, before any
//! network call is made.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Credentials filename in the sift config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// OAuth client credentials for Google API access
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct CredentialFile {
    installed: Option<ClientEntry>,
    web: Option<ClientEntry>,
}

#[derive(Deserialize)]
struct ClientEntry {
    client_id: String,
    client_secret: String,
}

impl GoogleCredentials {
    /// Load credentials using the priority order documented above.
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let file: CredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(file);
        }

        Self::from_env()
    }

    /// Credentials embedded at compile time via environment variables.
    /// Build with: GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Parse credentials from a JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(file)
    }

    /// Load credentials from runtime environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .context("GOOGLE_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .context("GOOGLE_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    // Both "installed" (desktop) and "web" credential types are accepted.
    fn from_credential_file(file: CredentialFile) -> Result<Self> {
        let entry = file
            .installed
            .or(file.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: entry.client_id,
            client_secret: entry.client_secret,
        })
    }

    /// The default credentials file path (~/.config/sift/google-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}
