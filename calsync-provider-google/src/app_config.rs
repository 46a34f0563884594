//! App-level configuration for the Google provider.
//!
//! User-provided OAuth credentials stored at:
//!   ~/.config/calsync/providers/google/app_config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3";

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_api_base() -> String {
    GOOGLE_CALENDAR_API.to_string()
}

/// Google OAuth client credentials plus the long-lived refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,
}

impl AppConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        AppConfig {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_url: default_token_url(),
            api_base: default_api_base(),
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&base_dir()?.join("app_config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Google credentials not found.\n\n\
                Create {} with:\n\n\
                client_id = \"your-client-id.apps.googleusercontent.com\"\n\
                client_secret = \"your-client-secret\"\n\
                refresh_token = \"your-refresh-token\"\n\n\
                See https://console.cloud.google.com/apis/credentials for setup.",
                path.display()
            );
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials from {}", path.display()))?;

        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {}", path.display()))?;

        Ok(config)
    }
}

pub fn base_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("calsync")
        .join("providers")
        .join("google"))
}
