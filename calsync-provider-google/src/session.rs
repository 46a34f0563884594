//! Creates a valid Google session (access token) that we can use to call the gcal API

use async_trait::async_trait;
use calsync_core::{Connector, RemoteError};
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::app_config::AppConfig;
use crate::client::GoogleCalendar;

/// A bearer token obtained from the refresh-token exchange.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

impl Session {
    /// Fails with [`RemoteError::Decode`] when `expires_in` does not fit a timestamp.
    pub fn new(access_token: impl Into<String>, expires_in: i64) -> Result<Self, RemoteError> {
        let expires_at = Duration::try_seconds(expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| RemoteError::Decode(format!("Invalid token lifetime: {expires_in}")))?;

        Ok(Session {
            access_token: access_token.into(),
            expires_at,
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Exchange the configured refresh token for a fresh access token.
    pub async fn refresh(http: &reqwest::Client, config: &AppConfig) -> Result<Self, RemoteError> {
        debug!(token_url = %config.token_url, "refreshing Google access token");

        let response = http
            .post(&config.token_url)
            .form(&[
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("refresh_token", config.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("Failed to send refresh request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    RemoteError::Unauthorized(format!("Failed to refresh token: {error_text}"))
                }
                _ => RemoteError::Http {
                    status: status.as_u16(),
                    message: format!("Failed to refresh token: {error_text}"),
                },
            });
        }

        let refresh_data: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(format!("Failed to parse refresh response: {e}")))?;

        Session::new(refresh_data.access_token, refresh_data.expires_in)
    }
}

/// Authenticates against Google and hands out [`GoogleCalendar`] clients.
pub struct GoogleConnector {
    config: AppConfig,
    http: reqwest::Client,
}

impl GoogleConnector {
    pub fn new(config: AppConfig) -> Self {
        GoogleConnector {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use the credentials from `~/.config/calsync/providers/google/app_config.toml`.
    pub fn from_app_config() -> anyhow::Result<Self> {
        Ok(Self::new(AppConfig::load()?))
    }
}

#[async_trait]
impl Connector for GoogleConnector {
    type Client = GoogleCalendar;

    async fn connect(&self) -> Result<GoogleCalendar, RemoteError> {
        let session = Session::refresh(&self.http, &self.config).await?;
        info!(expires_at = %session.expires_at(), "authenticated with Google Calendar");
        GoogleCalendar::new(self.http.clone(), &self.config.api_base, session)
    }
}
