// --- File: crates/studio_gcal/src/auth.rs ---
//! OAuth2 against Google's token endpoint: refresh-token grant, consent URL and
//! authorization-code exchange.

use async_trait::async_trait;
use serde::Deserialize;
use studio_common::{client_with_timeout, config_error, StudioError};
use studio_config::GcalConfig;
use tracing::{debug, error};

use crate::logic::SyncError;

/// Scope needed to create, delete and list events.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

/// Exchanges a stored refresh token for a short-lived access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, SyncError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct GoogleOAuthClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    auth_url: String,
    redirect_uri: Option<String>,
}

impl GoogleOAuthClient {
    pub fn new(client: reqwest::Client, config: &GcalConfig) -> Self {
        Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            auth_url: config.auth_url.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    pub fn from_config(config: &GcalConfig) -> Result<Self, StudioError> {
        let client = client_with_timeout(config.request_timeout_secs)
            .map_err(|e| config_error(format!("HTTP client: {}", e)))?;
        Ok(Self::new(client, config))
    }

    /// Builds the consent screen URL. `offline` access plus `prompt=consent`
    /// make Google hand out a refresh token every time.
    pub fn authorization_url(&self, state: Option<&str>) -> Result<String, SyncError> {
        let redirect_uri = self.redirect_uri.as_deref().ok_or(SyncError::NotConfigured)?;

        let mut url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(CALENDAR_SCOPE),
        );
        if let Some(state) = state {
            url.push_str(&format!("&state={}", urlencoding::encode(state)));
        }
        Ok(url)
    }

    /// Trades the code from the consent redirect for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, SyncError> {
        let redirect_uri = self.redirect_uri.as_deref().ok_or(SyncError::NotConfigured)?;
        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];
        self.token_request(&params, "authorization code exchange").await
    }

    async fn token_request(
        &self,
        params: &[(&str, &str)],
        what: &str,
    ) -> Result<TokenResponse, SyncError> {
        let response = self.client.post(&self.token_url).form(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Google {} failed with {}: {}", what, status, body);
            return Err(SyncError::AuthRefresh(format!("{}: {}", status, body)));
        }

        let tokens: TokenResponse = response.json().await?;
        debug!("Google {} succeeded (expires_in={:?})", what, tokens.expires_in);
        Ok(tokens)
    }
}

#[async_trait]
impl TokenRefresher for GoogleOAuthClient {
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, SyncError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let tokens = self.token_request(&params, "token refresh").await?;
        Ok(tokens.access_token)
    }
}
