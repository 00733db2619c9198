// --- File: crates/studio_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

// --- Database Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub url: String, // e.g. sqlite:data/studio.db, overridden via STUDIO__DATABASE__URL
    #[serde(default)]
    pub max_connections: Option<u32>,
}

// --- Logging Config ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// When set, logs are also written to a daily rolling file in this directory.
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

// --- Google Calendar Config ---
// OAuth client credentials plus the event conventions shared with the calendar.
// Secret loaded from env var when the file says "secret_from_env": GCAL_CLIENT_SECRET
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GcalConfig {
    pub client_id: String,
    pub client_secret: String,
    /// OAuth callback registered with Google, e.g. https://studio.example/api/gcal/auth/callback
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// IANA zone used for every event we push and for decoding pulled events.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Summaries of our events look like "<prefix> - <client name>".
    #[serde(default = "default_summary_prefix")]
    pub summary_prefix: String,
    /// Where the OAuth callback sends the browser once tokens are stored.
    #[serde(default)]
    pub dashboard_url: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl GcalConfig {
    /// Builds a config pointing both Google endpoints at `base_url` (used by tests
    /// that stand up a mock server).
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            redirect_uri: Some(format!("{}/callback", base_url)),
            token_url: format!("{}/token", base_url),
            auth_url: format!("{}/auth", base_url),
            api_base_url: base_url.to_string(),
            time_zone: default_time_zone(),
            summary_prefix: default_summary_prefix(),
            dashboard_url: None,
            request_timeout_secs: None,
        }
    }
}

// --- Unified App Configuration ---
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    // Server config is mandatory
    pub server: ServerConfig,

    // --- Runtime Flags (optional in config file, default to false) ---
    #[serde(default)]
    pub use_gcal: bool,

    // --- Optional Feature Configurations ---
    #[serde(default)]
    pub database: Option<DatabaseConfig>, // In-memory store when absent
    #[serde(default)]
    pub gcal: Option<GcalConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8086,
            },
            use_gcal: false,
            database: None,
            gcal: None,
            logging: LoggingConfig::default(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_time_zone() -> String {
    "America/Sao_Paulo".to_string()
}

fn default_summary_prefix() -> String {
    "Captação".to_string()
}
