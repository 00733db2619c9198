// --- File: crates/studio_common/src/http/client.rs ---
use once_cell::sync::Lazy;
use reqwest::{Client, Error as ReqwestError};
use std::time::Duration;
use tracing::warn;

/// Default timeout for outbound HTTP requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A shared HTTP client with the default timeout.
pub static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    create_client(DEFAULT_TIMEOUT_SECS).unwrap_or_else(|e| {
        warn!("Falling back to an unconfigured HTTP client: {}", e);
        Client::new()
    })
});

/// Creates a new HTTP client with the given timeout.
pub fn create_client(timeout_secs: u64) -> Result<Client, ReqwestError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Returns the shared client, or a dedicated one when a non-default timeout is requested.
pub fn client_with_timeout(timeout_secs: Option<u64>) -> Result<Client, ReqwestError> {
    match timeout_secs {
        Some(secs) if secs != DEFAULT_TIMEOUT_SECS => create_client(secs),
        _ => Ok(HTTP_CLIENT.clone()),
    }
}
