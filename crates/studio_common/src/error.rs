// --- File: crates/studio_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type shared by all studio crates.
///
/// Feature crates keep their own error enums and convert into this one at the
/// HTTP boundary (`impl From<SyncError> for StudioError`, ...).
#[derive(Error, Debug)]
pub enum StudioError {
    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A feature was called before it was set up (e.g. calendar not connected)
    #[error("Not configured: {0}")]
    NotConfiguredError(String),

    /// Error occurred during authentication or authorization
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error occurred during database operation
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Error occurred during external service call
    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    /// Error occurred due to a conflict (e.g., a sync already running)
    #[error("Conflict: {0}")]
    ConflictError(String),

    /// Error occurred due to a resource not being found
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A trait for converting errors to HTTP status codes.
pub trait HttpStatusCode {
    /// Returns the HTTP status code for this error.
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for StudioError {
    fn status_code(&self) -> u16 {
        match self {
            StudioError::ParseError(_) => 400,
            StudioError::ConfigError(_) => 500,
            StudioError::NotConfiguredError(_) => 503,
            StudioError::AuthError(_) => 401,
            StudioError::ValidationError(_) => 400,
            StudioError::DatabaseError(_) => 500,
            StudioError::ExternalServiceError { .. } => 502,
            StudioError::ConflictError(_) => 409,
            StudioError::NotFoundError(_) => 404,
            StudioError::InternalError(_) => 500,
        }
    }
}

// Utility functions for error handling
pub fn config_error<T: fmt::Display>(message: T) -> StudioError {
    StudioError::ConfigError(message.to_string())
}

pub fn not_configured<T: fmt::Display>(message: T) -> StudioError {
    StudioError::NotConfiguredError(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> StudioError {
    StudioError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> StudioError {
    StudioError::InternalError(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StudioError::NotFoundError("appointment x".into()).status_code(), 404);
        assert_eq!(StudioError::ValidationError("bad date".into()).status_code(), 400);
        assert_eq!(not_configured("calendar").status_code(), 503);
        assert_eq!(StudioError::ConflictError("sync running".into()).status_code(), 409);
        assert_eq!(
            external_service_error("Google Calendar", "500").status_code(),
            502
        );
    }

    #[test]
    fn test_display_includes_service_name() {
        let err = external_service_error("Google Calendar", "quota exceeded");
        assert_eq!(
            err.to_string(),
            "External service error: Google Calendar - quota exceeded"
        );
    }
}
