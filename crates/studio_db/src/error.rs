//! Error types for the database client

use studio_common::StudioError;
use thiserror::Error;

/// Errors that can occur when working with the database client
#[derive(Debug, Error)]
pub enum DbError {
    /// Error from SQLx
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    /// Error with the database configuration
    #[error("Database configuration error: {0}")]
    ConfigError(String),

    /// Error with database pool creation
    #[error("Database pool error: {0}")]
    PoolError(String),

    /// Error with database query
    #[error("Database query error: {0}")]
    QueryError(String),

    /// A unique constraint rejected the write
    #[error("Duplicate value: {0}")]
    UniqueViolation(String),

    /// A stored value could not be turned back into a record
    #[error("Invalid stored value: {0}")]
    RowMappingError(String),
}

impl DbError {
    /// Classifies a failed statement, separating unique violations from the rest.
    pub fn from_query(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::UniqueViolation(db_err.message().to_string())
            }
            _ => DbError::QueryError(err.to_string()),
        }
    }
}

impl From<DbError> for StudioError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation(message) => StudioError::ConflictError(message),
            DbError::ConfigError(message) => StudioError::ConfigError(message),
            other => StudioError::DatabaseError(other.to_string()),
        }
    }
}
