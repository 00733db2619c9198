//! Database integration for the studio backend
//!
//! SQLx-backed implementations of the `AppointmentStore` and
//! `CalendarConfigStore` traits. The pool goes through `sqlx::Any`, so the
//! backend is chosen by the URL scheme (`sqlite:` by default, `postgres:` with
//! the `postgres` feature).
//!
//! # Example
//!
//! ```rust,no_run
//! use studio_config::DatabaseConfig;
//! use studio_db::{DbClient, SqlAppointmentRepository};
//!
//! async fn setup() -> Result<SqlAppointmentRepository, studio_db::DbError> {
//!     let config = DatabaseConfig {
//!         url: "sqlite::memory:".to_string(),
//!         max_connections: None,
//!     };
//!     let client = DbClient::from_config(&config).await?;
//!     let repo = SqlAppointmentRepository::new(client);
//!     repo.init_schema().await?;
//!     Ok(repo)
//! }
//! ```

pub mod client;
pub mod error;
pub mod repositories;

pub use client::DbClient;
pub use error::DbError;
pub use repositories::{SqlAppointmentRepository, SqlCalendarConfigRepository};

/// Connects and creates both tables. Returns the two repositories ready to use.
pub async fn connect_and_migrate(
    config: &studio_config::DatabaseConfig,
) -> Result<(SqlAppointmentRepository, SqlCalendarConfigRepository), DbError> {
    let client = DbClient::from_config(config).await?;
    let appointments = SqlAppointmentRepository::new(client.clone());
    appointments.init_schema().await?;
    let calendar = SqlCalendarConfigRepository::new(client);
    calendar.init_schema().await?;
    Ok((appointments, calendar))
}
