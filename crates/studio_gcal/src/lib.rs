// --- File: crates/studio_gcal/src/lib.rs ---
// Declare modules within this crate
pub mod auth;
pub mod doc;
pub mod handlers;
pub mod logic;
#[cfg(test)]
mod logic_test;
pub mod mapper;
pub mod routes;
pub mod service;

pub use auth::{GoogleOAuthClient, TokenRefresher};
pub use handlers::GcalState;
pub use logic::{DeleteResult, PullReport, PushAllReport, PushOutcome, Reconciler, SyncError};
pub use mapper::MapperSettings;
pub use routes::routes;
pub use service::{CalendarProvider, GoogleCalendarClient};
