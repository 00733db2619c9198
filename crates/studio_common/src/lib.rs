// --- File: crates/studio_common/src/lib.rs ---

pub mod error; // Error handling
pub mod http; // HTTP utilities
pub mod logging; // Logging setup
pub mod memory; // In-memory stores
pub mod models; // Shared records
pub mod services; // Store abstractions


// Re-export error types and utilities for easier access
pub use error::{
    config_error, external_service_error, internal_error, not_configured, HttpStatusCode,
    StudioError,
};

// Re-export HTTP utilities for easier access
pub use http::{
    client::{client_with_timeout, create_client, HTTP_CLIENT},
    IntoHttpResponse,
};

pub use logging::init_with_config;

pub use memory::{InMemoryAppointmentStore, InMemoryCalendarConfigStore};
pub use models::{
    Appointment, AppointmentStatus, CalendarConfig, NewAppointment, ServiceType, ADMIN_CONFIG_ID,
    DEFAULT_CALENDAR_ID,
};
pub use services::{AppointmentStore, CalendarConfigStore};
