//! SQL repositories backing the store traits from `studio_common`.

pub mod admin_config_sql;
pub mod appointment_sql;

pub use admin_config_sql::SqlCalendarConfigRepository;
pub use appointment_sql::SqlAppointmentRepository;
