// --- File: crates/studio_bookings/src/lib.rs ---
#[cfg(feature = "openapi")]
pub mod doc;
pub mod handlers;
pub mod logic;
pub mod routes;

pub use handlers::BookingState; // State for this crate's handlers
pub use logic::{BookingError, CalendarMirror};
pub use routes::routes;
