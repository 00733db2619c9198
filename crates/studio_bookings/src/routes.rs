// --- File: crates/studio_bookings/src/routes.rs ---
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::{
    booked_dates_handler, cancel_appointment_handler, create_appointment_handler,
    delete_appointment_handler, get_calendar_settings_handler, list_appointments_handler,
    update_calendar_settings_handler, BookingState,
};

/// Booking wizard, dashboard and calendar settings routes.
pub fn routes(state: Arc<BookingState>) -> Router {
    Router::new()
        .route(
            "/appointments",
            post(create_appointment_handler).get(list_appointments_handler),
        )
        .route("/appointments/booked-dates", get(booked_dates_handler))
        .route("/appointments/{id}", delete(delete_appointment_handler))
        .route("/appointments/{id}/cancel", post(cancel_appointment_handler))
        .route(
            "/settings/calendar",
            get(get_calendar_settings_handler).put(update_calendar_settings_handler),
        )
        .with_state(state)
}
