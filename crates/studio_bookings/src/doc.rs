// --- File: crates/studio_bookings/src/doc.rs ---
use utoipa::OpenApi;

use crate::handlers::ActionResponse;
use crate::logic::{
    BookedDatesResponse, CalendarSettingsResponse, CreateAppointmentRequest,
    CreateAppointmentResponse, UpdateCalendarSettingsRequest,
};
use studio_common::{Appointment, AppointmentStatus, ServiceType};

/// OpenAPI documentation for the booking and settings endpoints
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::create_appointment_handler,
        crate::handlers::list_appointments_handler,
        crate::handlers::booked_dates_handler,
        crate::handlers::delete_appointment_handler,
        crate::handlers::cancel_appointment_handler,
        crate::handlers::get_calendar_settings_handler,
        crate::handlers::update_calendar_settings_handler
    ),
    components(
        schemas(
            Appointment,
            AppointmentStatus,
            ServiceType,
            CreateAppointmentRequest,
            CreateAppointmentResponse,
            BookedDatesResponse,
            CalendarSettingsResponse,
            UpdateCalendarSettingsRequest,
            ActionResponse
        )
    ),
    tags(
        (name = "Bookings", description = "Booking wizard and appointment dashboard"),
        (name = "Settings", description = "Calendar selection and connection state")
    )
)]
pub struct BookingsApiDoc;
