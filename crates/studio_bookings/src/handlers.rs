// --- File: crates/studio_bookings/src/handlers.rs ---
use crate::logic::{
    booked_dates, calendar_settings, cancel_appointment, create_appointment, delete_appointment,
    list_appointments, update_calendar_settings, BookedDatesResponse, CalendarMirror,
    CalendarSettingsResponse, CreateAppointmentRequest, CreateAppointmentResponse,
    UpdateCalendarSettingsRequest,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use studio_common::{Appointment, AppointmentStore, CalendarConfigStore, StudioError};

// State for booking handlers
#[derive(Clone)]
pub struct BookingState {
    pub appointments: Arc<dyn AppointmentStore>,
    pub calendar_config: Arc<dyn CalendarConfigStore>,
    /// Absent when calendar sync is disabled or not configured.
    pub calendar: Option<Arc<dyn CalendarMirror>>,
}

impl BookingState {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        calendar_config: Arc<dyn CalendarConfigStore>,
    ) -> Self {
        Self {
            appointments,
            calendar_config,
            calendar: None,
        }
    }

    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarMirror>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    fn calendar(&self) -> Option<&dyn CalendarMirror> {
        self.calendar.as_deref()
    }
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct ListQuery {
    /// `scheduled` or `cancelled`; all appointments when omitted.
    pub status: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment booked; calendar sync is best effort", body = CreateAppointmentResponse),
        (status = 400, description = "Invalid booking request")
    ),
    tag = "Bookings"
))]
pub async fn create_appointment_handler(
    State(state): State<Arc<BookingState>>,
    Json(payload): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<CreateAppointmentResponse>), StudioError> {
    let response =
        create_appointment(state.appointments.as_ref(), state.calendar(), payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/appointments",
    params(ListQuery),
    responses(
        (status = 200, description = "Appointments ordered by date and time", body = Vec<Appointment>),
        (status = 400, description = "Unknown status filter")
    ),
    tag = "Bookings"
))]
pub async fn list_appointments_handler(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Appointment>>, StudioError> {
    let appointments =
        list_appointments(state.appointments.as_ref(), query.status.as_deref()).await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/appointments/booked-dates",
    responses(
        (status = 200, description = "Dates holding a scheduled appointment", body = BookedDatesResponse)
    ),
    tag = "Bookings"
))]
pub async fn booked_dates_handler(
    State(state): State<Arc<BookingState>>,
) -> Result<Json<BookedDatesResponse>, StudioError> {
    Ok(Json(booked_dates(state.appointments.as_ref()).await?))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment deleted", body = ActionResponse),
        (status = 404, description = "Unknown appointment")
    ),
    tag = "Bookings"
))]
pub async fn delete_appointment_handler(
    State(state): State<Arc<BookingState>>,
    Path(id): Path<String>,
) -> Result<Json<ActionResponse>, StudioError> {
    delete_appointment(state.appointments.as_ref(), state.calendar(), &id).await?;
    Ok(Json(ActionResponse {
        success: true,
        message: "Appointment deleted.".to_string(),
    }))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/appointments/{id}/cancel",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Appointment cancelled", body = Appointment),
        (status = 404, description = "Unknown appointment")
    ),
    tag = "Bookings"
))]
pub async fn cancel_appointment_handler(
    State(state): State<Arc<BookingState>>,
    Path(id): Path<String>,
) -> Result<Json<Appointment>, StudioError> {
    let appointment =
        cancel_appointment(state.appointments.as_ref(), state.calendar(), &id).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/settings/calendar",
    responses(
        (status = 200, description = "Selected calendar and connection state", body = CalendarSettingsResponse)
    ),
    tag = "Settings"
))]
pub async fn get_calendar_settings_handler(
    State(state): State<Arc<BookingState>>,
) -> Result<Json<CalendarSettingsResponse>, StudioError> {
    Ok(Json(calendar_settings(state.calendar_config.as_ref()).await?))
}

#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    put,
    path = "/settings/calendar",
    request_body = UpdateCalendarSettingsRequest,
    responses(
        (status = 200, description = "Calendar id saved", body = CalendarSettingsResponse),
        (status = 400, description = "Empty calendar id")
    ),
    tag = "Settings"
))]
pub async fn update_calendar_settings_handler(
    State(state): State<Arc<BookingState>>,
    Json(payload): Json<UpdateCalendarSettingsRequest>,
) -> Result<Json<CalendarSettingsResponse>, StudioError> {
    let settings = update_calendar_settings(state.calendar_config.as_ref(), payload).await?;
    Ok(Json(settings))
}
