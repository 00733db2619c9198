// --- File: crates/studio_bookings/src/logic.rs ---
//! Booking rules: request validation and the best-effort calendar mirror
//! around every store write.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use studio_common::{
    Appointment, AppointmentStatus, AppointmentStore, CalendarConfigStore, NewAppointment,
    ServiceType, StudioError,
};
use thiserror::Error;
use tracing::{info, warn};

// --- Error Handling ---
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),
    #[error("Appointment not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StudioError),
}

impl From<BookingError> for StudioError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::Validation(msg) => StudioError::ValidationError(msg),
            BookingError::NotFound(_) => StudioError::NotFoundError(err.to_string()),
            BookingError::Store(inner) => inner,
        }
    }
}

/// Calendar side effects of booking changes. Failures are reported to the
/// caller but never undo the local write.
#[async_trait]
pub trait CalendarMirror: Send + Sync {
    /// Pushes a stored appointment and returns its event id.
    async fn push(&self, appointment_id: &str) -> Result<String, StudioError>;

    /// Removes the appointment's event, if it has one.
    async fn remove(&self, appointment_id: &str) -> Result<(), StudioError>;
}

#[cfg(feature = "gcal")]
#[async_trait]
impl CalendarMirror for studio_gcal::Reconciler {
    async fn push(&self, appointment_id: &str) -> Result<String, StudioError> {
        Ok(self.push_one(appointment_id).await?.event_id)
    }

    async fn remove(&self, appointment_id: &str) -> Result<(), StudioError> {
        self.delete_one(appointment_id).await?;
        Ok(())
    }
}

// --- Request / Response Structs ---

/// Booking wizard submission.
#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateAppointmentRequest {
    /// `YYYY-MM-DD`
    #[cfg_attr(feature = "openapi", schema(example = "2025-03-10"))]
    pub appointment_date: String,
    /// `HH:MM`
    #[cfg_attr(feature = "openapi", schema(example = "14:00"))]
    pub appointment_time: String,
    /// `video`, `photo` or `both`
    pub service_type: String,
    pub client_name: String,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub client_company: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CreateAppointmentResponse {
    pub appointment: Appointment,
    pub calendar_synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_error: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct BookedDatesResponse {
    #[cfg_attr(feature = "openapi", schema(value_type = Vec<String>))]
    pub dates: Vec<NaiveDate>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct CalendarSettingsResponse {
    pub calendar_id: String,
    pub connected: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UpdateCalendarSettingsRequest {
    pub calendar_id: String,
}

// --- Validation ---

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Checks a wizard submission and turns it into a storable appointment.
pub fn validate_new_appointment(
    request: CreateAppointmentRequest,
) -> Result<NewAppointment, BookingError> {
    let client_name = request.client_name.trim();
    if client_name.is_empty() {
        return Err(BookingError::Validation("client_name is required".to_string()));
    }

    let service = request.service_type.trim();
    if service.is_empty() {
        return Err(BookingError::Validation("service_type is required".to_string()));
    }
    let service_type = service.parse::<ServiceType>().map_err(BookingError::Validation)?;

    let appointment_date = NaiveDate::parse_from_str(request.appointment_date.trim(), "%Y-%m-%d")
        .map_err(|_| {
            BookingError::Validation(format!(
                "appointment_date must be YYYY-MM-DD, got '{}'",
                request.appointment_date
            ))
        })?;
    let appointment_time = NaiveTime::parse_from_str(request.appointment_time.trim(), "%H:%M")
        .map_err(|_| {
            BookingError::Validation(format!(
                "appointment_time must be HH:MM, got '{}'",
                request.appointment_time
            ))
        })?;

    Ok(NewAppointment {
        appointment_date,
        appointment_time,
        service_type,
        client_name: client_name.to_string(),
        client_email: optional_text(request.client_email).unwrap_or_default(),
        client_phone: optional_text(request.client_phone),
        client_company: optional_text(request.client_company),
        notes: optional_text(request.notes),
    })
}

fn parse_status(status: Option<&str>) -> Result<Option<AppointmentStatus>, BookingError> {
    status
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<AppointmentStatus>().map_err(BookingError::Validation))
        .transpose()
}

async fn load(store: &dyn AppointmentStore, id: &str) -> Result<Appointment, BookingError> {
    store
        .get(id)
        .await?
        .ok_or_else(|| BookingError::NotFound(id.to_string()))
}

// --- Core Logic ---

/// Stores a `scheduled` appointment, then tries to push it to the calendar.
pub async fn create_appointment(
    store: &dyn AppointmentStore,
    calendar: Option<&dyn CalendarMirror>,
    request: CreateAppointmentRequest,
) -> Result<CreateAppointmentResponse, BookingError> {
    let new = validate_new_appointment(request)?;
    let mut appointment = store.insert(new).await?;
    info!(
        "Booked appointment {} for {} on {} at {}",
        appointment.id,
        appointment.client_name,
        appointment.appointment_date,
        appointment.appointment_time.format("%H:%M")
    );

    let Some(calendar) = calendar else {
        return Ok(CreateAppointmentResponse {
            appointment,
            calendar_synced: false,
            calendar_error: None,
        });
    };

    match calendar.push(&appointment.id).await {
        Ok(event_id) => {
            appointment.external_event_id = Some(event_id);
            Ok(CreateAppointmentResponse {
                appointment,
                calendar_synced: true,
                calendar_error: None,
            })
        }
        Err(e) => {
            warn!("Appointment {} saved but not synced: {}", appointment.id, e);
            Ok(CreateAppointmentResponse {
                appointment,
                calendar_synced: false,
                calendar_error: Some(e.to_string()),
            })
        }
    }
}

/// Dashboard listing, ordered by date then time.
pub async fn list_appointments(
    store: &dyn AppointmentStore,
    status: Option<&str>,
) -> Result<Vec<Appointment>, BookingError> {
    let status = parse_status(status)?;
    Ok(store.list(status).await?)
}

/// Distinct dates that already hold a scheduled appointment.
pub async fn booked_dates(store: &dyn AppointmentStore) -> Result<BookedDatesResponse, BookingError> {
    let mut dates: Vec<NaiveDate> = store
        .list(Some(AppointmentStatus::Scheduled))
        .await?
        .into_iter()
        .map(|a| a.appointment_date)
        .collect();
    dates.dedup();
    Ok(BookedDatesResponse { dates })
}

async fn remove_remote(calendar: Option<&dyn CalendarMirror>, appointment: &Appointment) {
    let Some(calendar) = calendar.filter(|_| appointment.is_synced()) else {
        return;
    };
    if let Err(e) = calendar.remove(&appointment.id).await {
        warn!(
            "Could not remove calendar event of appointment {}: {}",
            appointment.id, e
        );
    }
}

/// Removes the calendar event (best effort), then the appointment itself.
pub async fn delete_appointment(
    store: &dyn AppointmentStore,
    calendar: Option<&dyn CalendarMirror>,
    id: &str,
) -> Result<(), BookingError> {
    let appointment = load(store, id).await?;
    remove_remote(calendar, &appointment).await;

    if !store.delete(id).await? {
        return Err(BookingError::NotFound(id.to_string()));
    }
    info!("Deleted appointment {}", id);
    Ok(())
}

/// Removes the calendar event (best effort) and marks the appointment cancelled.
/// Cancelling twice returns the cancelled appointment unchanged.
pub async fn cancel_appointment(
    store: &dyn AppointmentStore,
    calendar: Option<&dyn CalendarMirror>,
    id: &str,
) -> Result<Appointment, BookingError> {
    let appointment = load(store, id).await?;
    if appointment.status == AppointmentStatus::Cancelled {
        return Ok(appointment);
    }

    remove_remote(calendar, &appointment).await;
    if store.mark_cancelled(id).await? {
        info!("Cancelled appointment {}", id);
    }
    load(store, id).await
}

pub async fn calendar_settings(
    store: &dyn CalendarConfigStore,
) -> Result<CalendarSettingsResponse, BookingError> {
    let config = store.load().await?;
    Ok(CalendarSettingsResponse {
        calendar_id: config.calendar_id().to_string(),
        connected: config.is_connected(),
    })
}

pub async fn update_calendar_settings(
    store: &dyn CalendarConfigStore,
    request: UpdateCalendarSettingsRequest,
) -> Result<CalendarSettingsResponse, BookingError> {
    let calendar_id = request.calendar_id.trim();
    if calendar_id.is_empty() {
        return Err(BookingError::Validation("calendar_id is required".to_string()));
    }
    store.set_calendar_id(calendar_id).await?;
    info!("Calendar id set to {}", calendar_id);
    calendar_settings(store).await
}
