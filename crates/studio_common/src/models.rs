// --- File: crates/studio_common/src/models.rs ---

// Records shared by the store, the calendar sync and the booking endpoints.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed id of the single calendar configuration row.
pub const ADMIN_CONFIG_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Calendar used when none has been selected.
pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// What the client booked.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Video,
    Photo,
    Both,
}

impl ServiceType {
    pub const ALL: [ServiceType; 3] = [ServiceType::Video, ServiceType::Photo, ServiceType::Both];

    /// Stored and wire code: `video`, `photo` or `both`.
    pub fn as_code(&self) -> &'static str {
        match self {
            ServiceType::Video => "video",
            ServiceType::Photo => "photo",
            ServiceType::Both => "both",
        }
    }

    /// Human label written into calendar event descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Video => "Captação de Vídeo",
            ServiceType::Photo => "Captação de Fotografia",
            ServiceType::Both => "Vídeo + Fotografia",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_code() == code)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| format!("unknown service type '{}'", s))
    }
}

/// Appointment lifecycle. `Cancelled` is terminal.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("unknown appointment status '{}'", other)),
        }
    }
}

/// A studio session as stored locally.
///
/// `external_event_id` is set once the appointment has been pushed to (or
/// imported from) the calendar; its presence alone means "synced".
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = Date))]
    pub appointment_date: NaiveDate,
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "14:00:00"))]
    pub appointment_time: NaiveTime,
    pub service_type: ServiceType,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub external_event_id: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = DateTime))]
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn is_synced(&self) -> bool {
        self.external_event_id.is_some()
    }
}

/// Fields needed to create an appointment; the store assigns id, status and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub service_type: ServiceType,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,
    pub notes: Option<String>,
}

impl NewAppointment {
    /// Materializes a `scheduled` appointment with the given id.
    pub fn into_appointment(
        self,
        id: String,
        external_event_id: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Appointment {
        Appointment {
            id,
            appointment_date: self.appointment_date,
            appointment_time: self.appointment_time,
            service_type: self.service_type,
            client_name: self.client_name,
            client_email: self.client_email,
            client_phone: self.client_phone,
            client_company: self.client_company,
            notes: self.notes,
            status: AppointmentStatus::Scheduled,
            external_event_id,
            created_at,
        }
    }
}

/// The singleton calendar connection record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CalendarConfig {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub calendar_id: Option<String>,
}

impl CalendarConfig {
    pub fn calendar_id(&self) -> &str {
        self.calendar_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_CALENDAR_ID)
    }

    pub fn is_connected(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
