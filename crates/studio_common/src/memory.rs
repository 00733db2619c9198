// --- File: crates/studio_common/src/memory.rs ---
//! In-memory stores, used when no database is configured and in tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{internal_error, StudioError};
use crate::models::{Appointment, AppointmentStatus, CalendarConfig, NewAppointment};
use crate::services::{AppointmentStore, CalendarConfigStore};

#[derive(Debug, Clone)]
struct StoredAppointment {
    appointment: Appointment,
    /// Claim token and when it was taken.
    claim: Option<(String, DateTime<Utc>)>,
}

#[derive(Debug, Default)]
pub struct InMemoryAppointmentStore {
    rows: Mutex<HashMap<String, StoredAppointment>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a fully formed appointment (tests and fixtures).
    pub fn with_appointments(appointments: Vec<Appointment>) -> Self {
        let rows = appointments
            .into_iter()
            .map(|a| {
                (
                    a.id.clone(),
                    StoredAppointment {
                        appointment: a,
                        claim: None,
                    },
                )
            })
            .collect();
        Self {
            rows: Mutex::new(rows),
        }
    }

    fn rows(&self) -> Result<MutexGuard<'_, HashMap<String, StoredAppointment>>, StudioError> {
        self.rows
            .lock()
            .map_err(|_| internal_error("appointment store lock poisoned"))
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, new: NewAppointment) -> Result<Appointment, StudioError> {
        let appointment = new.into_appointment(Uuid::new_v4().to_string(), None, Utc::now());
        self.rows()?.insert(
            appointment.id.clone(),
            StoredAppointment {
                appointment: appointment.clone(),
                claim: None,
            },
        );
        Ok(appointment)
    }

    async fn get(&self, id: &str) -> Result<Option<Appointment>, StudioError> {
        Ok(self.rows()?.get(id).map(|row| row.appointment.clone()))
    }

    async fn list(&self, status: Option<AppointmentStatus>) -> Result<Vec<Appointment>, StudioError> {
        let mut appointments: Vec<Appointment> = self
            .rows()?
            .values()
            .filter(|row| status.map_or(true, |s| row.appointment.status == s))
            .map(|row| row.appointment.clone())
            .collect();
        appointments.sort_by(|a, b| {
            (a.appointment_date, a.appointment_time).cmp(&(b.appointment_date, b.appointment_time))
        });
        Ok(appointments)
    }

    async fn try_claim(
        &self,
        id: &str,
        claim: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, StudioError> {
        let mut rows = self.rows()?;
        let Some(row) = rows.get_mut(id) else {
            return Ok(false);
        };
        let free = match &row.claim {
            None => true,
            Some((_, taken_at)) => *taken_at < now - ttl,
        };
        if row.appointment.external_event_id.is_none() && free {
            row.claim = Some((claim.to_string(), now));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn release_claim(&self, id: &str, claim: &str) -> Result<(), StudioError> {
        if let Some(row) = self.rows()?.get_mut(id) {
            if row.claim.as_ref().is_some_and(|(held, _)| held == claim) {
                row.claim = None;
            }
        }
        Ok(())
    }

    async fn attach_event_id(&self, id: &str, event_id: &str) -> Result<(), StudioError> {
        let mut rows = self.rows()?;
        if rows
            .values()
            .any(|row| row.appointment.id != id && row.appointment.external_event_id.as_deref() == Some(event_id))
        {
            return Err(StudioError::ConflictError(format!(
                "event {} is already linked to another appointment",
                event_id
            )));
        }
        if let Some(row) = rows.get_mut(id) {
            row.appointment.external_event_id = Some(event_id.to_string());
            row.claim = None;
        }
        Ok(())
    }

    async fn insert_imported(
        &self,
        new: NewAppointment,
        external_event_id: &str,
    ) -> Result<bool, StudioError> {
        let mut rows = self.rows()?;
        if rows
            .values()
            .any(|row| row.appointment.external_event_id.as_deref() == Some(external_event_id))
        {
            return Ok(false);
        }
        let appointment = new.into_appointment(
            Uuid::new_v4().to_string(),
            Some(external_event_id.to_string()),
            Utc::now(),
        );
        rows.insert(
            appointment.id.clone(),
            StoredAppointment {
                appointment,
                claim: None,
            },
        );
        Ok(true)
    }

    async fn mark_cancelled(&self, id: &str) -> Result<bool, StudioError> {
        match self.rows()?.get_mut(id) {
            Some(row) if row.appointment.status == AppointmentStatus::Scheduled => {
                row.appointment.status = AppointmentStatus::Cancelled;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StudioError> {
        Ok(self.rows()?.remove(id).is_some())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryCalendarConfigStore {
    config: Mutex<CalendarConfig>,
}

impl InMemoryCalendarConfigStore {
    pub fn new(config: CalendarConfig) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    fn config(&self) -> Result<MutexGuard<'_, CalendarConfig>, StudioError> {
        self.config
            .lock()
            .map_err(|_| internal_error("calendar config lock poisoned"))
    }
}

#[async_trait]
impl CalendarConfigStore for InMemoryCalendarConfigStore {
    async fn load(&self) -> Result<CalendarConfig, StudioError> {
        Ok(self.config()?.clone())
    }

    async fn store_access_token(&self, access_token: &str) -> Result<(), StudioError> {
        self.config()?.access_token = Some(access_token.to_string());
        Ok(())
    }

    async fn store_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), StudioError> {
        let mut config = self.config()?;
        config.access_token = Some(access_token.to_string());
        if let Some(refresh_token) = refresh_token {
            config.refresh_token = Some(refresh_token.to_string());
        }
        Ok(())
    }

    async fn set_calendar_id(&self, calendar_id: &str) -> Result<(), StudioError> {
        self.config()?.calendar_id = Some(calendar_id.to_string());
        Ok(())
    }
}
