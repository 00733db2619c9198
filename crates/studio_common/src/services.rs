// --- File: crates/studio_common/src/services.rs ---
//! Store abstractions.
//!
//! The reconciler and the HTTP handlers only see these traits, so the SQL
//! repositories in `studio_db` and the in-memory store in [`crate::memory`]
//! are interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::StudioError;
use crate::models::{Appointment, AppointmentStatus, CalendarConfig, NewAppointment};

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Inserts a new `scheduled` appointment without an external event id.
    async fn insert(&self, new: NewAppointment) -> Result<Appointment, StudioError>;

    async fn get(&self, id: &str) -> Result<Option<Appointment>, StudioError>;

    /// Lists appointments ordered by date then time, optionally filtered by status.
    async fn list(&self, status: Option<AppointmentStatus>) -> Result<Vec<Appointment>, StudioError>;

    /// Marks the appointment as being pushed by `claim`, taken at `now`.
    ///
    /// Succeeds only when the appointment exists, has no external event id and
    /// carries no other claim younger than `ttl`. An older claim belongs to a
    /// push that never finished and is taken over. Returns whether the claim
    /// was taken.
    async fn try_claim(
        &self,
        id: &str,
        claim: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, StudioError>;

    /// Drops `claim` if it is still held.
    async fn release_claim(&self, id: &str, claim: &str) -> Result<(), StudioError>;

    /// Stores the remote event id and clears any claim.
    async fn attach_event_id(&self, id: &str, event_id: &str) -> Result<(), StudioError>;

    /// Inserts an appointment pulled from the calendar.
    ///
    /// Returns `false` when an appointment with the same external event id
    /// already exists.
    async fn insert_imported(
        &self,
        new: NewAppointment,
        external_event_id: &str,
    ) -> Result<bool, StudioError>;

    /// Flips a `scheduled` appointment to `cancelled`. Returns whether anything changed.
    async fn mark_cancelled(&self, id: &str) -> Result<bool, StudioError>;

    /// Removes the appointment. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool, StudioError>;
}

#[async_trait]
pub trait CalendarConfigStore: Send + Sync {
    /// Loads the singleton record, or an empty one if it was never written.
    async fn load(&self) -> Result<CalendarConfig, StudioError>;

    async fn store_access_token(&self, access_token: &str) -> Result<(), StudioError>;

    /// Stores tokens from an OAuth code exchange. A `None` refresh token keeps the old one.
    async fn store_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), StudioError>;

    async fn set_calendar_id(&self, calendar_id: &str) -> Result<(), StudioError>;
}
