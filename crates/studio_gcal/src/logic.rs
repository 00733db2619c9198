// --- File: crates/studio_gcal/src/logic.rs ---
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use studio_common::{
    Appointment, AppointmentStatus, AppointmentStore, CalendarConfigStore, StudioError,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::TokenRefresher;
use crate::mapper::{
    decode_event, encode_event, is_ours, session_length, DecodeError, MapperSettings,
};
use crate::service::{CalendarProvider, DeleteOutcome};

// --- Error Handling ---
use thiserror::Error;
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to refresh Google access token: {0}")]
    AuthRefresh(String),
    #[error("Google Calendar request failed ({status}): {message}")]
    ProviderRequest { status: u16, message: String },
    #[error("Google Calendar not connected")]
    NotConfigured,
    #[error("Appointment not found: {0}")]
    NotFound(String),
    #[error("Google Calendar unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Could not decode calendar event: {0}")]
    Decode(#[from] DecodeError),
    #[error("Appointment {0} is already being synced")]
    SyncInProgress(String),
    #[error(transparent)]
    Store(#[from] StudioError),
}

impl From<SyncError> for StudioError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::NotConfigured => StudioError::NotConfiguredError(err.to_string()),
            SyncError::NotFound(_) => StudioError::NotFoundError(err.to_string()),
            SyncError::SyncInProgress(_) => StudioError::ConflictError(err.to_string()),
            SyncError::AuthRefresh(_) => studio_common::external_service_error("Google OAuth", err),
            SyncError::ProviderRequest { .. } | SyncError::Transport(_) => {
                studio_common::external_service_error("Google Calendar", err)
            }
            SyncError::Decode(_) => StudioError::ParseError(err.to_string()),
            SyncError::Store(inner) => inner,
        }
    }
}

// --- Reports ---

#[derive(Serialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PushOutcome {
    pub event_id: String,
    /// True when the appointment was linked before this call and nothing was sent.
    pub already_synced: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PushResult {
    pub appointment_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PushAllReport {
    pub synced: usize,
    pub failed: usize,
    pub results: Vec<PushResult>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum DeleteResult {
    /// The appointment never reached the calendar.
    NotSynced,
    Deleted,
    /// The remote event had already been removed.
    AlreadyGone,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PullReport {
    pub imported: usize,
    pub skipped_foreign: usize,
    pub skipped_known: usize,
    /// Unknown events of ours that ended before the pull started.
    pub skipped_past: usize,
    pub cancelled: usize,
    pub failed: usize,
}

/// Access token and calendar for one sync operation.
struct CalendarSession {
    access_token: String,
    calendar_id: String,
}

/// How long a push may hold its claim before another push takes it over.
const DEFAULT_CLAIM_TTL_MINUTES: i64 = 10;

/// Keeps local appointments and calendar events aligned.
///
/// Every public operation refreshes the access token first and writes it back
/// to the configuration store; nothing is cached between calls.
pub struct Reconciler {
    appointments: Arc<dyn AppointmentStore>,
    calendar_config: Arc<dyn CalendarConfigStore>,
    refresher: Arc<dyn TokenRefresher>,
    provider: Arc<dyn CalendarProvider>,
    settings: MapperSettings,
    claim_ttl: Duration,
}

impl Reconciler {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        calendar_config: Arc<dyn CalendarConfigStore>,
        refresher: Arc<dyn TokenRefresher>,
        provider: Arc<dyn CalendarProvider>,
        settings: MapperSettings,
    ) -> Self {
        Self {
            appointments,
            calendar_config,
            refresher,
            provider,
            settings,
            claim_ttl: Duration::minutes(DEFAULT_CLAIM_TTL_MINUTES),
        }
    }

    /// Claims older than `ttl` are treated as left behind by a crashed push.
    pub fn with_claim_ttl(mut self, ttl: Duration) -> Self {
        self.claim_ttl = ttl;
        self
    }

    pub fn settings(&self) -> &MapperSettings {
        &self.settings
    }

    async fn open_session(&self) -> Result<CalendarSession, SyncError> {
        let config = self.calendar_config.load().await?;
        let refresh_token = config
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(SyncError::NotConfigured)?;

        let access_token = self.refresher.refresh_access_token(refresh_token).await?;
        self.calendar_config.store_access_token(&access_token).await?;

        Ok(CalendarSession {
            access_token,
            calendar_id: config.calendar_id().to_string(),
        })
    }

    async fn load_appointment(&self, appointment_id: &str) -> Result<Appointment, SyncError> {
        self.appointments
            .get(appointment_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(appointment_id.to_string()))
    }

    /// Creates the remote event for one appointment.
    ///
    /// Already linked appointments return their id without any network call.
    pub async fn push_one(&self, appointment_id: &str) -> Result<PushOutcome, SyncError> {
        let appointment = self.load_appointment(appointment_id).await?;
        if let Some(event_id) = appointment.external_event_id {
            debug!("Appointment {} already synced as {}", appointment_id, event_id);
            return Ok(PushOutcome {
                event_id,
                already_synced: true,
            });
        }

        let session = self.open_session().await?;
        self.push_with_session(&appointment, &session).await
    }

    async fn push_with_session(
        &self,
        appointment: &Appointment,
        session: &CalendarSession,
    ) -> Result<PushOutcome, SyncError> {
        let claim = Uuid::new_v4().to_string();
        let claimed = self
            .appointments
            .try_claim(&appointment.id, &claim, Utc::now(), self.claim_ttl)
            .await?;
        if !claimed {
            // Either another push holds the claim or it finished meanwhile
            let current = self.load_appointment(&appointment.id).await?;
            return match current.external_event_id {
                Some(event_id) => Ok(PushOutcome {
                    event_id,
                    already_synced: true,
                }),
                None => Err(SyncError::SyncInProgress(appointment.id.clone())),
            };
        }

        let payload = encode_event(appointment, &self.settings);
        let created = match self
            .provider
            .create_event(&session.access_token, &session.calendar_id, &payload)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                error!("Failed to create event for appointment {}: {}", appointment.id, e);
                self.release(&appointment.id, &claim).await;
                return Err(e);
            }
        };

        if let Err(e) = self.appointments.attach_event_id(&appointment.id, &created.id).await {
            error!(
                "Event {} created but could not be linked to appointment {}: {}",
                created.id, appointment.id, e
            );
            self.release(&appointment.id, &claim).await;
            return Err(e.into());
        }

        info!("Appointment {} synced as event {}", appointment.id, created.id);
        Ok(PushOutcome {
            event_id: created.id,
            already_synced: false,
        })
    }

    async fn release(&self, appointment_id: &str, claim: &str) {
        if let Err(e) = self.appointments.release_claim(appointment_id, claim).await {
            warn!("Could not release sync claim on {}: {}", appointment_id, e);
        }
    }

    /// Pushes every scheduled appointment. Item failures are reported, never fatal.
    pub async fn push_all(&self) -> Result<PushAllReport, SyncError> {
        let session = self.open_session().await?;
        let scheduled = self
            .appointments
            .list(Some(AppointmentStatus::Scheduled))
            .await?;

        let mut report = PushAllReport::default();
        for appointment in &scheduled {
            let outcome = match &appointment.external_event_id {
                Some(event_id) => Ok(PushOutcome {
                    event_id: event_id.clone(),
                    already_synced: true,
                }),
                None => self.push_with_session(appointment, &session).await,
            };

            match outcome {
                Ok(outcome) => {
                    report.synced += 1;
                    report.results.push(PushResult {
                        appointment_id: appointment.id.clone(),
                        success: true,
                        event_id: Some(outcome.event_id),
                        error: None,
                    });
                }
                Err(e) => {
                    warn!("Push of appointment {} failed: {}", appointment.id, e);
                    report.failed += 1;
                    report.results.push(PushResult {
                        appointment_id: appointment.id.clone(),
                        success: false,
                        event_id: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        info!(
            "Push-all finished: {} synced, {} failed",
            report.synced, report.failed
        );
        Ok(report)
    }

    /// Removes the remote event of an appointment. A missing remote event counts as success.
    pub async fn delete_one(&self, appointment_id: &str) -> Result<DeleteResult, SyncError> {
        let appointment = self.load_appointment(appointment_id).await?;
        let Some(event_id) = appointment.external_event_id else {
            return Ok(DeleteResult::NotSynced);
        };

        let session = self.open_session().await?;
        let outcome = self
            .provider
            .delete_event(&session.access_token, &session.calendar_id, &event_id)
            .await?;

        info!("Calendar event {} for appointment {} removed", event_id, appointment_id);
        Ok(match outcome {
            DeleteOutcome::Deleted => DeleteResult::Deleted,
            DeleteOutcome::AlreadyGone => DeleteResult::AlreadyGone,
        })
    }

    pub async fn pull_and_merge(&self) -> Result<PullReport, SyncError> {
        self.pull_and_merge_at(Utc::now()).await
    }

    /// Imports our upcoming events that are not known locally, then cancels
    /// every scheduled, linked appointment whose event is gone.
    ///
    /// The fetch reaches back to the oldest such appointment, so each one the
    /// pass may cancel was inside the fetched window.
    pub async fn pull_and_merge_at(&self, now: DateTime<Utc>) -> Result<PullReport, SyncError> {
        let session = self.open_session().await?;
        let local = self.appointments.list(None).await?;

        let window_start = local
            .iter()
            .filter(|a| a.status == AppointmentStatus::Scheduled && a.external_event_id.is_some())
            .filter_map(|a| {
                self.settings
                    .appointment_start(a.appointment_date, a.appointment_time)
            })
            .map(|start| start.with_timezone(&Utc))
            .fold(now, |earliest, start| earliest.min(start));

        let events = self
            .provider
            .list_upcoming_events(&session.access_token, &session.calendar_id, window_start)
            .await?;
        info!(
            "Found {} events in Google Calendar since {}",
            events.len(),
            window_start
        );

        let mut known: HashSet<String> = local
            .iter()
            .filter_map(|a| a.external_event_id.clone())
            .collect();
        let fetched: HashSet<&str> = events
            .iter()
            .filter(|e| !e.is_cancelled())
            .map(|e| e.id.as_str())
            .collect();

        let mut report = PullReport::default();
        for event in events.iter().filter(|e| !e.is_cancelled()) {
            if !is_ours(event, &self.settings) {
                report.skipped_foreign += 1;
                continue;
            }
            if known.contains(&event.id) {
                report.skipped_known += 1;
                continue;
            }

            let new = match decode_event(event, &self.settings) {
                Ok(Some(new)) => new,
                Ok(None) => {
                    report.skipped_foreign += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Skipping event {}: {}", event.id, e);
                    report.failed += 1;
                    continue;
                }
            };

            let ended = self
                .settings
                .appointment_start(new.appointment_date, new.appointment_time)
                .is_some_and(|start| start.with_timezone(&Utc) + session_length() <= now);
            if ended {
                debug!("Not importing past event {}", event.id);
                report.skipped_past += 1;
                continue;
            }

            match self.appointments.insert_imported(new, &event.id).await {
                Ok(true) => {
                    info!("Imported event {} from Google Calendar", event.id);
                    known.insert(event.id.clone());
                    report.imported += 1;
                }
                Ok(false) => report.skipped_known += 1,
                Err(e) => {
                    error!("Failed to import event {}: {}", event.id, e);
                    report.failed += 1;
                }
            }
        }

        for appointment in local
            .iter()
            .filter(|a| a.status == AppointmentStatus::Scheduled)
        {
            let Some(event_id) = appointment.external_event_id.as_deref() else {
                continue;
            };
            if fetched.contains(event_id) {
                continue;
            }

            match self.appointments.mark_cancelled(&appointment.id).await {
                Ok(true) => {
                    info!(
                        "Cancelled appointment {}: event {} deleted from Google Calendar",
                        appointment.id, event_id
                    );
                    report.cancelled += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    error!("Failed to cancel appointment {}: {}", appointment.id, e);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Pull finished: {} imported, {} cancelled, {} failed",
            report.imported, report.cancelled, report.failed
        );
        Ok(report)
    }
}
