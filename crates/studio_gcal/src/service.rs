// --- File: crates/studio_gcal/src/service.rs ---
//! Google Calendar REST client and the `CalendarProvider` seam the reconciler talks to.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use studio_common::{client_with_timeout, config_error, StudioError};
use studio_config::GcalConfig;
use tracing::{debug, instrument, warn};

use crate::logic::SyncError;

/// Upper bound on followed `nextPageToken`s for one listing.
const MAX_PAGES: usize = 50;

// --- Wire types ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// Set instead of `date_time` for all-day events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// An event as returned by the Calendar API (only the fields we read).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteEvent {
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start: Option<EventDateTime>,
    #[serde(default)]
    pub end: Option<EventDateTime>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

impl RemoteEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

/// Body of an event insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub summary: String,
    pub description: String,
    pub start: EventDateTime,
    pub end: EventDateTime,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<RemoteEvent>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The provider no longer knows the event (404/410).
    AlreadyGone,
}

// --- Provider seam ---

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventPayload,
    ) -> Result<RemoteEvent, SyncError>;

    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<DeleteOutcome, SyncError>;

    /// Lists single (expanded) events ending after `time_min`, ordered by start,
    /// following every result page.
    async fn list_upcoming_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
    ) -> Result<Vec<RemoteEvent>, SyncError>;
}

// --- Google implementation ---

#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &GcalConfig) -> Result<Self, StudioError> {
        let client = client_with_timeout(config.request_timeout_secs)
            .map_err(|e| config_error(format!("HTTP client: {}", e)))?;
        Ok(Self::new(client, &config.api_base_url))
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SyncError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(SyncError::ProviderRequest {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl CalendarProvider for GoogleCalendarClient {
    #[instrument(skip(self, access_token, event), level = "debug")]
    async fn create_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventPayload,
    ) -> Result<RemoteEvent, SyncError> {
        let response = self
            .client
            .post(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await?;

        let created: RemoteEvent = Self::handle_response(response).await?;
        debug!("Created calendar event {}", created.id);
        Ok(created)
    }

    #[instrument(skip(self, access_token), level = "debug")]
    async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<DeleteOutcome, SyncError> {
        let url = format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        );
        let response = self.client.delete(url).bearer_auth(access_token).send().await?;

        let status = response.status();
        // Delete returns 204 No Content on success
        if status.is_success() {
            Ok(DeleteOutcome::Deleted)
        } else if status.as_u16() == 404 || status.as_u16() == 410 {
            warn!("Calendar event {} was already gone ({})", event_id, status);
            Ok(DeleteOutcome::AlreadyGone)
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(SyncError::ProviderRequest {
                status: status.as_u16(),
                message,
            })
        }
    }

    #[instrument(skip(self, access_token), level = "debug")]
    async fn list_upcoming_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
    ) -> Result<Vec<RemoteEvent>, SyncError> {
        let time_min = time_min.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut url = format!(
                "{}?timeMin={}&orderBy=startTime&singleEvents=true&maxResults=250",
                self.events_url(calendar_id),
                urlencoding::encode(&time_min),
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let response = self.client.get(url).bearer_auth(access_token).send().await?;
            let page: EventListResponse = Self::handle_response(response).await?;
            events.extend(page.items);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => {
                    debug!("Fetched {} calendar events", events.len());
                    return Ok(events);
                }
            }
        }

        warn!(
            "Stopped listing calendar events after {} pages ({} events)",
            MAX_PAGES,
            events.len()
        );
        Ok(events)
    }
}
