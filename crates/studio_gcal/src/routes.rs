// --- File: crates/studio_gcal/src/routes.rs ---

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use studio_common::{AppointmentStore, CalendarConfigStore, StudioError};
use studio_config::{AppConfig, GcalConfig};

use crate::auth::GoogleOAuthClient;
use crate::handlers::{
    auth_callback_handler, auth_url_handler, delete_event_handler, push_event_handler,
    sync_all_handler, webhook_handler, GcalState,
};
use crate::logic::Reconciler;
use crate::mapper::MapperSettings;
use crate::service::GoogleCalendarClient;

impl GcalState {
    /// Wires the Google clients and the reconciler from the `[gcal]` config section.
    pub fn from_config(
        config: Arc<AppConfig>,
        gcal_config: &GcalConfig,
        appointments: Arc<dyn AppointmentStore>,
        calendar_config: Arc<dyn CalendarConfigStore>,
    ) -> Result<Self, StudioError> {
        let oauth = Arc::new(GoogleOAuthClient::from_config(gcal_config)?);
        let provider = Arc::new(GoogleCalendarClient::from_config(gcal_config)?);
        let settings = MapperSettings::from_config(gcal_config)?;

        let reconciler = Arc::new(Reconciler::new(
            appointments,
            calendar_config.clone(),
            oauth.clone(),
            provider,
            settings,
        ));

        Ok(Self {
            config,
            reconciler,
            oauth,
            calendar_config,
        })
    }
}

/// Creates a router containing all routes for the Google Calendar feature.
pub fn routes(state: Arc<GcalState>) -> Router {
    Router::new()
        .route("/gcal/events", post(push_event_handler))
        .route("/gcal/events/delete", post(delete_event_handler))
        .route("/gcal/sync", post(sync_all_handler))
        .route("/gcal/webhook", post(webhook_handler))
        .route("/gcal/auth/url", get(auth_url_handler))
        .route("/gcal/auth/callback", get(auth_callback_handler))
        .with_state(state)
}
