// File: crates/studio_gcal/src/handlers.rs
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use studio_common::{not_configured, CalendarConfigStore, StudioError};
use studio_config::AppConfig;
use tracing::{info, warn};

use crate::auth::GoogleOAuthClient;
use crate::logic::{DeleteResult, PullReport, PushResult, Reconciler};

// Define shared state needed by GCal handlers
#[derive(Clone)]
pub struct GcalState {
    pub config: Arc<AppConfig>,
    pub reconciler: Arc<Reconciler>,
    pub oauth: Arc<GoogleOAuthClient>,
    pub calendar_config: Arc<dyn CalendarConfigStore>,
}

impl GcalState {
    fn ensure_enabled(&self) -> Result<(), StudioError> {
        if self.config.use_gcal {
            Ok(())
        } else {
            Err(not_configured("GCal service is disabled."))
        }
    }
}

// --- Request / response bodies ---

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AppointmentRef {
    pub appointment_id: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PushEventResponse {
    pub success: bool,
    pub event_id: String,
    pub already_synced: bool,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeleteEventResponse {
    pub success: bool,
    pub result: DeleteResult,
    pub message: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SyncAllResponse {
    pub success: bool,
    pub synced: usize,
    pub failed: usize,
    pub results: Vec<PushResult>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WebhookResponse {
    pub success: bool,
    pub message: String,
    pub report: PullReport,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AuthUrlQuery {
    /// Opaque value echoed back to the callback.
    pub state: Option<String>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct AuthUrlResponse {
    pub auth_url: String,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

// --- Handlers ---

/// Push one appointment to Google Calendar.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/gcal/events",
    request_body = AppointmentRef,
    responses(
        (status = 200, description = "Event created or already linked", body = PushEventResponse),
        (status = 404, description = "Unknown appointment"),
        (status = 409, description = "Another push of this appointment is running"),
        (status = 502, description = "Google rejected the request"),
        (status = 503, description = "Calendar not connected")
    ),
    tag = "GCal"
))]
pub async fn push_event_handler(
    State(state): State<Arc<GcalState>>,
    Json(payload): Json<AppointmentRef>,
) -> Result<Json<PushEventResponse>, StudioError> {
    state.ensure_enabled()?;

    let outcome = state.reconciler.push_one(&payload.appointment_id).await?;
    Ok(Json(PushEventResponse {
        success: true,
        event_id: outcome.event_id,
        already_synced: outcome.already_synced,
    }))
}

/// Remove the calendar event of one appointment.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/gcal/events/delete",
    request_body = AppointmentRef,
    responses(
        (status = 200, description = "Event removed (or never existed)", body = DeleteEventResponse),
        (status = 404, description = "Unknown appointment"),
        (status = 502, description = "Google rejected the request")
    ),
    tag = "GCal"
))]
pub async fn delete_event_handler(
    State(state): State<Arc<GcalState>>,
    Json(payload): Json<AppointmentRef>,
) -> Result<Json<DeleteEventResponse>, StudioError> {
    state.ensure_enabled()?;

    let result = state.reconciler.delete_one(&payload.appointment_id).await?;
    let message = match result {
        DeleteResult::NotSynced => "Appointment was not synced; nothing to delete.",
        DeleteResult::Deleted => "Event deleted successfully.",
        DeleteResult::AlreadyGone => "Event was already deleted.",
    };
    Ok(Json(DeleteEventResponse {
        success: true,
        result,
        message: message.to_string(),
    }))
}

/// Push every scheduled appointment that is not linked yet.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/gcal/sync",
    responses(
        (status = 200, description = "Per-appointment results", body = SyncAllResponse),
        (status = 503, description = "Calendar not connected")
    ),
    tag = "GCal"
))]
pub async fn sync_all_handler(
    State(state): State<Arc<GcalState>>,
) -> Result<Json<SyncAllResponse>, StudioError> {
    state.ensure_enabled()?;

    let report = state.reconciler.push_all().await?;
    Ok(Json(SyncAllResponse {
        success: true,
        synced: report.synced,
        failed: report.failed,
        results: report.results,
    }))
}

/// Google push notification target; pulls remote changes into the store.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/gcal/webhook",
    responses(
        (status = 200, description = "Pull finished", body = WebhookResponse),
        (status = 503, description = "Calendar not connected")
    ),
    tag = "GCal"
))]
pub async fn webhook_handler(
    State(state): State<Arc<GcalState>>,
    headers: HeaderMap,
) -> Result<Json<WebhookResponse>, StudioError> {
    state.ensure_enabled()?;

    if let Some(resource_state) = headers
        .get("x-goog-resource-state")
        .and_then(|v| v.to_str().ok())
    {
        info!("Received Google Calendar notification: {}", resource_state);
    }

    let report = state.reconciler.pull_and_merge().await?;
    Ok(Json(WebhookResponse {
        success: true,
        message: "Sync completed".to_string(),
        report,
    }))
}

/// Consent screen URL for connecting the studio calendar.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/gcal/auth/url",
    params(AuthUrlQuery),
    responses(
        (status = 200, description = "Google consent URL", body = AuthUrlResponse),
        (status = 503, description = "redirect_uri not configured")
    ),
    tag = "GCal"
))]
pub async fn auth_url_handler(
    State(state): State<Arc<GcalState>>,
    Query(query): Query<AuthUrlQuery>,
) -> Result<Json<AuthUrlResponse>, StudioError> {
    state.ensure_enabled()?;

    let auth_url = state.oauth.authorization_url(query.state.as_deref())?;
    Ok(Json(AuthUrlResponse { auth_url }))
}

/// OAuth redirect target: stores the tokens and sends the browser back to the dashboard.
#[axum::debug_handler]
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/gcal/auth/callback",
    params(AuthCallbackQuery),
    responses(
        (status = 303, description = "Redirect to the dashboard"),
        (status = 200, description = "Connected (no dashboard URL configured)"),
        (status = 400, description = "Missing authorization code"),
        (status = 401, description = "Consent denied")
    ),
    tag = "GCal"
))]
pub async fn auth_callback_handler(
    State(state): State<Arc<GcalState>>,
    Query(query): Query<AuthCallbackQuery>,
) -> Result<Response, StudioError> {
    state.ensure_enabled()?;

    if let Some(error) = query.error {
        warn!("Google consent failed: {}", error);
        return Err(StudioError::AuthError(format!("Google consent failed: {}", error)));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| StudioError::ValidationError("Missing authorization code".to_string()))?;

    let tokens = state.oauth.exchange_code(&code).await?;
    state
        .calendar_config
        .store_tokens(&tokens.access_token, tokens.refresh_token.as_deref())
        .await?;
    info!(
        "Google Calendar connected (refresh token received: {})",
        tokens.refresh_token.is_some()
    );

    let dashboard_url = state
        .config
        .gcal
        .as_ref()
        .and_then(|g| g.dashboard_url.as_deref());
    Ok(match dashboard_url {
        Some(url) => {
            let separator = if url.contains('?') { '&' } else { '?' };
            Redirect::to(&format!("{}{}connected=true", url, separator)).into_response()
        }
        None => Json(serde_json::json!({ "success": true, "connected": true })).into_response(),
    })
}
