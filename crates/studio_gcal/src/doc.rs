// File: crates/studio_gcal/src/doc.rs

#![cfg(feature = "openapi")]
use utoipa::OpenApi;

use crate::handlers::{
    AppointmentRef, AuthUrlResponse, DeleteEventResponse, PushEventResponse, SyncAllResponse,
    WebhookResponse,
};
use crate::logic::{DeleteResult, PullReport, PushResult};

/// OpenAPI documentation for the Google Calendar sync API
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::push_event_handler,
        crate::handlers::delete_event_handler,
        crate::handlers::sync_all_handler,
        crate::handlers::webhook_handler,
        crate::handlers::auth_url_handler,
        crate::handlers::auth_callback_handler
    ),
    components(
        schemas(
            AppointmentRef,
            PushEventResponse,
            DeleteEventResponse,
            DeleteResult,
            SyncAllResponse,
            PushResult,
            WebhookResponse,
            PullReport,
            AuthUrlResponse
        )
    ),
    tags(
        (name = "GCal", description = "Appointment sync with Google Calendar")
    )
)]
pub struct GcalApiDoc;
