// --- File: crates/services/studio_backend/src/router.rs ---
use axum::{routing::get, Router};
use http::{header, HeaderValue, Method};
use std::sync::Arc;
use studio_bookings::BookingState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::app_state::AppState;

fn booking_state(state: &AppState) -> BookingState {
    #[allow(unused_mut)] // for the features it needs to be mutable
    let mut booking_state =
        BookingState::new(state.appointments.clone(), state.calendar_config.clone());
    #[cfg(feature = "gcal")]
    if let Some(gcal_state) = &state.gcal_state {
        booking_state = booking_state.with_calendar(gcal_state.reconciler.clone());
    }
    booking_state
}

/// Browser origins allowed to call the API; any origin when none are configured.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(allowed))
    }
}

/// The full application: every feature router nested under `/api`.
pub fn build_router(state: &AppState) -> Router {
    let api_router = Router::new()
        .route("/", get(|| async { "Welcome to the Studio API!" }))
        .route("/health", get(|| async { "ok" }))
        .merge(studio_bookings::routes(Arc::new(booking_state(state))));

    let api_router = Router::new().nest("/api", {
        #[allow(unused_mut)] // for the features it needs to be mutable
        let mut router = api_router;
        #[cfg(feature = "gcal")]
        if let Some(gcal_state) = &state.gcal_state {
            router = router.merge(studio_gcal::routes(gcal_state.clone()));
        }
        router
    });

    #[allow(unused_mut)]
    let mut app = api_router;

    // Conditionally add Swagger UI and JSON endpoint if openapi feature enabled
    #[cfg(feature = "openapi")]
    {
        use studio_bookings::doc::BookingsApiDoc;
        #[cfg(feature = "gcal")]
        use studio_gcal::doc::GcalApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "Studio API",
                version = "0.1.0",
                description = "Studio booking and calendar sync API",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
            servers( (url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(BookingsApiDoc::openapi());
        #[cfg(feature = "gcal")]
        openapi_doc.merge(GcalApiDoc::openapi());
        tracing::info!("Adding Swagger UI at /api/docs");

        let swagger_ui = SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc);
        app = app.merge(swagger_ui);
    }

    app.layer(cors_layer(&state.config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
}
