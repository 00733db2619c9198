// File: services/studio_backend/src/main.rs
mod app_state;
mod router;

use std::sync::Arc;
use studio_config::load_config;
use tokio::net::TcpListener;
use tracing::{error, info};

use app_state::AppState;
use router::build_router;

#[tokio::main]
async fn main() {
    let config = Arc::new(load_config().expect("Failed to load config"));
    // Held for the lifetime of the process so the file writer keeps flushing
    let _log_guard = studio_common::init_with_config(&config.logging);

    let state = match AppState::new(config.clone()).await {
        Ok(state) => state,
        Err(e) => {
            error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };
    #[cfg(feature = "gcal")]
    info!(
        "Google Calendar sync {}",
        if state.gcal_state.is_some() { "enabled" } else { "disabled" }
    );

    let app = build_router(&state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", addr, e));
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
