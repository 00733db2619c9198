
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use fixtures::{config_for, connected_config, scheduled_appointment, test_app, TestApp};
use serde_json::{json, Value};
use studio_common::{AppointmentStatus, AppointmentStore, CalendarConfig, CalendarConfigStore};
use studio_config::GcalConfig;
use studio_gcal::routes::routes;
use tower::ServiceExt;
use wiremock::matchers::{body_string_contains, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.test",
            "expires_in": 3599
        })))
        .mount(server)
        .await;
}

fn router(app: &TestApp) -> Router {
    routes(app.state.clone())
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_push_event_creates_and_links() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "gcal-1" })))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(
        config_for(&server.uri(), true),
        vec![scheduled_appointment("a1", "Ana", None)],
        connected_config(),
    );

    let (status, body) = send(
        router(&app),
        post_json("/gcal/events", json!({ "appointment_id": "a1" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "event_id": "gcal-1", "already_synced": false }));
    let stored = app.appointments.get("a1").await.unwrap().unwrap();
    assert_eq!(stored.external_event_id.as_deref(), Some("gcal-1"));
    let tokens = app.calendar_config.load().await.unwrap();
    assert_eq!(tokens.access_token.as_deref(), Some("ya29.test"));
}

#[tokio::test]
async fn test_push_unknown_appointment_is_404() {
    let server = MockServer::start().await;
    let app = test_app(config_for(&server.uri(), true), Vec::new(), connected_config());

    let (status, body) = send(
        router(&app),
        post_json("/gcal/events", json!({ "appointment_id": "nope" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_disabled_feature_is_503() {
    let server = MockServer::start().await;
    let app = test_app(
        config_for(&server.uri(), false),
        vec![scheduled_appointment("a1", "Ana", None)],
        connected_config(),
    );

    let (status, _) = send(router(&app), post_json("/gcal/sync", json!({}))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_sync_without_connection_is_503() {
    let server = MockServer::start().await;
    let app = test_app(
        config_for(&server.uri(), true),
        vec![scheduled_appointment("a1", "Ana", None)],
        CalendarConfig::default(),
    );

    let (status, body) = send(router(&app), post_json("/gcal/sync", json!({}))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn test_sync_all_reports_per_item() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server).await;
    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "gcal-2" })))
        .mount(&server)
        .await;
    let app = test_app(
        config_for(&server.uri(), true),
        vec![
            scheduled_appointment("a1", "Ana", Some("gcal-1")),
            scheduled_appointment("a2", "Bruno", None),
        ],
        connected_config(),
    );

    let (status, body) = send(router(&app), post_json("/gcal/sync", json!({}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["synced"], json!(2));
    assert_eq!(body["failed"], json!(0));
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_of_missing_remote_event_succeeds() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/calendars/primary/events/gcal-1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let app = test_app(
        config_for(&server.uri(), true),
        vec![scheduled_appointment("a1", "Ana", Some("gcal-1"))],
        connected_config(),
    );

    let (status, body) = send(
        router(&app),
        post_json("/gcal/events/delete", json!({ "appointment_id": "a1" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["result"], json!("already_gone"));
}

#[tokio::test]
async fn test_webhook_pulls_and_merges() {
    let server = MockServer::start().await;
    mock_token_endpoint(&server).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/calendars/primary/events$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "foreign-1",
                    "summary": "Team lunch",
                    "start": { "dateTime": "2099-06-02T12:00:00Z" }
                },
                {
                    "id": "ours-1",
                    "summary": "Captação - Carla",
                    "description": "[booking:v1]\nemail=carla@example.com\nservice=both\n[/booking]",
                    "start": { "dateTime": "2099-06-03T13:00:00Z" }
                }
            ]
        })))
        .mount(&server)
        .await;
    let app = test_app(
        config_for(&server.uri(), true),
        vec![scheduled_appointment("a1", "Ana", Some("gone-1"))],
        connected_config(),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/gcal/webhook")
        .header("x-goog-resource-state", "exists")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router(&app), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Sync completed"));
    assert_eq!(body["report"]["imported"], json!(1));
    assert_eq!(body["report"]["skipped_foreign"], json!(1));
    assert_eq!(body["report"]["cancelled"], json!(1));

    let a1 = app.appointments.get("a1").await.unwrap().unwrap();
    assert_eq!(a1.status, AppointmentStatus::Cancelled);
    let scheduled = app
        .appointments
        .list(Some(AppointmentStatus::Scheduled))
        .await
        .unwrap();
    assert_eq!(scheduled.len(), 1);
    assert_eq!(scheduled[0].client_name, "Carla");
    assert_eq!(scheduled[0].external_event_id.as_deref(), Some("ours-1"));
}

#[tokio::test]
async fn test_auth_url() {
    let server = MockServer::start().await;
    let app = test_app(config_for(&server.uri(), true), Vec::new(), CalendarConfig::default());

    let (status, body) = send(router(&app), get("/gcal/auth/url?state=xyz")).await;

    assert_eq!(status, StatusCode::OK);
    let url = body["auth_url"].as_str().unwrap();
    assert!(url.starts_with(&format!("{}/auth?", server.uri())));
    assert!(url.ends_with("&state=xyz"));
}

#[tokio::test]
async fn test_auth_callback_requires_code() {
    let server = MockServer::start().await;
    let app = test_app(config_for(&server.uri(), true), Vec::new(), CalendarConfig::default());

    let (status, _) = send(router(&app), get("/gcal/auth/callback")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(router(&app), get("/gcal/auth/callback?error=access_denied")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_callback_stores_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.new",
            "refresh_token": "1//new-refresh"
        })))
        .mount(&server)
        .await;
    let app = test_app(config_for(&server.uri(), true), Vec::new(), CalendarConfig::default());

    let (status, body) = send(router(&app), get("/gcal/auth/callback?code=abc")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "connected": true }));
    let stored = app.calendar_config.load().await.unwrap();
    assert_eq!(stored.access_token.as_deref(), Some("ya29.new"));
    assert_eq!(stored.refresh_token.as_deref(), Some("1//new-refresh"));
}

#[tokio::test]
async fn test_auth_callback_redirects_to_dashboard() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "ya29.new"
        })))
        .mount(&server)
        .await;
    let mut gcal = GcalConfig::for_base_url(&server.uri());
    gcal.dashboard_url = Some("https://studio.test/admin?tab=calendar".to_string());
    let config = std::sync::Arc::new(studio_config::AppConfig {
        use_gcal: true,
        gcal: Some(gcal),
        ..studio_config::AppConfig::default()
    });
    let app = test_app(config, Vec::new(), connected_config());

    let response = router(&app)
        .oneshot(get("/gcal/auth/callback?code=abc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://studio.test/admin?tab=calendar&connected=true"
    );
    // No new refresh token: the old one is kept
    let stored = app.calendar_config.load().await.unwrap();
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
}
