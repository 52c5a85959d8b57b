use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};

use tidings_notify::broadcaster::Broadcaster;
use tidings_notify::infra::mail::{SmtpMailer, SmtpSettings};
use tidings_notify::router::build_router;
use tidings_notify::state::AppState;
use tidings_testing::auth::MockAuth;

const SERVICE_TOKEN: &str = "test-service-token";

fn test_state(broadcaster: Broadcaster) -> AppState {
    let mailer = SmtpMailer::new(&SmtpSettings {
        host: "localhost".to_owned(),
        port: 2525,
        username: None,
        password: None,
        from: "Tidings <no-reply@example.com>".to_owned(),
    })
    .unwrap();
    AppState {
        db: DatabaseConnection::Disconnected,
        broadcaster,
        mailer,
        profiles: None,
        service_token: SERVICE_TOKEN.to_owned(),
        side_effect_timeout: Duration::from_secs(1),
    }
}

fn server(broadcaster: Broadcaster) -> TestServer {
    TestServer::new(build_router(test_state(broadcaster))).unwrap()
}

fn as_identity(mut request: TestRequest, auth: &MockAuth) -> TestRequest {
    for (name, value) in auth.header_pairs() {
        request = request.add_header(name, value);
    }
    request
}

fn with_service_token(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static("x-service-token"),
        HeaderValue::from_str(token).unwrap(),
    )
}

#[tokio::test]
async fn should_answer_liveness_probe() {
    let server = server(Broadcaster::default());
    server.get("/healthz").await.assert_status_ok();
}

#[tokio::test]
async fn should_echo_request_id_header() {
    let server = server(Broadcaster::default());
    let response = server.get("/healthz").await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn should_reject_feed_without_identity_headers() {
    let server = server(Broadcaster::default());
    server
        .get("/users/@me/notifications")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn should_forbid_admin_routes_for_normal_users() {
    let server = server(Broadcaster::default());
    let user = MockAuth::user();

    let list = as_identity(server.get("/admin/notifications"), &user).await;
    let broadcast = as_identity(server.post("/admin/broadcast"), &user)
        .json(&json!({ "event_type": "maintenance" }))
        .await;

    list.assert_status(StatusCode::FORBIDDEN);
    broadcast.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(broadcast.json::<Value>()["kind"], "FORBIDDEN");
}

#[tokio::test]
async fn should_broadcast_to_connected_clients() {
    let broadcaster = Broadcaster::default();
    let mut first = broadcaster.subscribe(uuid::Uuid::new_v4());
    let _second = broadcaster.subscribe(uuid::Uuid::new_v4());
    let server = server(broadcaster);

    let response = as_identity(server.post("/admin/broadcast"), &MockAuth::admin())
        .json(&json!({ "event_type": "maintenance", "payload": { "minutes": 5 } }))
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["delivered"], 2);
    let event = first.try_recv().expect("broadcast event");
    assert_eq!(event.event_type, "maintenance");
}

#[tokio::test]
async fn should_reject_broadcast_without_event_type() {
    let server = server(Broadcaster::default());
    let response = as_identity(server.post("/admin/broadcast"), &MockAuth::admin())
        .json(&json!({ "event_type": "  " }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["kind"], "VALIDATION");
}

#[tokio::test]
async fn should_reject_service_call_without_token() {
    let server = server(Broadcaster::default());
    let body = json!({ "event_key": "user.login.success", "user_id": uuid::Uuid::new_v4() });

    let missing = server.post("/svc/notifications/trigger").json(&body).await;
    let wrong = with_service_token(server.post("/svc/notifications/trigger"), "nope")
        .json(&body)
        .await;

    missing.assert_status(StatusCode::UNAUTHORIZED);
    wrong.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        missing.json::<Value>()["message"],
        "unauthorized: missing service token"
    );
    assert_eq!(
        wrong.json::<Value>()["message"],
        "unauthorized: invalid service token"
    );
}

#[tokio::test]
async fn should_reject_unsupported_email_type_synchronously() {
    let server = server(Broadcaster::default());
    let response = with_service_token(server.post("/svc/notifications/email"), SERVICE_TOKEN)
        .json(&json!({
            "user_id": uuid::Uuid::new_v4(),
            "email": "ana@example.com",
            "email_type": "newsletter",
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn should_reject_user_sync_when_profile_service_is_not_configured() {
    let server = server(Broadcaster::default());
    let response = with_service_token(server.post("/svc/users/sync"), SERVICE_TOKEN)
        .json(&json!({}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
