use std::time::Duration;

use serde_json::{Map, Value, json};
use uuid::Uuid;

use tidings_notify::broadcaster::Broadcaster;
use tidings_notify::domain::email::EMAIL_NOTICE_MESSAGE;
use tidings_notify::domain::types::RecipientStatus;
use tidings_notify::error::NotifyServiceError;
use tidings_notify::usecase::email::{SendEmailInput, SendEmailNoticeUseCase};

use crate::helpers::{InMemoryStore, MockMailer};

fn context(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn usecase(
    mailer: &MockMailer,
    store: &InMemoryStore,
    broadcaster: &Broadcaster,
) -> SendEmailNoticeUseCase<MockMailer, InMemoryStore> {
    SendEmailNoticeUseCase {
        mailer: mailer.clone(),
        notifications: store.clone(),
        broadcaster: broadcaster.clone(),
        timeout: Duration::from_secs(5),
    }
}

fn reset_input(user_id: Uuid) -> SendEmailInput {
    SendEmailInput {
        user_id,
        email: "ana@example.com".to_owned(),
        email_type: "password_reset".to_owned(),
        context: context(json!({ "reset_link": "https://app.example.com/reset?t=abc" })),
    }
}

#[tokio::test]
async fn should_send_email_and_record_in_app_notice() {
    let mailer = MockMailer::new();
    let store = InMemoryStore::new();
    let broadcaster = Broadcaster::default();
    let user = Uuid::new_v4();
    let mut live = broadcaster.subscribe(user);

    usecase(&mailer, &store, &broadcaster)
        .execute(reset_input(user))
        .unwrap()
        .await
        .unwrap();

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ana@example.com");
    assert_eq!(sent[0].subject, "Reset Your Password");
    assert!(sent[0].body.contains("https://app.example.com/reset?t=abc"));

    let templates = store.templates();
    assert_eq!(templates.len(), 1);
    let notice = &templates[0];
    assert!(!notice.is_draft);
    assert_eq!(notice.content.title, "Reset Your Password");
    assert_eq!(notice.content.message, EMAIL_NOTICE_MESSAGE);
    assert_eq!(notice.content.action_links.len(), 1);
    assert_eq!(
        notice.content.metadata.get("email_type").and_then(|v| v.as_str()),
        Some("password_reset")
    );

    let rows = store.recipients_for(user);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, RecipientStatus::Delivered);
    assert!(live.try_recv().is_some());
}

#[tokio::test]
async fn should_still_record_notice_when_smtp_fails() {
    let mailer = MockMailer::failing();
    let store = InMemoryStore::new();
    let user = Uuid::new_v4();

    usecase(&mailer, &store, &Broadcaster::default())
        .execute(reset_input(user))
        .unwrap()
        .await
        .unwrap();

    assert!(mailer.sent().is_empty());
    assert_eq!(store.recipients_for(user).len(), 1);
}

#[tokio::test]
async fn should_reject_unsupported_email_type_before_sending() {
    let mailer = MockMailer::new();
    let store = InMemoryStore::new();
    let mut input = reset_input(Uuid::new_v4());
    input.email_type = "newsletter".to_owned();

    let result = usecase(&mailer, &store, &Broadcaster::default()).execute(input);

    assert!(
        matches!(result, Err(NotifyServiceError::Validation(ref m)) if m.contains("unsupported email type")),
        "expected Validation, got {:?}",
        result.as_ref().err()
    );
    assert!(mailer.sent().is_empty());
    assert!(store.templates().is_empty());
}

#[tokio::test]
async fn should_reject_malformed_otp() {
    let mailer = MockMailer::new();
    let store = InMemoryStore::new();
    let input = SendEmailInput {
        user_id: Uuid::new_v4(),
        email: "ana@example.com".to_owned(),
        email_type: "otp".to_owned(),
        context: context(json!({ "otp": "12ab56" })),
    };

    let result = usecase(&mailer, &store, &Broadcaster::default()).execute(input);

    assert!(matches!(result, Err(NotifyServiceError::Validation(_))));
}

#[tokio::test]
async fn should_reject_invalid_recipient_address() {
    let mailer = MockMailer::new();
    let store = InMemoryStore::new();
    let mut input = reset_input(Uuid::new_v4());
    input.email = "not-an-address".to_owned();

    let result = usecase(&mailer, &store, &Broadcaster::default()).execute(input);

    assert!(matches!(result, Err(NotifyServiceError::Validation(_))));
}
