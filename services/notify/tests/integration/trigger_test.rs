use chrono::{Duration, Utc};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use tidings_notify::broadcaster::Broadcaster;
use tidings_notify::domain::repository::DedupIndex;
use tidings_notify::domain::types::{DEDUP_WINDOW_HOURS, RecipientStatus, TriggerOutcome};
use tidings_notify::error::NotifyServiceError;
use tidings_notify::usecase::trigger::{TriggerInput, TriggerSystemEventUseCase};

use crate::helpers::{FailingDedup, InMemoryStore, system_template};

const LOGIN_EVENT: &str = "user.login.success";

fn vars(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn login_input(user_id: Uuid, dedup_key: Option<&str>) -> TriggerInput {
    TriggerInput {
        event_key: LOGIN_EVENT.to_owned(),
        user_id,
        variables: vars(json!({ "device": "Firefox", "time": "09:00" })),
        dedup_key: dedup_key.map(str::to_owned),
    }
}

fn trigger_with<X: DedupIndex>(
    store: &InMemoryStore,
    dedup: X,
    broadcaster: &Broadcaster,
) -> TriggerSystemEventUseCase<InMemoryStore, InMemoryStore, X> {
    TriggerSystemEventUseCase {
        system_templates: store.clone(),
        notifications: store.clone(),
        dedup,
        broadcaster: broadcaster.clone(),
    }
}

fn seeded_store() -> InMemoryStore {
    InMemoryStore::with_system_templates(vec![system_template(
        LOGIN_EVENT,
        &["device", "time"],
        true,
    )])
}

#[tokio::test]
async fn should_render_and_deliver_system_notification() {
    let store = seeded_store();
    let broadcaster = Broadcaster::default();
    let user = Uuid::new_v4();
    let mut live = broadcaster.subscribe(user);

    let outcome = trigger_with(&store, store.clone(), &broadcaster)
        .execute(login_input(user, None))
        .await
        .unwrap();

    let TriggerOutcome::Delivered(template) = outcome else {
        panic!("expected Delivered, got {outcome:?}");
    };
    assert_eq!(template.creator_id, Uuid::nil());
    assert!(!template.is_draft);
    assert_eq!(template.content.title, "New login from Firefox");
    assert_eq!(template.content.message, "Signed in at 09:00 from Firefox");
    assert_eq!(template.content.thumbnail_url.as_deref(), Some("shield"));
    assert_eq!(
        template.content.metadata.get("event_key").and_then(|v| v.as_str()),
        Some(LOGIN_EVENT)
    );

    let recipients = store.recipients_for(user);
    assert_eq!(recipients.len(), 1);
    assert_eq!(recipients[0].status, RecipientStatus::Delivered);
    assert!(recipients[0].delivered_at.is_some());
    assert!(live.try_recv().is_some());
}

#[tokio::test]
async fn should_suppress_duplicate_within_window() {
    let store = seeded_store();
    let broadcaster = Broadcaster::default();
    let user = Uuid::new_v4();
    let usecase = trigger_with(&store, store.clone(), &broadcaster);

    let first = usecase
        .execute(login_input(user, Some("session-42")))
        .await
        .unwrap();
    let second = usecase
        .execute(login_input(user, Some("session-42")))
        .await
        .unwrap();

    assert!(matches!(first, TriggerOutcome::Delivered(_)));
    assert_eq!(second, TriggerOutcome::Deduped);
    assert_eq!(store.templates().len(), 1);
    assert_eq!(store.recipients_for(user).len(), 1);
}

#[tokio::test]
async fn should_deliver_again_after_dedup_window_expires() {
    let store = seeded_store();
    let broadcaster = Broadcaster::default();
    let user = Uuid::new_v4();
    let usecase = trigger_with(&store, store.clone(), &broadcaster);

    let first = usecase
        .execute(login_input(user, Some("session-42")))
        .await
        .unwrap();
    {
        let mut state = store.state.lock().unwrap();
        let expired = Utc::now() - Duration::hours(DEDUP_WINDOW_HOURS) - Duration::minutes(1);
        for r in state.recipients.iter_mut().filter(|r| r.user_id == user) {
            r.created_at = expired;
        }
    }
    let second = usecase
        .execute(login_input(user, Some("session-42")))
        .await
        .unwrap();

    assert!(matches!(first, TriggerOutcome::Delivered(_)));
    assert!(matches!(second, TriggerOutcome::Delivered(_)));
    assert_eq!(store.templates().len(), 2);
    assert_eq!(store.recipients_for(user).len(), 2);
}

#[tokio::test]
async fn should_not_dedup_across_users() {
    let store = seeded_store();
    let broadcaster = Broadcaster::default();
    let usecase = trigger_with(&store, store.clone(), &broadcaster);

    for _ in 0..2 {
        let outcome = usecase
            .execute(login_input(Uuid::new_v4(), Some("session-42")))
            .await
            .unwrap();
        assert!(matches!(outcome, TriggerOutcome::Delivered(_)));
    }
    assert_eq!(store.templates().len(), 2);
}

#[tokio::test]
async fn should_deliver_when_dedup_index_fails() {
    let store = seeded_store();
    let user = Uuid::new_v4();

    let outcome = trigger_with(&store, FailingDedup, &Broadcaster::default())
        .execute(login_input(user, Some("session-42")))
        .await
        .unwrap();

    assert!(matches!(outcome, TriggerOutcome::Delivered(_)));
    assert_eq!(store.recipients_for(user).len(), 1);
}

#[tokio::test]
async fn should_return_not_found_for_unknown_or_disabled_event() {
    let store = InMemoryStore::with_system_templates(vec![system_template(
        LOGIN_EVENT,
        &[],
        false,
    )]);
    let usecase = trigger_with(&store, store.clone(), &Broadcaster::default());

    let disabled = usecase.execute(login_input(Uuid::new_v4(), None)).await.unwrap();
    let mut unknown_input = login_input(Uuid::new_v4(), None);
    unknown_input.event_key = "nope".to_owned();
    let unknown = usecase.execute(unknown_input).await.unwrap();

    assert_eq!(disabled, TriggerOutcome::NotFound);
    assert_eq!(unknown, TriggerOutcome::NotFound);
    assert!(store.templates().is_empty());
}

#[tokio::test]
async fn should_reject_missing_variable() {
    let store = seeded_store();
    let mut input = login_input(Uuid::new_v4(), None);
    input.variables.remove("time");

    let result = trigger_with(&store, store.clone(), &Broadcaster::default())
        .execute(input)
        .await;

    assert!(
        matches!(result, Err(NotifyServiceError::MissingVariable(ref name)) if name == "time"),
        "expected MissingVariable(time), got {result:?}"
    );
    assert!(store.templates().is_empty());
}

#[tokio::test]
async fn should_keep_template_when_recipient_insert_fails() {
    let store = seeded_store();
    store.state.lock().unwrap().fail_recipient_insert = true;
    let user = Uuid::new_v4();

    let outcome = trigger_with(&store, store.clone(), &Broadcaster::default())
        .execute(login_input(user, None))
        .await
        .unwrap();

    assert!(matches!(outcome, TriggerOutcome::Delivered(_)));
    assert_eq!(store.templates().len(), 1);
    assert!(store.recipients_for(user).is_empty());
}
