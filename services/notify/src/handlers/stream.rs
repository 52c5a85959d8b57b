//! `GET /users/@me/notifications/stream`: server-sent events.
//!
//! The connection is registered with the broadcaster before the snapshot is
//! read, so nothing published in between is lost. The client receives the
//! newest feed rows (oldest first), a `ready` event, then live events.

use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{SecondsFormat, Utc};
use futures::stream::{self, Stream, StreamExt as _};
use serde_json::json;
use uuid::Uuid;

use tidings_auth_types::identity::IdentityHeaders;
use tidings_domain::pagination::PageRequest;

use crate::broadcaster::{LiveEvent, LivePayload, NOTIFICATION_CREATED, Subscription};
use crate::domain::repository::RecipientRepository;
use crate::domain::types::{FeedEntry, NotificationTemplate, STREAM_SNAPSHOT_LIMIT};
use crate::error::NotifyServiceError;
use crate::handlers::response::NotificationResponse;
use crate::state::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// One frame of a live feed connection.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    Snapshot(NotificationTemplate),
    Ready,
    Live(LiveEvent),
}

/// Replay `snapshot` (newest first) oldest first, then `Ready`, then whatever
/// `subscription` receives. The subscription must already be registered
/// when the snapshot is read; events published meanwhile stay buffered in
/// its queue and follow `Ready`.
pub async fn live_feed<F>(
    subscription: Subscription,
    snapshot: F,
) -> Result<impl Stream<Item = FeedFrame>, NotifyServiceError>
where
    F: Future<Output = Result<Vec<FeedEntry>, NotifyServiceError>>,
{
    let mut entries = snapshot.await?;
    entries.reverse();
    tracing::debug!(
        user_id = %subscription.user_id(),
        snapshot = entries.len(),
        "live stream opened"
    );

    let replay = entries
        .into_iter()
        .map(|entry| FeedFrame::Snapshot(entry.notification));
    Ok(stream::iter(replay)
        .chain(stream::once(async { FeedFrame::Ready }))
        .chain(subscription.map(FeedFrame::Live)))
}

pub async fn stream_notifications(
    identity: IdentityHeaders,
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, NotifyServiceError> {
    let user_id = identity.user_id;
    let subscription = state.broadcaster.subscribe(user_id);

    let repo = state.recipient_repo();
    let page = PageRequest::new(Some(STREAM_SNAPSHOT_LIMIT as u32), Some(1));
    let frames = live_feed(subscription, async move {
        repo.list(user_id, page).await.map_err(NotifyServiceError::from)
    })
    .await?;

    let events = frames.map(move |frame| Ok(frame_event(frame, user_id)));
    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

fn frame_event(frame: FeedFrame, user_id: Uuid) -> Event {
    match frame {
        FeedFrame::Snapshot(notification) => notification_event(NOTIFICATION_CREATED, notification),
        FeedFrame::Ready => Event::default().event("ready").data(
            json!({
                "status": "connected",
                "at": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                "message": "notification stream ready",
                "user_id": user_id,
            })
            .to_string(),
        ),
        FeedFrame::Live(event) => live_event(event),
    }
}

fn notification_event(event_type: &str, notification: NotificationTemplate) -> Event {
    let body = serde_json::to_string(&NotificationResponse::from(notification))
        .unwrap_or_else(|_| "{}".to_owned());
    Event::default().event(event_type).data(body)
}

fn live_event(event: LiveEvent) -> Event {
    match event.payload {
        LivePayload::Notification(notification) => {
            notification_event(&event.event_type, (*notification).clone())
        }
        LivePayload::Custom(value) => Event::default()
            .event(event.event_type)
            .data(value.to_string()),
    }
}
