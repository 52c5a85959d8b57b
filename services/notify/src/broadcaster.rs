//! In-process fan-out of live events to connected clients.
//!
//! Each connection owns a bounded queue. Publishing never waits: a full
//! queue drops the event for that connection only.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures::Stream;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::domain::types::NotificationTemplate;

pub const DEFAULT_QUEUE_CAPACITY: usize = 10;
pub const NOTIFICATION_CREATED: &str = "notification.created";

#[derive(Debug, Clone, PartialEq)]
pub enum LivePayload {
    Notification(Arc<NotificationTemplate>),
    Custom(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveEvent {
    pub event_type: String,
    pub user_id: Uuid,
    pub payload: LivePayload,
}

impl LiveEvent {
    pub fn notification_created(user_id: Uuid, notification: Arc<NotificationTemplate>) -> Self {
        Self {
            event_type: NOTIFICATION_CREATED.to_owned(),
            user_id,
            payload: LivePayload::Notification(notification),
        }
    }

    pub fn custom(event_type: impl Into<String>, user_id: Uuid, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            user_id,
            payload: LivePayload::Custom(payload),
        }
    }
}

/// Outcome of a publish: how many connections accepted the event and how
/// many dropped it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub delivered: usize,
    pub dropped: usize,
}

impl PublishReport {
    fn absorb(&mut self, other: PublishReport) {
        self.delivered += other.delivered;
        self.dropped += other.dropped;
    }
}

type ClientQueues = HashMap<u64, mpsc::Sender<LiveEvent>>;

struct Inner {
    queues: RwLock<HashMap<Uuid, ClientQueues>>,
    next_id: AtomicU64,
    capacity: usize,
}

#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                queues: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Register a new connection for `user_id`. Dropping the returned
    /// subscription unregisters it.
    pub fn subscribe(&self, user_id: Uuid) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let client_id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .queues
            .write()
            .entry(user_id)
            .or_default()
            .insert(client_id, tx);
        tracing::debug!(%user_id, client_id, "live client registered");
        Subscription {
            user_id,
            client_id,
            rx,
            broadcaster: self.clone(),
        }
    }

    /// Idempotent; returns `false` when the connection was already gone.
    /// The user's entry disappears with its last connection.
    pub fn unsubscribe(&self, user_id: Uuid, client_id: u64) -> bool {
        let mut queues = self.inner.queues.write();
        let Some(clients) = queues.get_mut(&user_id) else {
            return false;
        };
        let removed = clients.remove(&client_id).is_some();
        if clients.is_empty() {
            queues.remove(&user_id);
        }
        if removed {
            tracing::debug!(%user_id, client_id, "live client unregistered");
        }
        removed
    }

    /// Offer `event` to every connection of `event.user_id`.
    pub fn publish(&self, event: LiveEvent) -> PublishReport {
        let queues = self.inner.queues.read();
        match queues.get(&event.user_id) {
            Some(clients) => offer(event.user_id, clients, &event),
            None => PublishReport::default(),
        }
    }

    /// Offer a copy of `event` to every connected user, addressed to each.
    pub fn publish_to_all(&self, event: LiveEvent) -> PublishReport {
        let queues = self.inner.queues.read();
        let mut report = PublishReport::default();
        for (user_id, clients) in queues.iter() {
            let addressed = LiveEvent {
                user_id: *user_id,
                ..event.clone()
            };
            report.absorb(offer(*user_id, clients, &addressed));
        }
        report
    }

    pub fn client_count(&self, user_id: Uuid) -> usize {
        self.inner
            .queues
            .read()
            .get(&user_id)
            .map_or(0, HashMap::len)
    }

    pub fn total_client_count(&self) -> usize {
        self.inner.queues.read().values().map(HashMap::len).sum()
    }
}

fn offer(user_id: Uuid, clients: &ClientQueues, event: &LiveEvent) -> PublishReport {
    let mut report = PublishReport::default();
    for (client_id, tx) in clients {
        match tx.try_send(event.clone()) {
            Ok(()) => report.delivered += 1,
            Err(TrySendError::Full(_)) => {
                report.dropped += 1;
                tracing::warn!(
                    %user_id,
                    client_id,
                    event_type = %event.event_type,
                    "live queue full, event dropped"
                );
            }
            Err(TrySendError::Closed(_)) => {
                report.dropped += 1;
                tracing::debug!(%user_id, client_id, "live queue closed");
            }
        }
    }
    report
}

/// Receiving half of one live connection.
pub struct Subscription {
    user_id: Uuid,
    client_id: u64,
    rx: mpsc::Receiver<LiveEvent>,
    broadcaster: Broadcaster,
}

impl Subscription {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    pub async fn recv(&mut self) -> Option<LiveEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<LiveEvent> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = LiveEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<LiveEvent>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.broadcaster.unsubscribe(self.user_id, self.client_id);
    }
}
