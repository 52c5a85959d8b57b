use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::broadcaster::{Broadcaster, LiveEvent};
use crate::domain::render::{first_missing, render};
use crate::domain::repository::{DedupIndex, NotificationRepository, SystemTemplateRepository};
use crate::domain::types::{
    DEDUP_WINDOW_HOURS, MetaValue, Metadata, NotificationRecipient, NotificationTemplate,
    TemplateContent, TriggerOutcome,
};
use crate::error::NotifyServiceError;

pub struct TriggerInput {
    pub event_key: String,
    pub user_id: Uuid,
    pub variables: Map<String, Value>,
    pub dedup_key: Option<String>,
}

pub struct TriggerSystemEventUseCase<S, R, X>
where
    S: SystemTemplateRepository,
    R: NotificationRepository,
    X: DedupIndex,
{
    pub system_templates: S,
    pub notifications: R,
    pub dedup: X,
    pub broadcaster: Broadcaster,
}

impl<S, R, X> TriggerSystemEventUseCase<S, R, X>
where
    S: SystemTemplateRepository,
    R: NotificationRepository,
    X: DedupIndex,
{
    pub async fn execute(&self, input: TriggerInput) -> Result<TriggerOutcome, NotifyServiceError> {
        let Some(system) = self.system_templates.find_enabled(&input.event_key).await? else {
            tracing::debug!(event_key = %input.event_key, "no enabled system template");
            return Ok(TriggerOutcome::NotFound);
        };

        if let Some(name) = first_missing(&system.template_vars, &input.variables) {
            return Err(NotifyServiceError::MissingVariable(name.to_owned()));
        }

        let dedup_key = input.dedup_key.as_deref().filter(|k| !k.is_empty());
        if let Some(key) = dedup_key {
            if self.seen_recently(input.user_id, key).await {
                tracing::info!(
                    event_key = %input.event_key,
                    user_id = %input.user_id,
                    dedup_key = key,
                    "duplicate system event suppressed"
                );
                return Ok(TriggerOutcome::Deduped);
            }
        }

        let mut metadata = Metadata::from_json(Value::Object(input.variables.clone()));
        metadata.insert("event_key", MetaValue::Text(input.event_key.clone()));
        if let Some(key) = dedup_key {
            metadata.set_dedup_key(key);
        }

        let now = Utc::now();
        let template = NotificationTemplate {
            is_draft: false,
            delivered_at: Some(now),
            ..NotificationTemplate::new_draft(
                Uuid::nil(),
                TemplateContent {
                    kind: system.kind,
                    heading: render(&system.heading, &input.variables),
                    title: render(&system.title, &input.variables),
                    message: render(&system.message, &input.variables),
                    thumbnail_url: system.icon.clone(),
                    metadata,
                    ..Default::default()
                },
                now,
            )
        };
        let recipient = NotificationRecipient::delivered(template.id, input.user_id, now);

        if !self
            .notifications
            .create_with_recipient(&template, &recipient)
            .await?
        {
            tracing::warn!(
                notification_id = %template.id,
                user_id = %input.user_id,
                "system notification stored without recipient"
            );
        }

        self.broadcaster.publish(LiveEvent::notification_created(
            input.user_id,
            Arc::new(template.clone()),
        ));
        Ok(TriggerOutcome::Delivered(template))
    }

    /// Fails open: a lookup error counts as not seen.
    async fn seen_recently(&self, user_id: Uuid, key: &str) -> bool {
        let since = Utc::now() - Duration::hours(DEDUP_WINDOW_HOURS);
        match self.dedup.seen_since(user_id, key, since).await {
            Ok(seen) => seen,
            Err(e) => {
                tracing::warn!(%user_id, dedup_key = key, error = %e, "dedup check failed, delivering anyway");
                false
            }
        }
    }
}
