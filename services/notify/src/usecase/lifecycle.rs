use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use tidings_core::task::PeriodicJob;

use crate::broadcaster::{Broadcaster, LiveEvent, PublishReport};
use crate::domain::repository::{NotificationRepository, UserDirectory};
use crate::domain::types::{
    NotificationRecipient, NotificationTemplate, TemplateContent, unique_ids,
};
use crate::error::NotifyServiceError;

// ── CreateDraft ──────────────────────────────────────────────────────────────

pub struct CreateDraftInput {
    /// Defaults to the calling admin.
    pub creator_id: Option<Uuid>,
    pub content: TemplateContent,
}

pub struct CreateDraftUseCase<R: NotificationRepository> {
    pub repo: R,
}

impl<R: NotificationRepository> CreateDraftUseCase<R> {
    pub async fn execute(
        &self,
        admin_id: Uuid,
        input: CreateDraftInput,
    ) -> Result<NotificationTemplate, NotifyServiceError> {
        input.content.validate()?;
        let creator_id = input.creator_id.unwrap_or(admin_id);
        let template = NotificationTemplate::new_draft(creator_id, input.content, Utc::now());
        self.repo.create(&template).await?;
        tracing::info!(notification_id = %template.id, %creator_id, "draft created");
        Ok(template)
    }
}

// ── UpdateDraft ──────────────────────────────────────────────────────────────

pub struct UpdateDraftUseCase<R: NotificationRepository> {
    pub repo: R,
}

impl<R: NotificationRepository> UpdateDraftUseCase<R> {
    /// A missing template and a published one are both `NotEditable`.
    pub async fn execute(
        &self,
        id: Uuid,
        content: TemplateContent,
    ) -> Result<NotificationTemplate, NotifyServiceError> {
        content.validate()?;
        self.repo
            .update_draft(id, &content, Utc::now())
            .await?
            .ok_or(NotifyServiceError::NotEditable)
    }
}

// ── DeleteTemplate ───────────────────────────────────────────────────────────

pub struct DeleteTemplateUseCase<R: NotificationRepository> {
    pub repo: R,
}

impl<R: NotificationRepository> DeleteTemplateUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<(), NotifyServiceError> {
        if !self.repo.delete(id, Utc::now()).await? {
            return Err(NotifyServiceError::NotificationNotFound);
        }
        tracing::info!(notification_id = %id, "notification deleted");
        Ok(())
    }
}

// ── Publish ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub template: NotificationTemplate,
    /// Recipient rows written.
    pub recipients: usize,
    /// Live delivery summed over every target.
    pub live: PublishReport,
}

pub struct PublishUseCase<R: NotificationRepository, D: UserDirectory> {
    pub repo: R,
    pub directory: D,
    pub broadcaster: Broadcaster,
}

impl<R: NotificationRepository, D: UserDirectory> PublishUseCase<R, D> {
    /// Publish a draft to `target_user_ids`, or to every directory user when
    /// the list is empty.
    pub async fn execute(
        &self,
        id: Uuid,
        target_user_ids: &[Uuid],
    ) -> Result<PublishOutcome, NotifyServiceError> {
        self.execute_at(id, target_user_ids, Utc::now()).await
    }

    pub async fn execute_at(
        &self,
        id: Uuid,
        target_user_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<PublishOutcome, NotifyServiceError> {
        let mut template = self
            .repo
            .find(id)
            .await?
            .ok_or(NotifyServiceError::NotificationNotFound)?;
        if !template.is_editable() {
            return Err(NotifyServiceError::NotEditable);
        }

        let targets = if target_user_ids.is_empty() {
            self.directory.list_ids().await?
        } else {
            unique_ids(target_user_ids)
        };
        let recipients: Vec<NotificationRecipient> = targets
            .iter()
            .map(|user_id| NotificationRecipient::pending(id, *user_id, now))
            .collect();

        if !self.repo.publish(id, &recipients, now).await? {
            return Err(NotifyServiceError::NotEditable);
        }
        template.is_draft = false;
        template.delivered_at = Some(now);
        template.updated_at = now;
        tracing::info!(notification_id = %id, recipients = recipients.len(), "notification published");

        let shared = Arc::new(template.clone());
        let mut live = PublishReport::default();
        for user_id in &targets {
            let report = self
                .broadcaster
                .publish(LiveEvent::notification_created(*user_id, Arc::clone(&shared)));
            live.delivered += report.delivered;
            live.dropped += report.dropped;
        }

        Ok(PublishOutcome {
            template,
            recipients: recipients.len(),
            live,
        })
    }
}

// ── ScheduleWithTargets ──────────────────────────────────────────────────────

pub struct ScheduleUseCase<R: NotificationRepository> {
    pub repo: R,
}

impl<R: NotificationRepository> ScheduleUseCase<R> {
    /// Targets are stashed in metadata only when given; an empty list means
    /// every user at publish time.
    pub async fn execute(
        &self,
        id: Uuid,
        scheduled_at: DateTime<Utc>,
        target_user_ids: &[Uuid],
    ) -> Result<NotificationTemplate, NotifyServiceError> {
        let template = self
            .repo
            .find(id)
            .await?
            .ok_or(NotifyServiceError::NotificationNotFound)?;
        if !template.is_editable() {
            return Err(NotifyServiceError::NotEditable);
        }

        let targets = (!target_user_ids.is_empty()).then(|| unique_ids(target_user_ids));
        if !self
            .repo
            .schedule(id, scheduled_at, targets.as_deref(), Utc::now())
            .await?
        {
            return Err(NotifyServiceError::NotEditable);
        }
        tracing::info!(notification_id = %id, %scheduled_at, "notification scheduled");
        self.repo
            .find(id)
            .await?
            .ok_or(NotifyServiceError::NotificationNotFound)
    }
}

// ── UnscheduleWithCleanup ────────────────────────────────────────────────────

pub struct UnscheduleUseCase<R: NotificationRepository> {
    pub repo: R,
}

impl<R: NotificationRepository> UnscheduleUseCase<R> {
    pub async fn execute(&self, id: Uuid) -> Result<NotificationTemplate, NotifyServiceError> {
        if !self.repo.unschedule(id, Utc::now()).await? {
            return Err(NotifyServiceError::NotificationNotFound);
        }
        self.repo
            .find(id)
            .await?
            .ok_or(NotifyServiceError::NotificationNotFound)
    }
}

// ── ConvertToDraft ───────────────────────────────────────────────────────────

pub struct ConvertToDraftUseCase<R: NotificationRepository> {
    pub repo: R,
}

impl<R: NotificationRepository> ConvertToDraftUseCase<R> {
    /// Discards every recipient row of the template.
    pub async fn execute(&self, id: Uuid) -> Result<(), NotifyServiceError> {
        if !self.repo.convert_to_draft(id, Utc::now()).await? {
            return Err(NotifyServiceError::NotificationNotFound);
        }
        tracing::info!(notification_id = %id, "notification converted to draft");
        Ok(())
    }
}

// ── PublishDueScheduled ──────────────────────────────────────────────────────

pub struct PublishDueScheduledUseCase<R: NotificationRepository, D: UserDirectory> {
    pub publish: PublishUseCase<R, D>,
}

impl<R: NotificationRepository, D: UserDirectory> PublishDueScheduledUseCase<R, D> {
    /// Publish every draft scheduled at or before `now`. Returns how many
    /// were published; one failure does not stop the rest.
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<usize, NotifyServiceError> {
        let due = self.publish.repo.due_scheduled(now).await?;
        let mut published = 0;
        for template in due {
            let targets = template.content.metadata.target_user_ids();
            match self.publish.execute_at(template.id, &targets, now).await {
                Ok(_) => published += 1,
                Err(e) => tracing::warn!(
                    notification_id = %template.id,
                    error = %e,
                    "scheduled publish failed"
                ),
            }
        }
        Ok(published)
    }
}

pub struct ScheduledPublishJob<R: NotificationRepository, D: UserDirectory> {
    pub usecase: PublishDueScheduledUseCase<R, D>,
}

impl<R, D> PeriodicJob for ScheduledPublishJob<R, D>
where
    R: NotificationRepository + 'static,
    D: UserDirectory + 'static,
{
    fn name(&self) -> &'static str {
        "scheduled-publish"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let published = self.usecase.execute(Utc::now()).await?;
        if published > 0 {
            tracing::info!(published, "scheduled notifications published");
        }
        Ok(())
    }
}
