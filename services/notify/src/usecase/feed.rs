use chrono::{DateTime, Utc};
use uuid::Uuid;

use tidings_domain::pagination::PageRequest;

use crate::domain::repository::RecipientRepository;
use crate::domain::types::{FeedEntry, unique_ids};
use crate::error::NotifyServiceError;

// ── GetFeed ──────────────────────────────────────────────────────────────────

pub struct GetFeedUseCase<R: RecipientRepository> {
    pub repo: R,
}

impl<R: RecipientRepository> GetFeedUseCase<R> {
    /// With `since`, paging is ignored and every newer row is returned.
    pub async fn execute(
        &self,
        user_id: Uuid,
        page: PageRequest,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<FeedEntry>, NotifyServiceError> {
        match since {
            Some(since) => self.repo.list_since(user_id, since).await,
            None => self.repo.list(user_id, page).await,
        }
    }
}

// ── GetUnread ────────────────────────────────────────────────────────────────

pub struct GetUnreadUseCase<R: RecipientRepository> {
    pub repo: R,
}

impl<R: RecipientRepository> GetUnreadUseCase<R> {
    pub async fn execute(&self, user_id: Uuid) -> Result<Vec<FeedEntry>, NotifyServiceError> {
        self.repo.unread(user_id).await
    }
}

// ── HasUnread ────────────────────────────────────────────────────────────────

pub struct HasUnreadUseCase<R: RecipientRepository> {
    pub repo: R,
}

impl<R: RecipientRepository> HasUnreadUseCase<R> {
    pub async fn execute(&self, user_id: Uuid) -> Result<bool, NotifyServiceError> {
        self.repo.has_unread(user_id).await
    }
}

// ── MarkRead ─────────────────────────────────────────────────────────────────

pub struct MarkReadUseCase<R: RecipientRepository> {
    pub repo: R,
}

impl<R: RecipientRepository> MarkReadUseCase<R> {
    /// Only `delivered` rows move to `read`; anything else is left alone.
    pub async fn execute(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
    ) -> Result<u64, NotifyServiceError> {
        let ids = non_empty_ids(notification_ids)?;
        self.repo.mark_read(user_id, &ids, Utc::now()).await
    }
}

// ── MarkAllRead ──────────────────────────────────────────────────────────────

pub struct MarkAllReadUseCase<R: RecipientRepository> {
    pub repo: R,
}

impl<R: RecipientRepository> MarkAllReadUseCase<R> {
    pub async fn execute(&self, user_id: Uuid) -> Result<u64, NotifyServiceError> {
        self.repo.mark_all_read(user_id, Utc::now()).await
    }
}

// ── AcknowledgeDelivery ──────────────────────────────────────────────────────

pub struct AcknowledgeDeliveryUseCase<R: RecipientRepository> {
    pub repo: R,
}

impl<R: RecipientRepository> AcknowledgeDeliveryUseCase<R> {
    pub async fn execute(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
    ) -> Result<u64, NotifyServiceError> {
        let ids = non_empty_ids(notification_ids)?;
        self.repo.acknowledge_delivery(user_id, &ids, Utc::now()).await
    }
}

// ── ReportFailure ────────────────────────────────────────────────────────────

pub struct ReportFailureInput {
    pub user_id: Uuid,
    pub notification_id: Uuid,
    pub error_message: String,
    pub device_id: Option<String>,
}

pub struct ReportFailureUseCase<R: RecipientRepository> {
    pub repo: R,
}

impl<R: RecipientRepository> ReportFailureUseCase<R> {
    pub async fn execute(&self, input: ReportFailureInput) -> Result<u64, NotifyServiceError> {
        if input.error_message.trim().is_empty() {
            return Err(NotifyServiceError::Validation(
                "error_message is required".to_owned(),
            ));
        }
        let changed = self
            .repo
            .mark_failed(
                input.user_id,
                input.notification_id,
                &input.error_message,
                input.device_id.as_deref(),
                Utc::now(),
            )
            .await?;
        if changed > 0 {
            tracing::warn!(
                user_id = %input.user_id,
                notification_id = %input.notification_id,
                error = %input.error_message,
                "delivery failure recorded"
            );
        }
        Ok(changed)
    }
}

// ── DeleteForUser ────────────────────────────────────────────────────────────

pub struct DeleteForUserUseCase<R: RecipientRepository> {
    pub repo: R,
}

impl<R: RecipientRepository> DeleteForUserUseCase<R> {
    pub async fn execute(&self, user_id: Uuid, notification_id: Uuid) -> Result<(), NotifyServiceError> {
        if !self.repo.delete_for_user(user_id, notification_id).await? {
            return Err(NotifyServiceError::NotificationNotFound);
        }
        Ok(())
    }
}

// ── ClearAll ─────────────────────────────────────────────────────────────────

pub struct ClearAllUseCase<R: RecipientRepository> {
    pub repo: R,
}

impl<R: RecipientRepository> ClearAllUseCase<R> {
    pub async fn execute(&self, user_id: Uuid) -> Result<u64, NotifyServiceError> {
        self.repo.clear_all(user_id).await
    }
}

fn non_empty_ids(ids: &[Uuid]) -> Result<Vec<Uuid>, NotifyServiceError> {
    if ids.is_empty() {
        return Err(NotifyServiceError::Validation(
            "notification_ids must not be empty".to_owned(),
        ));
    }
    Ok(unique_ids(ids))
}
