use serde_json::Value;
use uuid::Uuid;

use tidings_domain::pagination::PageRequest;

use crate::broadcaster::{Broadcaster, LiveEvent, PublishReport};
use crate::domain::repository::{NotificationRepository, RecipientRepository, UserDirectory};
use crate::domain::types::{
    DirectoryUser, HistoryFilter, NotificationTemplate, ReceiptView, TemplateFilter,
};
use crate::error::NotifyServiceError;

// ── ListTemplates ────────────────────────────────────────────────────────────

pub struct ListTemplatesUseCase<R: NotificationRepository> {
    pub repo: R,
}

impl<R: NotificationRepository> ListTemplatesUseCase<R> {
    pub async fn execute(
        &self,
        filter: TemplateFilter,
        page: PageRequest,
    ) -> Result<Vec<NotificationTemplate>, NotifyServiceError> {
        self.repo.list(filter, page.clamped()).await
    }
}

// ── ListDrafts ───────────────────────────────────────────────────────────────

pub struct ListDraftsUseCase<R: NotificationRepository> {
    pub repo: R,
}

impl<R: NotificationRepository> ListDraftsUseCase<R> {
    pub async fn execute(
        &self,
        creator_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Vec<NotificationTemplate>, NotifyServiceError> {
        self.repo.list_drafts(creator_id, page.clamped()).await
    }
}

// ── History ──────────────────────────────────────────────────────────────────

pub struct HistoryUseCase<R: NotificationRepository> {
    pub repo: R,
}

impl<R: NotificationRepository> HistoryUseCase<R> {
    pub async fn execute(
        &self,
        filter: HistoryFilter,
        page: PageRequest,
    ) -> Result<Vec<NotificationTemplate>, NotifyServiceError> {
        if let (Some(start), Some(end)) = (filter.start, filter.end) {
            if start > end {
                return Err(NotifyServiceError::Validation(
                    "start must not be after end".to_owned(),
                ));
            }
        }
        self.repo.history(filter, page.clamped()).await
    }
}

// ── Receipts ─────────────────────────────────────────────────────────────────

pub struct ReceiptsUseCase<N: NotificationRepository, R: RecipientRepository> {
    pub notifications: N,
    pub recipients: R,
}

impl<N: NotificationRepository, R: RecipientRepository> ReceiptsUseCase<N, R> {
    pub async fn execute(&self, notification_id: Uuid) -> Result<Vec<ReceiptView>, NotifyServiceError> {
        if self.notifications.find(notification_id).await?.is_none() {
            return Err(NotifyServiceError::NotificationNotFound);
        }
        self.recipients.receipts(notification_id).await
    }
}

// ── ListDirectoryUsers ───────────────────────────────────────────────────────

pub struct ListDirectoryUsersUseCase<D: UserDirectory> {
    pub directory: D,
}

impl<D: UserDirectory> ListDirectoryUsersUseCase<D> {
    pub async fn execute(&self, page: PageRequest) -> Result<Vec<DirectoryUser>, NotifyServiceError> {
        self.directory.list(page.clamped()).await
    }
}

// ── Broadcast ────────────────────────────────────────────────────────────────

pub struct BroadcastUseCase {
    pub broadcaster: Broadcaster,
}

impl BroadcastUseCase {
    /// Push an ephemeral event to every connected client. Nothing is stored.
    pub fn execute(&self, event_type: &str, payload: Value) -> Result<PublishReport, NotifyServiceError> {
        let event_type = event_type.trim();
        if event_type.is_empty() {
            return Err(NotifyServiceError::Validation(
                "event_type is required".to_owned(),
            ));
        }
        let report = self
            .broadcaster
            .publish_to_all(LiveEvent::custom(event_type, Uuid::nil(), payload));
        tracing::info!(
            event_type,
            delivered = report.delivered,
            dropped = report.dropped,
            "admin broadcast sent"
        );
        Ok(report)
    }
}
