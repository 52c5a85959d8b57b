//! Ports consumed by the use cases.
//!
//! Methods return `impl Future + Send` so use cases can run inside spawned
//! background tasks; implementations are free to write `async fn`.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use tidings_domain::pagination::PageRequest;

use crate::domain::types::{
    DirectoryUser, FeedEntry, HistoryFilter, NotificationRecipient,
    NotificationTemplate, ReceiptView, SystemTemplate, SystemTemplatePatch, TemplateContent,
    TemplateFilter,
};
use crate::error::NotifyServiceError;

pub type RepoResult<T> = Result<T, NotifyServiceError>;

/// Templates and their lifecycle writes.
///
/// Soft-deleted templates are invisible to every method.
pub trait NotificationRepository: Send + Sync {
    fn find(&self, id: Uuid) -> impl Future<Output = RepoResult<Option<NotificationTemplate>>> + Send;

    fn create(&self, template: &NotificationTemplate) -> impl Future<Output = RepoResult<()>> + Send;

    /// Overwrite the content of a draft. Returns `None` when the row is
    /// missing or no longer a draft; the write is conditional on `is_draft`.
    fn update_draft(
        &self,
        id: Uuid,
        content: &TemplateContent,
        now: DateTime<Utc>,
    ) -> impl Future<Output = RepoResult<Option<NotificationTemplate>>> + Send;

    /// Hard-delete recipients and soft-delete the template in one transaction.
    /// Returns `false` when the template does not exist.
    fn delete(&self, id: Uuid, now: DateTime<Utc>) -> impl Future<Output = RepoResult<bool>> + Send;

    /// Flip a draft to published and insert its recipients in one transaction.
    /// Returns `false`, writing nothing, when the template is not a draft.
    fn publish(
        &self,
        id: Uuid,
        recipients: &[NotificationRecipient],
        now: DateTime<Utc>,
    ) -> impl Future<Output = RepoResult<bool>> + Send;

    /// Set `scheduled_at` on a draft. When `target_user_ids` is given it is
    /// merged into the stored metadata in the same write, leaving other keys
    /// as they are at that moment. Returns `false` when not a draft.
    fn schedule(
        &self,
        id: Uuid,
        scheduled_at: DateTime<Utc>,
        target_user_ids: Option<&[Uuid]>,
        now: DateTime<Utc>,
    ) -> impl Future<Output = RepoResult<bool>> + Send;

    /// Clear `scheduled_at` and drop the `target_user_ids` metadata key in
    /// one write. Returns `false` when missing.
    fn unschedule(&self, id: Uuid, now: DateTime<Utc>) -> impl Future<Output = RepoResult<bool>> + Send;

    /// Reset to an unscheduled draft and delete all recipients, atomically.
    fn convert_to_draft(&self, id: Uuid, now: DateTime<Utc>) -> impl Future<Output = RepoResult<bool>> + Send;

    /// Insert a published template with a single recipient. The recipient
    /// insert may fail on its own without losing the template; returns
    /// whether the recipient row was stored.
    fn create_with_recipient(
        &self,
        template: &NotificationTemplate,
        recipient: &NotificationRecipient,
    ) -> impl Future<Output = RepoResult<bool>> + Send;

    fn list(
        &self,
        filter: TemplateFilter,
        page: PageRequest,
    ) -> impl Future<Output = RepoResult<Vec<NotificationTemplate>>> + Send;

    /// Unscheduled drafts, newest first.
    fn list_drafts(
        &self,
        creator_id: Option<Uuid>,
        page: PageRequest,
    ) -> impl Future<Output = RepoResult<Vec<NotificationTemplate>>> + Send;

    /// Published templates ordered by `delivered_at` descending.
    fn history(
        &self,
        filter: HistoryFilter,
        page: PageRequest,
    ) -> impl Future<Output = RepoResult<Vec<NotificationTemplate>>> + Send;

    /// Drafts whose `scheduled_at` is at or before `now`, oldest first.
    fn due_scheduled(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = RepoResult<Vec<NotificationTemplate>>> + Send;
}

/// Per-user delivery records and the feed read side.
pub trait RecipientRepository: Send + Sync {
    /// `delivered` rows, newest `delivered_at` first.
    fn unread(&self, user_id: Uuid) -> impl Future<Output = RepoResult<Vec<FeedEntry>>> + Send;

    /// All rows, `delivered_at DESC NULLS LAST, created_at DESC`.
    fn list(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> impl Future<Output = RepoResult<Vec<FeedEntry>>> + Send;

    /// Every row created after `since`, same ordering as `list`.
    fn list_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> impl Future<Output = RepoResult<Vec<FeedEntry>>> + Send;

    /// `delivered` → `read` for the given notifications. Returns rows changed.
    fn mark_read(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> impl Future<Output = RepoResult<u64>> + Send;

    fn mark_all_read(&self, user_id: Uuid, now: DateTime<Utc>) -> impl Future<Output = RepoResult<u64>> + Send;

    fn has_unread(&self, user_id: Uuid) -> impl Future<Output = RepoResult<bool>> + Send;

    /// `pending` → `delivered` for the given notifications. Returns rows changed.
    fn acknowledge_delivery(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> impl Future<Output = RepoResult<u64>> + Send;

    /// `pending|delivered` → `failed`. Returns rows changed.
    fn mark_failed(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        error_message: &str,
        device_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> impl Future<Output = RepoResult<u64>> + Send;

    /// Remove the user's rows for one notification. Returns `false` when none existed.
    fn delete_for_user(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
    ) -> impl Future<Output = RepoResult<bool>> + Send;

    fn clear_all(&self, user_id: Uuid) -> impl Future<Output = RepoResult<u64>> + Send;

    fn receipts(&self, notification_id: Uuid) -> impl Future<Output = RepoResult<Vec<ReceiptView>>> + Send;
}

/// Time-windowed lookup of dedup keys already delivered to a user.
pub trait DedupIndex: Send + Sync {
    fn seen_since(
        &self,
        user_id: Uuid,
        dedup_key: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = RepoResult<bool>> + Send;
}

pub trait SystemTemplateRepository: Send + Sync {
    fn find_enabled(&self, event_key: &str) -> impl Future<Output = RepoResult<Option<SystemTemplate>>> + Send;

    /// All templates ordered by `event_key`.
    fn list(&self) -> impl Future<Output = RepoResult<Vec<SystemTemplate>>> + Send;

    /// Returns `false` when no template has this key.
    fn update(
        &self,
        event_key: &str,
        patch: &SystemTemplatePatch,
        now: DateTime<Utc>,
    ) -> impl Future<Output = RepoResult<bool>> + Send;

    /// Insert templates whose `event_key` is not present yet. Returns rows inserted.
    fn seed(&self, templates: &[SystemTemplate]) -> impl Future<Output = RepoResult<u64>> + Send;
}

/// Local mirror of the external user directory.
pub trait UserDirectory: Send + Sync {
    fn list_ids(&self) -> impl Future<Output = RepoResult<Vec<Uuid>>> + Send;

    fn list(&self, page: PageRequest) -> impl Future<Output = RepoResult<Vec<DirectoryUser>>> + Send;

    /// Insert new users and update existing ones whose `updated_at` is newer.
    /// Returns rows written.
    fn upsert_newer(&self, users: &[DirectoryUser]) -> impl Future<Output = RepoResult<u64>> + Send;
}

pub trait SyncStateRepository: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = RepoResult<Option<String>>> + Send;

    fn set(&self, key: &str, value: &str) -> impl Future<Output = RepoResult<()>> + Send;
}

/// External profile service.
pub trait ProfileSource: Send + Sync {
    /// Profiles updated after `since`, or every profile when `None`.
    fn fetch_users(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = RepoResult<Vec<DirectoryUser>>> + Send;
}

/// Outbound email transport.
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> impl Future<Output = RepoResult<()>> + Send;
}
