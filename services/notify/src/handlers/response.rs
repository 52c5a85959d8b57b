use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::types::{
    ActionLink, DirectoryUser, FeedEntry, Metadata, NotificationKind, NotificationTemplate,
    ReceiptView, RecipientStatus, SystemTemplate, TemplateStatus,
};

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub kind: NotificationKind,
    pub heading: String,
    pub title: String,
    pub message: String,
    pub content_image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub media_urls: Vec<String>,
    pub content_link: Option<String>,
    pub action_links: Vec<ActionLink>,
    pub metadata: Metadata,
    pub status: TemplateStatus,
    pub is_draft: bool,
    #[serde(serialize_with = "tidings_core::serde::to_rfc3339_ms_opt")]
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "tidings_core::serde::to_rfc3339_ms_opt")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "tidings_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "tidings_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<NotificationTemplate> for NotificationResponse {
    fn from(t: NotificationTemplate) -> Self {
        let status = t.status();
        Self {
            id: t.id,
            creator_id: t.creator_id,
            kind: t.content.kind,
            heading: t.content.heading,
            title: t.content.title,
            message: t.content.message,
            content_image_url: t.content.content_image_url,
            thumbnail_url: t.content.thumbnail_url,
            media_urls: t.content.media_urls,
            content_link: t.content.content_link,
            action_links: t.content.action_links,
            metadata: t.content.metadata,
            status,
            is_draft: t.is_draft,
            scheduled_at: t.scheduled_at,
            delivered_at: t.delivered_at,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// One feed row: the user's delivery state plus the notification itself.
#[derive(Debug, Serialize)]
pub struct FeedItemResponse {
    pub notification_id: Uuid,
    pub status: RecipientStatus,
    #[serde(serialize_with = "tidings_core::serde::to_rfc3339_ms_opt")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "tidings_core::serde::to_rfc3339_ms_opt")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "tidings_core::serde::to_rfc3339_ms")]
    pub received_at: DateTime<Utc>,
    pub notification: NotificationResponse,
}

impl From<FeedEntry> for FeedItemResponse {
    fn from(entry: FeedEntry) -> Self {
        Self {
            notification_id: entry.recipient.notification_id,
            status: entry.recipient.status,
            delivered_at: entry.recipient.delivered_at,
            read_at: entry.recipient.read_at,
            received_at: entry.recipient.created_at,
            notification: entry.notification.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub status: RecipientStatus,
    #[serde(serialize_with = "tidings_core::serde::to_rfc3339_ms_opt")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(serialize_with = "tidings_core::serde::to_rfc3339_ms_opt")]
    pub read_at: Option<DateTime<Utc>>,
}

impl From<ReceiptView> for ReceiptResponse {
    fn from(r: ReceiptView) -> Self {
        Self {
            user_id: r.user_id,
            username: r.username,
            email: r.email,
            status: r.status,
            delivered_at: r.delivered_at,
            read_at: r.read_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SystemTemplateResponse {
    pub event_key: String,
    pub name: String,
    pub enabled: bool,
    pub heading: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub icon: Option<String>,
    pub template_vars: Vec<String>,
    #[serde(serialize_with = "tidings_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<SystemTemplate> for SystemTemplateResponse {
    fn from(t: SystemTemplate) -> Self {
        Self {
            event_key: t.event_key,
            name: t.name,
            enabled: t.enabled,
            heading: t.heading,
            title: t.title,
            message: t.message,
            kind: t.kind,
            icon: t.icon,
            template_vars: t.template_vars,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DirectoryUserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture_url: Option<String>,
    #[serde(serialize_with = "tidings_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<DirectoryUser> for DirectoryUserResponse {
    fn from(u: DirectoryUser) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            profile_picture_url: u.profile_picture_url,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub updated: u64,
}
