use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::NotifyServiceError;

/// Trailing window in which a repeated dedup key suppresses delivery.
pub const DEDUP_WINDOW_HOURS: i64 = 24;
/// Recipient rows inserted per statement when publishing.
pub const PUBLISH_BATCH_SIZE: usize = 50;
/// Feed rows replayed to a freshly connected live stream.
pub const STREAM_SNAPSHOT_LIMIT: u64 = 50;
pub const MAX_HEADING_LEN: usize = 100;
pub const MAX_TITLE_LEN: usize = 100;

/// Metadata key holding the caller-supplied dedup token.
pub const DEDUP_KEY: &str = "dedup_key";
/// Metadata key holding the target snapshot of a scheduled draft.
pub const TARGET_USER_IDS: &str = "target_user_ids";

// ── NotificationKind ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Generic,
    ActionRequired,
    Success,
    Warning,
    #[default]
    Info,
    Promotional,
    Security,
    Video,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::ActionRequired => "action_required",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Promotional => "promotional",
            Self::Security => "security",
            Self::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "generic" => Some(Self::Generic),
            "action_required" => Some(Self::ActionRequired),
            "success" => Some(Self::Success),
            "warning" => Some(Self::Warning),
            "info" => Some(Self::Info),
            "promotional" => Some(Self::Promotional),
            "security" => Some(Self::Security),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLink {
    pub label: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

// ── Metadata ─────────────────────────────────────────────────────────────────

/// A single value in the open metadata bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<MetaValue>),
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for MetaValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<MetaValue> for Value {
    fn from(value: MetaValue) -> Self {
        match value {
            MetaValue::Null => Value::Null,
            MetaValue::Bool(b) => Value::Bool(b),
            MetaValue::Int(i) => Value::from(i),
            MetaValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            MetaValue::Text(s) => Value::String(s),
            MetaValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            MetaValue::Map(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Open key/value bag attached to a template.
///
/// Two keys are interpreted by the service: [`DEDUP_KEY`] and
/// [`TARGET_USER_IDS`]; everything else is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(pub BTreeMap<String, MetaValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value. Anything other than an object yields an empty bag.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(
                map.into_iter()
                    .map(|(k, v)| (k, MetaValue::from(v)))
                    .collect(),
            ),
            _ => Self::default(),
        }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: MetaValue) {
        self.0.insert(key.into(), value);
    }

    pub fn dedup_key(&self) -> Option<&str> {
        self.get(DEDUP_KEY).and_then(MetaValue::as_str)
    }

    pub fn set_dedup_key(&mut self, key: &str) {
        self.insert(DEDUP_KEY, MetaValue::Text(key.to_owned()));
    }

    /// Scheduled target snapshot. Entries that are not valid UUIDs are skipped.
    pub fn target_user_ids(&self) -> Vec<Uuid> {
        match self.get(TARGET_USER_IDS) {
            Some(MetaValue::List(items)) => items
                .iter()
                .filter_map(MetaValue::as_str)
                .filter_map(|s| s.parse().ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn set_target_user_ids(&mut self, ids: &[Uuid]) {
        let items = ids.iter().map(|id| MetaValue::Text(id.to_string())).collect();
        self.insert(TARGET_USER_IDS, MetaValue::List(items));
    }
}

// ── NotificationTemplate ─────────────────────────────────────────────────────

/// Displayable content of a template; the editable part of a draft.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateContent {
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
}

impl TemplateContent {
    pub fn validate(&self) -> Result<(), NotifyServiceError> {
        for (field, value) in [
            ("heading", &self.heading),
            ("title", &self.title),
            ("message", &self.message),
        ] {
            if value.trim().is_empty() {
                return Err(NotifyServiceError::Validation(format!("{field} is required")));
            }
        }
        if self.heading.chars().count() > MAX_HEADING_LEN {
            return Err(NotifyServiceError::Validation(format!(
                "heading exceeds {MAX_HEADING_LEN} characters"
            )));
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(NotifyServiceError::Validation(format!(
                "title exceeds {MAX_TITLE_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// Lifecycle position of a template, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    Draft,
    Scheduled,
    Published,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationTemplate {
    pub id: Uuid,
    /// `Uuid::nil()` for system-triggered notifications.
    pub creator_id: Uuid,
    pub content: TemplateContent,
    pub is_draft: bool,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationTemplate {
    pub fn new_draft(creator_id: Uuid, content: TemplateContent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            creator_id,
            content,
            is_draft: true,
            scheduled_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> TemplateStatus {
        match (self.is_draft, self.scheduled_at) {
            (false, _) => TemplateStatus::Published,
            (true, Some(_)) => TemplateStatus::Scheduled,
            (true, None) => TemplateStatus::Draft,
        }
    }

    pub fn is_editable(&self) -> bool {
        self.is_draft
    }
}

// ── NotificationRecipient ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientStatus {
    Pending,
    Delivered,
    Read,
    Failed,
}

impl RecipientStatus {
    pub const ALL: [Self; 4] = [Self::Pending, Self::Delivered, Self::Read, Self::Failed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "delivered" => Some(Self::Delivered),
            "read" => Some(Self::Read),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Forward-only transitions: pending → delivered → read, pending|delivered → failed.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Delivered)
                | (Self::Delivered, Self::Read)
                | (Self::Pending, Self::Failed)
                | (Self::Delivered, Self::Failed)
        )
    }

    /// Wire names of the statuses that may move to `next` in one step.
    pub fn sources_of(next: Self) -> Vec<&'static str> {
        Self::ALL
            .into_iter()
            .filter(|s| s.can_transition_to(next))
            .map(Self::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecipient {
    pub id: Uuid,
    pub notification_id: Uuid,
    pub user_id: Uuid,
    pub status: RecipientStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub device_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationRecipient {
    pub fn pending(notification_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            notification_id,
            user_id,
            status: RecipientStatus::Pending,
            delivered_at: None,
            read_at: None,
            error_message: None,
            device_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn delivered(notification_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            status: RecipientStatus::Delivered,
            delivered_at: Some(now),
            ..Self::pending(notification_id, user_id, now)
        }
    }
}

/// One row of a user's feed: their delivery record joined with the template.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub recipient: NotificationRecipient,
    pub notification: NotificationTemplate,
}

/// Recipient row enriched with directory data for admin receipts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptView {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub status: RecipientStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
}

// ── System templates ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SystemTemplate {
    pub id: Uuid,
    pub event_key: String,
    pub name: String,
    pub enabled: bool,
    pub heading: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub icon: Option<String>,
    /// Variable names a trigger must supply.
    pub template_vars: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of a system template. Only these fields are admin-editable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemTemplatePatch {
    pub heading: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub kind: Option<NotificationKind>,
    pub icon: Option<String>,
    pub enabled: Option<bool>,
}

impl SystemTemplatePatch {
    pub fn is_empty(&self) -> bool {
        self.heading.is_none()
            && self.title.is_none()
            && self.message.is_none()
            && self.kind.is_none()
            && self.icon.is_none()
            && self.enabled.is_none()
    }
}

/// Result of a system event trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    Delivered(NotificationTemplate),
    /// An event with the same dedup key reached this user inside the window.
    Deduped,
    /// No enabled system template exists for the event key.
    NotFound,
}

// ── Directory ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Admin queries ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStatusFilter {
    Draft,
    Scheduled,
    Delivered,
}

impl AdminStatusFilter {
    /// `pending` is accepted as an alias of `draft`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" | "pending" => Some(Self::Draft),
            "scheduled" => Some(Self::Scheduled),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    pub status: Option<AdminStatusFilter>,
    pub creator_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub creator_id: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// Collapse duplicate ids, keeping first occurrence order.
pub fn unique_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
