use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use tidings_domain::pagination::PageRequest;
use tidings_notify::domain::repository::{
    DedupIndex, Mailer, NotificationRepository, ProfileSource, RecipientRepository,
    SyncStateRepository, SystemTemplateRepository, UserDirectory,
};
use tidings_notify::domain::types::{
    AdminStatusFilter, DirectoryUser, FeedEntry, HistoryFilter, NotificationRecipient,
    NotificationTemplate, ReceiptView, RecipientStatus, SystemTemplate, SystemTemplatePatch,
    TARGET_USER_IDS, TemplateContent, TemplateFilter,
};
use tidings_notify::error::NotifyServiceError;

pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
}

pub fn content(title: &str) -> TemplateContent {
    TemplateContent {
        heading: "News".to_owned(),
        title: title.to_owned(),
        message: format!("{title} body"),
        ..Default::default()
    }
}

pub fn test_user(username: &str, updated_at: DateTime<Utc>) -> DirectoryUser {
    DirectoryUser {
        id: Uuid::new_v4(),
        username: username.to_owned(),
        email: format!("{username}@example.com"),
        first_name: None,
        last_name: None,
        profile_picture_url: None,
        created_at: updated_at,
        updated_at,
    }
}

pub fn system_template(event_key: &str, vars: &[&str], enabled: bool) -> SystemTemplate {
    SystemTemplate {
        id: Uuid::new_v4(),
        event_key: event_key.to_owned(),
        name: event_key.to_owned(),
        enabled,
        heading: "Security".to_owned(),
        title: "New login from {{device}}".to_owned(),
        message: "Signed in at {{time}} from {{device}}".to_owned(),
        kind: Default::default(),
        icon: Some("shield".to_owned()),
        template_vars: vars.iter().map(|v| (*v).to_owned()).collect(),
        created_at: at(0),
        updated_at: at(0),
    }
}

// ── InMemoryStore ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct StoreState {
    pub templates: Vec<NotificationTemplate>,
    pub deleted: Vec<Uuid>,
    pub recipients: Vec<NotificationRecipient>,
    pub system_templates: Vec<SystemTemplate>,
    pub users: Vec<DirectoryUser>,
    pub sync_state: HashMap<String, String>,
    /// Makes the next `create_with_recipient` drop its recipient row.
    pub fail_recipient_insert: bool,
}

/// One shared in-memory database implementing every storage port.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    pub state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<DirectoryUser>) -> Self {
        let store = Self::new();
        store.state.lock().unwrap().users = users;
        store
    }

    pub fn with_system_templates(templates: Vec<SystemTemplate>) -> Self {
        let store = Self::new();
        store.state.lock().unwrap().system_templates = templates;
        store
    }

    pub fn template(&self, id: Uuid) -> Option<NotificationTemplate> {
        let state = self.state.lock().unwrap();
        visible(&state, id).cloned()
    }

    pub fn templates(&self) -> Vec<NotificationTemplate> {
        let state = self.state.lock().unwrap();
        state
            .templates
            .iter()
            .filter(|t| !state.deleted.contains(&t.id))
            .cloned()
            .collect()
    }

    pub fn recipients_of(&self, notification_id: Uuid) -> Vec<NotificationRecipient> {
        self.state
            .lock()
            .unwrap()
            .recipients
            .iter()
            .filter(|r| r.notification_id == notification_id)
            .cloned()
            .collect()
    }

    pub fn recipients_for(&self, user_id: Uuid) -> Vec<NotificationRecipient> {
        self.state
            .lock()
            .unwrap()
            .recipients
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn insert_recipient(&self, recipient: NotificationRecipient) {
        self.state.lock().unwrap().recipients.push(recipient);
    }

    pub fn insert_template(&self, template: NotificationTemplate) {
        self.state.lock().unwrap().templates.push(template);
    }

    pub fn sync_value(&self, key: &str) -> Option<String> {
        self.state.lock().unwrap().sync_state.get(key).cloned()
    }

    pub fn users(&self) -> Vec<DirectoryUser> {
        self.state.lock().unwrap().users.clone()
    }
}

fn visible(state: &StoreState, id: Uuid) -> Option<&NotificationTemplate> {
    state
        .templates
        .iter()
        .find(|t| t.id == id && !state.deleted.contains(&t.id))
}

fn visible_mut(state: &mut StoreState, id: Uuid) -> Option<&mut NotificationTemplate> {
    let deleted = state.deleted.clone();
    state
        .templates
        .iter_mut()
        .find(|t| t.id == id && !deleted.contains(&t.id))
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect()
}

fn feed_entries<F>(state: &StoreState, user_id: Uuid, keep: F) -> Vec<FeedEntry>
where
    F: Fn(&NotificationRecipient) -> bool,
{
    let mut entries: Vec<FeedEntry> = state
        .recipients
        .iter()
        .filter(|r| r.user_id == user_id && keep(r))
        .filter_map(|r| {
            visible(state, r.notification_id).map(|t| FeedEntry {
                recipient: r.clone(),
                notification: t.clone(),
            })
        })
        .collect();
    // delivered_at DESC NULLS LAST, then created_at DESC
    entries.sort_by(|a, b| {
        let delivered = match (a.recipient.delivered_at, b.recipient.delivered_at) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        delivered.then(b.recipient.created_at.cmp(&a.recipient.created_at))
    });
    entries
}

impl NotificationRepository for InMemoryStore {
    async fn find(&self, id: Uuid) -> Result<Option<NotificationTemplate>, NotifyServiceError> {
        Ok(self.template(id))
    }

    async fn create(&self, template: &NotificationTemplate) -> Result<(), NotifyServiceError> {
        self.insert_template(template.clone());
        Ok(())
    }

    async fn update_draft(
        &self,
        id: Uuid,
        content: &TemplateContent,
        now: DateTime<Utc>,
    ) -> Result<Option<NotificationTemplate>, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        match visible_mut(&mut state, id) {
            Some(t) if t.is_draft => {
                t.content = content.clone();
                t.updated_at = now;
                Ok(Some(t.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid, _now: DateTime<Utc>) -> Result<bool, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        if visible(&state, id).is_none() {
            return Ok(false);
        }
        state.recipients.retain(|r| r.notification_id != id);
        state.deleted.push(id);
        Ok(true)
    }

    async fn publish(
        &self,
        id: Uuid,
        recipients: &[NotificationRecipient],
        now: DateTime<Utc>,
    ) -> Result<bool, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        match visible_mut(&mut state, id) {
            Some(t) if t.is_draft => {
                t.is_draft = false;
                t.delivered_at = Some(now);
                t.updated_at = now;
            }
            _ => return Ok(false),
        }
        state.recipients.extend_from_slice(recipients);
        Ok(true)
    }

    async fn schedule(
        &self,
        id: Uuid,
        scheduled_at: DateTime<Utc>,
        target_user_ids: Option<&[Uuid]>,
        now: DateTime<Utc>,
    ) -> Result<bool, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        match visible_mut(&mut state, id) {
            Some(t) if t.is_editable() => {
                t.scheduled_at = Some(scheduled_at);
                if let Some(ids) = target_user_ids {
                    t.content.metadata.set_target_user_ids(ids);
                }
                t.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn unschedule(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        match visible_mut(&mut state, id) {
            Some(t) => {
                t.scheduled_at = None;
                t.content.metadata.0.remove(TARGET_USER_IDS);
                t.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn convert_to_draft(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        match visible_mut(&mut state, id) {
            Some(t) => {
                t.is_draft = true;
                t.scheduled_at = None;
                t.delivered_at = None;
                t.updated_at = now;
            }
            None => return Ok(false),
        }
        state.recipients.retain(|r| r.notification_id != id);
        Ok(true)
    }

    async fn create_with_recipient(
        &self,
        template: &NotificationTemplate,
        recipient: &NotificationRecipient,
    ) -> Result<bool, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        state.templates.push(template.clone());
        if state.fail_recipient_insert {
            state.fail_recipient_insert = false;
            return Ok(false);
        }
        state.recipients.push(recipient.clone());
        Ok(true)
    }

    async fn list(
        &self,
        filter: TemplateFilter,
        page: PageRequest,
    ) -> Result<Vec<NotificationTemplate>, NotifyServiceError> {
        let mut items: Vec<_> = self
            .templates()
            .into_iter()
            .filter(|t| filter.creator_id.is_none_or(|c| t.creator_id == c))
            .filter(|t| match filter.status {
                None => true,
                Some(AdminStatusFilter::Draft) => t.is_draft && t.scheduled_at.is_none(),
                Some(AdminStatusFilter::Scheduled) => t.is_draft && t.scheduled_at.is_some(),
                Some(AdminStatusFilter::Delivered) => !t.is_draft,
            })
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(items, page))
    }

    async fn list_drafts(
        &self,
        creator_id: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Vec<NotificationTemplate>, NotifyServiceError> {
        NotificationRepository::list(
            self,
            TemplateFilter {
                status: Some(AdminStatusFilter::Draft),
                creator_id,
            },
            page,
        )
        .await
    }

    async fn history(
        &self,
        filter: HistoryFilter,
        page: PageRequest,
    ) -> Result<Vec<NotificationTemplate>, NotifyServiceError> {
        let mut items: Vec<_> = self
            .templates()
            .into_iter()
            .filter(|t| !t.is_draft)
            .filter(|t| filter.creator_id.is_none_or(|c| t.creator_id == c))
            .filter(|t| filter.start.is_none_or(|s| t.delivered_at.is_some_and(|d| d >= s)))
            .filter(|t| filter.end.is_none_or(|e| t.delivered_at.is_some_and(|d| d <= e)))
            .collect();
        items.sort_by(|a, b| b.delivered_at.cmp(&a.delivered_at));
        Ok(paginate(items, page))
    }

    async fn due_scheduled(&self, now: DateTime<Utc>) -> Result<Vec<NotificationTemplate>, NotifyServiceError> {
        let mut items: Vec<_> = self
            .templates()
            .into_iter()
            .filter(|t| t.is_draft && t.scheduled_at.is_some_and(|s| s <= now))
            .collect();
        items.sort_by_key(|t| t.scheduled_at);
        Ok(items)
    }
}

impl RecipientRepository for InMemoryStore {
    async fn unread(&self, user_id: Uuid) -> Result<Vec<FeedEntry>, NotifyServiceError> {
        let state = self.state.lock().unwrap();
        Ok(feed_entries(&state, user_id, |r| r.status == RecipientStatus::Delivered))
    }

    async fn list(&self, user_id: Uuid, page: PageRequest) -> Result<Vec<FeedEntry>, NotifyServiceError> {
        let state = self.state.lock().unwrap();
        Ok(paginate(feed_entries(&state, user_id, |_| true), page))
    }

    async fn list_since(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<FeedEntry>, NotifyServiceError> {
        let state = self.state.lock().unwrap();
        Ok(feed_entries(&state, user_id, |r| r.created_at > since))
    }

    async fn mark_read(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        let mut changed = 0;
        for r in state.recipients.iter_mut().filter(|r| {
            r.user_id == user_id
                && notification_ids.contains(&r.notification_id)
                && r.status.can_transition_to(RecipientStatus::Read)
        }) {
            r.status = RecipientStatus::Read;
            r.read_at = Some(now);
            r.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }

    async fn mark_all_read(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<u64, NotifyServiceError> {
        let ids: Vec<Uuid> = self
            .recipients_for(user_id)
            .iter()
            .map(|r| r.notification_id)
            .collect();
        RecipientRepository::mark_read(self, user_id, &ids, now).await
    }

    async fn has_unread(&self, user_id: Uuid) -> Result<bool, NotifyServiceError> {
        Ok(!RecipientRepository::unread(self, user_id).await?.is_empty())
    }

    async fn acknowledge_delivery(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> Result<u64, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        let mut changed = 0;
        for r in state.recipients.iter_mut().filter(|r| {
            r.user_id == user_id
                && notification_ids.contains(&r.notification_id)
                && r.status.can_transition_to(RecipientStatus::Delivered)
        }) {
            r.status = RecipientStatus::Delivered;
            r.delivered_at = Some(now);
            r.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }

    async fn mark_failed(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        error_message: &str,
        device_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<u64, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        let mut changed = 0;
        for r in state.recipients.iter_mut().filter(|r| {
            r.user_id == user_id
                && r.notification_id == notification_id
                && r.status.can_transition_to(RecipientStatus::Failed)
        }) {
            r.status = RecipientStatus::Failed;
            r.error_message = Some(error_message.to_owned());
            r.device_id = device_id.map(str::to_owned);
            r.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete_for_user(&self, user_id: Uuid, notification_id: Uuid) -> Result<bool, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        let before = state.recipients.len();
        state
            .recipients
            .retain(|r| !(r.user_id == user_id && r.notification_id == notification_id));
        Ok(state.recipients.len() < before)
    }

    async fn clear_all(&self, user_id: Uuid) -> Result<u64, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        let before = state.recipients.len();
        state.recipients.retain(|r| r.user_id != user_id);
        Ok((before - state.recipients.len()) as u64)
    }

    async fn receipts(&self, notification_id: Uuid) -> Result<Vec<ReceiptView>, NotifyServiceError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .recipients
            .iter()
            .filter(|r| r.notification_id == notification_id)
            .map(|r| {
                let user = state.users.iter().find(|u| u.id == r.user_id);
                ReceiptView {
                    user_id: r.user_id,
                    username: user.map_or_else(|| "unknown".to_owned(), |u| u.username.clone()),
                    email: user.map_or_else(|| "unknown".to_owned(), |u| u.email.clone()),
                    status: r.status,
                    delivered_at: r.delivered_at,
                    read_at: r.read_at,
                }
            })
            .collect())
    }
}

impl DedupIndex for InMemoryStore {
    async fn seen_since(
        &self,
        user_id: Uuid,
        dedup_key: &str,
        since: DateTime<Utc>,
    ) -> Result<bool, NotifyServiceError> {
        let state = self.state.lock().unwrap();
        Ok(state.recipients.iter().any(|r| {
            r.user_id == user_id
                && r.created_at > since
                && visible(&state, r.notification_id)
                    .is_some_and(|t| t.content.metadata.dedup_key() == Some(dedup_key))
        }))
    }
}

impl SystemTemplateRepository for InMemoryStore {
    async fn find_enabled(&self, event_key: &str) -> Result<Option<SystemTemplate>, NotifyServiceError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .system_templates
            .iter()
            .find(|t| t.event_key == event_key && t.enabled)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<SystemTemplate>, NotifyServiceError> {
        let mut items = self.state.lock().unwrap().system_templates.clone();
        items.sort_by(|a, b| a.event_key.cmp(&b.event_key));
        Ok(items)
    }

    async fn update(
        &self,
        event_key: &str,
        patch: &SystemTemplatePatch,
        now: DateTime<Utc>,
    ) -> Result<bool, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        let Some(t) = state
            .system_templates
            .iter_mut()
            .find(|t| t.event_key == event_key)
        else {
            return Ok(false);
        };
        if let Some(v) = &patch.heading {
            t.heading = v.clone();
        }
        if let Some(v) = &patch.title {
            t.title = v.clone();
        }
        if let Some(v) = &patch.message {
            t.message = v.clone();
        }
        if let Some(v) = patch.kind {
            t.kind = v;
        }
        if let Some(v) = &patch.icon {
            t.icon = Some(v.clone());
        }
        if let Some(v) = patch.enabled {
            t.enabled = v;
        }
        t.updated_at = now;
        Ok(true)
    }

    async fn seed(&self, templates: &[SystemTemplate]) -> Result<u64, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        let mut inserted = 0;
        for t in templates {
            if !state.system_templates.iter().any(|s| s.event_key == t.event_key) {
                state.system_templates.push(t.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

impl UserDirectory for InMemoryStore {
    async fn list_ids(&self) -> Result<Vec<Uuid>, NotifyServiceError> {
        Ok(self.users().iter().map(|u| u.id).collect())
    }

    async fn list(&self, page: PageRequest) -> Result<Vec<DirectoryUser>, NotifyServiceError> {
        let mut users = self.users();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(paginate(users, page))
    }

    async fn upsert_newer(&self, users: &[DirectoryUser]) -> Result<u64, NotifyServiceError> {
        let mut state = self.state.lock().unwrap();
        let mut written = 0;
        for user in users {
            match state.users.iter_mut().find(|u| u.id == user.id) {
                Some(existing) if user.updated_at > existing.updated_at => {
                    *existing = user.clone();
                    written += 1;
                }
                Some(_) => {}
                None => {
                    state.users.push(user.clone());
                    written += 1;
                }
            }
        }
        Ok(written)
    }
}

impl SyncStateRepository for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, NotifyServiceError> {
        Ok(self.sync_value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), NotifyServiceError> {
        self.state
            .lock()
            .unwrap()
            .sync_state
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

// ── FailingDedup ─────────────────────────────────────────────────────────────

/// Dedup index whose lookups always error.
pub struct FailingDedup;

impl DedupIndex for FailingDedup {
    async fn seen_since(
        &self,
        _user_id: Uuid,
        _dedup_key: &str,
        _since: DateTime<Utc>,
    ) -> Result<bool, NotifyServiceError> {
        Err(NotifyServiceError::Storage(anyhow::anyhow!("dedup index offline")))
    }
}

// ── MockMailer ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Clone, Default)]
pub struct MockMailer {
    pub sent: Arc<Mutex<Vec<SentMail>>>,
    pub fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyServiceError> {
        if self.fail {
            return Err(NotifyServiceError::Transport("smtp unavailable".to_owned()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_owned(),
            subject: subject.to_owned(),
            body: body.to_owned(),
        });
        Ok(())
    }
}

// ── MockProfileSource ────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockProfileSource {
    pub users: Vec<DirectoryUser>,
    pub calls: Arc<Mutex<Vec<Option<DateTime<Utc>>>>>,
    pub fail: bool,
}

impl MockProfileSource {
    pub fn new(users: Vec<DirectoryUser>) -> Self {
        Self {
            users,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Option<DateTime<Utc>>> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProfileSource for MockProfileSource {
    async fn fetch_users(&self, since: Option<DateTime<Utc>>) -> Result<Vec<DirectoryUser>, NotifyServiceError> {
        self.calls.lock().unwrap().push(since);
        if self.fail {
            return Err(NotifyServiceError::Transport("profile service returned 503".to_owned()));
        }
        Ok(self
            .users
            .iter()
            .filter(|u| since.is_none_or(|s| u.updated_at > s))
            .cloned()
            .collect())
    }
}

/// Shift a timestamp by whole hours.
pub fn hours(n: i64) -> Duration {
    Duration::hours(n)
}
