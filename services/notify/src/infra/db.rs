use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Statement,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use serde_json::Value;
use uuid::Uuid;

use tidings_core::sea_ext::OrderByNullsLast as _;
use tidings_domain::pagination::PageRequest;
use tidings_notify_schema::{
    notification_recipients, notifications, sync_states, system_notification_templates, users,
};

use crate::domain::repository::{
    DedupIndex, NotificationRepository, RecipientRepository, RepoResult, SyncStateRepository,
    SystemTemplateRepository, UserDirectory,
};
use crate::domain::types::{
    AdminStatusFilter, DirectoryUser, FeedEntry, HistoryFilter, Metadata, NotificationKind,
    NotificationRecipient, NotificationTemplate, PUBLISH_BATCH_SIZE, ReceiptView,
    RecipientStatus, SystemTemplate, SystemTemplatePatch, TARGET_USER_IDS, TemplateContent,
    TemplateFilter,
};

/// Scheduled drafts picked up per scheduler pass.
const DUE_BATCH_LIMIT: u64 = 100;

#[derive(Debug, FromQueryResult)]
struct ExistsRow {
    exists: bool,
}

// ── Notification repository ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbNotificationRepository {
    pub db: DatabaseConnection,
}

impl NotificationRepository for DbNotificationRepository {
    async fn find(&self, id: Uuid) -> RepoResult<Option<NotificationTemplate>> {
        let model = notifications::Entity::find_by_id(id)
            .filter(notifications::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .context("find notification")?;
        Ok(model.map(template_from_model))
    }

    async fn create(&self, template: &NotificationTemplate) -> RepoResult<()> {
        template_active_model(template)?
            .insert(&self.db)
            .await
            .context("create notification")?;
        Ok(())
    }

    async fn update_draft(
        &self,
        id: Uuid,
        content: &TemplateContent,
        now: DateTime<Utc>,
    ) -> RepoResult<Option<NotificationTemplate>> {
        let columns = ContentColumns::encode(content)?;
        let result = notifications::Entity::update_many()
            .col_expr(notifications::Column::Kind, Expr::value(columns.kind))
            .col_expr(notifications::Column::Heading, Expr::value(content.heading.clone()))
            .col_expr(notifications::Column::Title, Expr::value(content.title.clone()))
            .col_expr(notifications::Column::Message, Expr::value(content.message.clone()))
            .col_expr(
                notifications::Column::ContentImageUrl,
                Expr::value(content.content_image_url.clone()),
            )
            .col_expr(
                notifications::Column::ThumbnailUrl,
                Expr::value(content.thumbnail_url.clone()),
            )
            .col_expr(notifications::Column::MediaUrls, Expr::value(columns.media_urls))
            .col_expr(
                notifications::Column::ContentLink,
                Expr::value(content.content_link.clone()),
            )
            .col_expr(notifications::Column::ActionLinks, Expr::value(columns.action_links))
            .col_expr(notifications::Column::Metadata, Expr::value(columns.metadata))
            .col_expr(notifications::Column::UpdatedAt, Expr::value(now))
            .filter(notifications::Column::Id.eq(id))
            .filter(notifications::Column::IsDraft.eq(true))
            .filter(notifications::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .context("update draft")?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.find(id).await
    }

    async fn delete(&self, id: Uuid, now: DateTime<Utc>) -> RepoResult<bool> {
        let deleted = self
            .db
            .transaction::<_, bool, DbErr>(move |txn| {
                Box::pin(async move {
                    let result = notifications::Entity::update_many()
                        .col_expr(notifications::Column::DeletedAt, Expr::value(Some(now)))
                        .col_expr(notifications::Column::UpdatedAt, Expr::value(now))
                        .filter(notifications::Column::Id.eq(id))
                        .filter(notifications::Column::DeletedAt.is_null())
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Ok(false);
                    }
                    notification_recipients::Entity::delete_many()
                        .filter(notification_recipients::Column::NotificationId.eq(id))
                        .exec(txn)
                        .await?;
                    Ok(true)
                })
            })
            .await
            .context("delete notification")?;
        Ok(deleted)
    }

    async fn publish(
        &self,
        id: Uuid,
        recipients: &[NotificationRecipient],
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let rows: Vec<notification_recipients::ActiveModel> =
            recipients.iter().map(recipient_active_model).collect();
        let published = self
            .db
            .transaction::<_, bool, DbErr>(move |txn| {
                Box::pin(async move {
                    let flipped = notifications::Entity::update_many()
                        .col_expr(notifications::Column::IsDraft, Expr::value(false))
                        .col_expr(notifications::Column::DeliveredAt, Expr::value(Some(now)))
                        .col_expr(notifications::Column::UpdatedAt, Expr::value(now))
                        .filter(notifications::Column::Id.eq(id))
                        .filter(notifications::Column::IsDraft.eq(true))
                        .filter(notifications::Column::DeletedAt.is_null())
                        .exec(txn)
                        .await?;
                    if flipped.rows_affected == 0 {
                        return Ok(false);
                    }
                    for batch in rows.chunks(PUBLISH_BATCH_SIZE) {
                        notification_recipients::Entity::insert_many(batch.to_vec())
                            .exec_without_returning(txn)
                            .await?;
                    }
                    Ok(true)
                })
            })
            .await
            .context("publish notification")?;
        Ok(published)
    }

    async fn schedule(
        &self,
        id: Uuid,
        scheduled_at: DateTime<Utc>,
        target_user_ids: Option<&[Uuid]>,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut update = notifications::Entity::update_many()
            .col_expr(notifications::Column::ScheduledAt, Expr::value(Some(scheduled_at)))
            .col_expr(notifications::Column::UpdatedAt, Expr::value(now));
        if let Some(ids) = target_user_ids {
            let mut patch = Metadata::new();
            patch.set_target_user_ids(ids);
            update = update.col_expr(
                notifications::Column::Metadata,
                Expr::cust_with_values("metadata || $1", [patch.to_json()]),
            );
        }
        let result = update
            .filter(notifications::Column::Id.eq(id))
            .filter(notifications::Column::IsDraft.eq(true))
            .filter(notifications::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .context("schedule notification")?;
        Ok(result.rows_affected > 0)
    }

    async fn unschedule(&self, id: Uuid, now: DateTime<Utc>) -> RepoResult<bool> {
        let result = notifications::Entity::update_many()
            .col_expr(
                notifications::Column::ScheduledAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(
                notifications::Column::Metadata,
                Expr::cust(format!("metadata - '{TARGET_USER_IDS}'")),
            )
            .col_expr(notifications::Column::UpdatedAt, Expr::value(now))
            .filter(notifications::Column::Id.eq(id))
            .filter(notifications::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await
            .context("unschedule notification")?;
        Ok(result.rows_affected > 0)
    }

    async fn convert_to_draft(&self, id: Uuid, now: DateTime<Utc>) -> RepoResult<bool> {
        let converted = self
            .db
            .transaction::<_, bool, DbErr>(move |txn| {
                Box::pin(async move {
                    let result = notifications::Entity::update_many()
                        .col_expr(notifications::Column::IsDraft, Expr::value(true))
                        .col_expr(
                            notifications::Column::ScheduledAt,
                            Expr::value(Option::<DateTime<Utc>>::None),
                        )
                        .col_expr(
                            notifications::Column::DeliveredAt,
                            Expr::value(Option::<DateTime<Utc>>::None),
                        )
                        .col_expr(notifications::Column::UpdatedAt, Expr::value(now))
                        .filter(notifications::Column::Id.eq(id))
                        .filter(notifications::Column::DeletedAt.is_null())
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Ok(false);
                    }
                    notification_recipients::Entity::delete_many()
                        .filter(notification_recipients::Column::NotificationId.eq(id))
                        .exec(txn)
                        .await?;
                    Ok(true)
                })
            })
            .await
            .context("convert notification to draft")?;
        Ok(converted)
    }

    async fn create_with_recipient(
        &self,
        template: &NotificationTemplate,
        recipient: &NotificationRecipient,
    ) -> RepoResult<bool> {
        let template_row = template_active_model(template)?;
        let recipient_row = recipient_active_model(recipient);
        let stored = self
            .db
            .transaction::<_, bool, DbErr>(move |txn| {
                Box::pin(async move {
                    template_row.insert(txn).await?;

                    let savepoint = txn.begin().await?;
                    match recipient_row.insert(&savepoint).await {
                        Ok(_) => {
                            savepoint.commit().await?;
                            Ok(true)
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "recipient insert failed, keeping notification");
                            savepoint.rollback().await?;
                            Ok(false)
                        }
                    }
                })
            })
            .await
            .context("create notification with recipient")?;
        Ok(stored)
    }

    async fn list(
        &self,
        filter: TemplateFilter,
        page: PageRequest,
    ) -> RepoResult<Vec<NotificationTemplate>> {
        let mut query =
            notifications::Entity::find().filter(notifications::Column::DeletedAt.is_null());
        query = match filter.status {
            Some(AdminStatusFilter::Draft) => query
                .filter(notifications::Column::IsDraft.eq(true))
                .filter(notifications::Column::ScheduledAt.is_null()),
            Some(AdminStatusFilter::Scheduled) => query
                .filter(notifications::Column::IsDraft.eq(true))
                .filter(notifications::Column::ScheduledAt.is_not_null()),
            Some(AdminStatusFilter::Delivered) => query
                .filter(notifications::Column::IsDraft.eq(false))
                .filter(notifications::Column::DeliveredAt.is_not_null()),
            None => query,
        };
        if let Some(creator_id) = filter.creator_id {
            query = query.filter(notifications::Column::CreatorId.eq(creator_id));
        }
        let models = query
            .order_by_desc(notifications::Column::CreatedAt)
            .limit(page.limit())
            .offset(page.offset())
            .all(&self.db)
            .await
            .context("list notifications")?;
        Ok(models.into_iter().map(template_from_model).collect())
    }

    async fn list_drafts(
        &self,
        creator_id: Option<Uuid>,
        page: PageRequest,
    ) -> RepoResult<Vec<NotificationTemplate>> {
        self.list(
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
    ) -> RepoResult<Vec<NotificationTemplate>> {
        let mut query = notifications::Entity::find()
            .filter(notifications::Column::DeletedAt.is_null())
            .filter(notifications::Column::IsDraft.eq(false))
            .filter(notifications::Column::DeliveredAt.is_not_null());
        if let Some(creator_id) = filter.creator_id {
            query = query.filter(notifications::Column::CreatorId.eq(creator_id));
        }
        if let Some(start) = filter.start {
            query = query.filter(notifications::Column::DeliveredAt.gte(start));
        }
        if let Some(end) = filter.end {
            query = query.filter(notifications::Column::DeliveredAt.lte(end));
        }
        let models = query
            .order_by_desc(notifications::Column::DeliveredAt)
            .limit(page.limit())
            .offset(page.offset())
            .all(&self.db)
            .await
            .context("list notification history")?;
        Ok(models.into_iter().map(template_from_model).collect())
    }

    async fn due_scheduled(&self, now: DateTime<Utc>) -> RepoResult<Vec<NotificationTemplate>> {
        let models = notifications::Entity::find()
            .filter(notifications::Column::DeletedAt.is_null())
            .filter(notifications::Column::IsDraft.eq(true))
            .filter(notifications::Column::ScheduledAt.lte(now))
            .order_by_asc(notifications::Column::ScheduledAt)
            .limit(DUE_BATCH_LIMIT)
            .all(&self.db)
            .await
            .context("list due scheduled notifications")?;
        Ok(models.into_iter().map(template_from_model).collect())
    }
}

/// JSON-encoded content columns.
struct ContentColumns {
    kind: String,
    media_urls: Value,
    action_links: Value,
    metadata: Value,
}

impl ContentColumns {
    fn encode(content: &TemplateContent) -> anyhow::Result<Self> {
        Ok(Self {
            kind: content.kind.as_str().to_owned(),
            media_urls: Value::from(content.media_urls.clone()),
            action_links: serde_json::to_value(&content.action_links)
                .context("encode action links")?,
            metadata: content.metadata.to_json(),
        })
    }
}

fn template_active_model(t: &NotificationTemplate) -> anyhow::Result<notifications::ActiveModel> {
    let columns = ContentColumns::encode(&t.content)?;
    Ok(notifications::ActiveModel {
        id: Set(t.id),
        creator_id: Set(t.creator_id),
        kind: Set(columns.kind),
        heading: Set(t.content.heading.clone()),
        title: Set(t.content.title.clone()),
        message: Set(t.content.message.clone()),
        content_image_url: Set(t.content.content_image_url.clone()),
        thumbnail_url: Set(t.content.thumbnail_url.clone()),
        media_urls: Set(columns.media_urls),
        content_link: Set(t.content.content_link.clone()),
        action_links: Set(columns.action_links),
        metadata: Set(columns.metadata),
        is_draft: Set(t.is_draft),
        scheduled_at: Set(t.scheduled_at),
        delivered_at: Set(t.delivered_at),
        created_at: Set(t.created_at),
        updated_at: Set(t.updated_at),
        deleted_at: Set(None),
    })
}

fn template_from_model(model: notifications::Model) -> NotificationTemplate {
    NotificationTemplate {
        id: model.id,
        creator_id: model.creator_id,
        content: TemplateContent {
            kind: NotificationKind::parse(&model.kind).unwrap_or_default(),
            heading: model.heading,
            title: model.title,
            message: model.message,
            content_image_url: model.content_image_url,
            thumbnail_url: model.thumbnail_url,
            media_urls: serde_json::from_value(model.media_urls).unwrap_or_default(),
            content_link: model.content_link,
            action_links: serde_json::from_value(model.action_links).unwrap_or_default(),
            metadata: Metadata::from_json(model.metadata),
        },
        is_draft: model.is_draft,
        scheduled_at: model.scheduled_at,
        delivered_at: model.delivered_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

fn recipient_active_model(r: &NotificationRecipient) -> notification_recipients::ActiveModel {
    notification_recipients::ActiveModel {
        id: Set(r.id),
        notification_id: Set(r.notification_id),
        user_id: Set(r.user_id),
        status: Set(r.status.as_str().to_owned()),
        delivered_at: Set(r.delivered_at),
        read_at: Set(r.read_at),
        error_message: Set(r.error_message.clone()),
        device_id: Set(r.device_id.clone()),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    }
}

fn recipient_from_model(model: notification_recipients::Model) -> NotificationRecipient {
    NotificationRecipient {
        id: model.id,
        notification_id: model.notification_id,
        user_id: model.user_id,
        status: RecipientStatus::parse(&model.status).unwrap_or(RecipientStatus::Pending),
        delivered_at: model.delivered_at,
        read_at: model.read_at,
        error_message: model.error_message,
        device_id: model.device_id,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── Recipient repository ─────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRecipientRepository {
    pub db: DatabaseConnection,
}

impl DbRecipientRepository {
    fn feed_query(user_id: Uuid) -> sea_orm::Select<notification_recipients::Entity> {
        notification_recipients::Entity::find()
            .filter(notification_recipients::Column::UserId.eq(user_id))
            .order_by_desc_nulls_last(notification_recipients::Column::DeliveredAt)
            .order_by_desc(notification_recipients::Column::CreatedAt)
    }

    async fn load_feed(
        &self,
        query: sea_orm::Select<notification_recipients::Entity>,
        what: &'static str,
    ) -> RepoResult<Vec<FeedEntry>> {
        let rows = query
            .find_also_related(notifications::Entity)
            .filter(notifications::Column::DeletedAt.is_null())
            .all(&self.db)
            .await
            .context(what)?;
        Ok(rows
            .into_iter()
            .filter_map(|(recipient, notification)| {
                notification.map(|n| FeedEntry {
                    recipient: recipient_from_model(recipient),
                    notification: template_from_model(n),
                })
            })
            .collect())
    }
}

impl RecipientRepository for DbRecipientRepository {
    async fn unread(&self, user_id: Uuid) -> RepoResult<Vec<FeedEntry>> {
        let query = Self::feed_query(user_id).filter(
            notification_recipients::Column::Status.eq(RecipientStatus::Delivered.as_str()),
        );
        self.load_feed(query, "list unread notifications").await
    }

    async fn list(&self, user_id: Uuid, page: PageRequest) -> RepoResult<Vec<FeedEntry>> {
        let query = Self::feed_query(user_id)
            .limit(page.limit())
            .offset(page.offset());
        self.load_feed(query, "list notifications").await
    }

    async fn list_since(&self, user_id: Uuid, since: DateTime<Utc>) -> RepoResult<Vec<FeedEntry>> {
        let query = Self::feed_query(user_id)
            .filter(notification_recipients::Column::CreatedAt.gt(since));
        self.load_feed(query, "list notifications since").await
    }

    async fn mark_read(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let result = notification_recipients::Entity::update_many()
            .col_expr(
                notification_recipients::Column::Status,
                Expr::value(RecipientStatus::Read.as_str()),
            )
            .col_expr(notification_recipients::Column::ReadAt, Expr::value(Some(now)))
            .col_expr(notification_recipients::Column::UpdatedAt, Expr::value(now))
            .filter(notification_recipients::Column::UserId.eq(user_id))
            .filter(notification_recipients::Column::NotificationId.is_in(notification_ids.to_vec()))
            .filter(
                notification_recipients::Column::Status
                    .is_in(RecipientStatus::sources_of(RecipientStatus::Read)),
            )
            .exec(&self.db)
            .await
            .context("mark notifications read")?;
        Ok(result.rows_affected)
    }

    async fn mark_all_read(&self, user_id: Uuid, now: DateTime<Utc>) -> RepoResult<u64> {
        let result = notification_recipients::Entity::update_many()
            .col_expr(
                notification_recipients::Column::Status,
                Expr::value(RecipientStatus::Read.as_str()),
            )
            .col_expr(notification_recipients::Column::ReadAt, Expr::value(Some(now)))
            .col_expr(notification_recipients::Column::UpdatedAt, Expr::value(now))
            .filter(notification_recipients::Column::UserId.eq(user_id))
            .filter(
                notification_recipients::Column::Status
                    .is_in(RecipientStatus::sources_of(RecipientStatus::Read)),
            )
            .exec(&self.db)
            .await
            .context("mark all notifications read")?;
        Ok(result.rows_affected)
    }

    async fn has_unread(&self, user_id: Uuid) -> RepoResult<bool> {
        let row = ExistsRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            r#"
            SELECT EXISTS (
                SELECT 1 FROM notification_recipients
                WHERE user_id = $1 AND status = $2
            ) AS "exists"
            "#,
            [user_id.into(), RecipientStatus::Delivered.as_str().into()],
        ))
        .one(&self.db)
        .await
        .context("check unread notifications")?;
        Ok(row.is_some_and(|r| r.exists))
    }

    async fn acknowledge_delivery(
        &self,
        user_id: Uuid,
        notification_ids: &[Uuid],
        now: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let result = notification_recipients::Entity::update_many()
            .col_expr(
                notification_recipients::Column::Status,
                Expr::value(RecipientStatus::Delivered.as_str()),
            )
            .col_expr(notification_recipients::Column::DeliveredAt, Expr::value(Some(now)))
            .col_expr(notification_recipients::Column::UpdatedAt, Expr::value(now))
            .filter(notification_recipients::Column::UserId.eq(user_id))
            .filter(notification_recipients::Column::NotificationId.is_in(notification_ids.to_vec()))
            .filter(
                notification_recipients::Column::Status
                    .is_in(RecipientStatus::sources_of(RecipientStatus::Delivered)),
            )
            .exec(&self.db)
            .await
            .context("acknowledge delivery")?;
        Ok(result.rows_affected)
    }

    async fn mark_failed(
        &self,
        user_id: Uuid,
        notification_id: Uuid,
        error_message: &str,
        device_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> RepoResult<u64> {
        let result = notification_recipients::Entity::update_many()
            .col_expr(
                notification_recipients::Column::Status,
                Expr::value(RecipientStatus::Failed.as_str()),
            )
            .col_expr(
                notification_recipients::Column::ErrorMessage,
                Expr::value(Some(error_message.to_owned())),
            )
            .col_expr(
                notification_recipients::Column::DeviceId,
                Expr::value(device_id.map(str::to_owned)),
            )
            .col_expr(notification_recipients::Column::UpdatedAt, Expr::value(now))
            .filter(notification_recipients::Column::UserId.eq(user_id))
            .filter(notification_recipients::Column::NotificationId.eq(notification_id))
            .filter(
                notification_recipients::Column::Status
                    .is_in(RecipientStatus::sources_of(RecipientStatus::Failed)),
            )
            .exec(&self.db)
            .await
            .context("mark delivery failed")?;
        Ok(result.rows_affected)
    }

    async fn delete_for_user(&self, user_id: Uuid, notification_id: Uuid) -> RepoResult<bool> {
        let result = notification_recipients::Entity::delete_many()
            .filter(notification_recipients::Column::UserId.eq(user_id))
            .filter(notification_recipients::Column::NotificationId.eq(notification_id))
            .exec(&self.db)
            .await
            .context("delete notification for user")?;
        Ok(result.rows_affected > 0)
    }

    async fn clear_all(&self, user_id: Uuid) -> RepoResult<u64> {
        let result = notification_recipients::Entity::delete_many()
            .filter(notification_recipients::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .context("clear notifications")?;
        Ok(result.rows_affected)
    }

    async fn receipts(&self, notification_id: Uuid) -> RepoResult<Vec<ReceiptView>> {
        #[derive(Debug, FromQueryResult)]
        struct ReceiptRow {
            user_id: Uuid,
            username: String,
            email: String,
            status: String,
            delivered_at: Option<DateTime<Utc>>,
            read_at: Option<DateTime<Utc>>,
        }

        let rows = ReceiptRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            r#"
            SELECT r.user_id,
                   COALESCE(u.username, 'unknown') AS username,
                   COALESCE(u.email, 'unknown') AS email,
                   r.status,
                   r.delivered_at,
                   r.read_at
            FROM notification_recipients r
            LEFT JOIN users u ON u.id = r.user_id
            WHERE r.notification_id = $1
            ORDER BY r.created_at ASC
            "#,
            [notification_id.into()],
        ))
        .all(&self.db)
        .await
        .context("list notification receipts")?;

        Ok(rows
            .into_iter()
            .map(|row| ReceiptView {
                user_id: row.user_id,
                username: row.username,
                email: row.email,
                status: RecipientStatus::parse(&row.status).unwrap_or(RecipientStatus::Pending),
                delivered_at: row.delivered_at,
                read_at: row.read_at,
            })
            .collect())
    }
}

// ── Dedup index ──────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbDedupIndex {
    pub db: DatabaseConnection,
}

impl DedupIndex for DbDedupIndex {
    async fn seen_since(&self, user_id: Uuid, dedup_key: &str, since: DateTime<Utc>) -> RepoResult<bool> {
        let row = ExistsRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM notification_recipients r
                JOIN notifications n ON n.id = r.notification_id
                WHERE n.metadata->>'dedup_key' = $1
                  AND r.user_id = $2
                  AND r.created_at > $3
            ) AS "exists"
            "#,
            [dedup_key.into(), user_id.into(), since.into()],
        ))
        .one(&self.db)
        .await
        .context("check dedup key")?;
        Ok(row.is_some_and(|r| r.exists))
    }
}

// ── System template repository ──────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSystemTemplateRepository {
    pub db: DatabaseConnection,
}

impl SystemTemplateRepository for DbSystemTemplateRepository {
    async fn find_enabled(&self, event_key: &str) -> RepoResult<Option<SystemTemplate>> {
        let model = system_notification_templates::Entity::find()
            .filter(system_notification_templates::Column::EventKey.eq(event_key))
            .filter(system_notification_templates::Column::Enabled.eq(true))
            .one(&self.db)
            .await
            .context("find system template")?;
        Ok(model.map(system_template_from_model))
    }

    async fn list(&self) -> RepoResult<Vec<SystemTemplate>> {
        let models = system_notification_templates::Entity::find()
            .order_by_asc(system_notification_templates::Column::EventKey)
            .all(&self.db)
            .await
            .context("list system templates")?;
        Ok(models.into_iter().map(system_template_from_model).collect())
    }

    async fn update(
        &self,
        event_key: &str,
        patch: &SystemTemplatePatch,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        use system_notification_templates::Column;

        let mut update = system_notification_templates::Entity::update_many()
            .col_expr(Column::UpdatedAt, Expr::value(now));
        if let Some(heading) = &patch.heading {
            update = update.col_expr(Column::Heading, Expr::value(heading.clone()));
        }
        if let Some(title) = &patch.title {
            update = update.col_expr(Column::Title, Expr::value(title.clone()));
        }
        if let Some(message) = &patch.message {
            update = update.col_expr(Column::Message, Expr::value(message.clone()));
        }
        if let Some(kind) = patch.kind {
            update = update.col_expr(Column::Kind, Expr::value(kind.as_str()));
        }
        if let Some(icon) = &patch.icon {
            update = update.col_expr(Column::Icon, Expr::value(Some(icon.clone())));
        }
        if let Some(enabled) = patch.enabled {
            update = update.col_expr(Column::Enabled, Expr::value(enabled));
        }
        let result = update
            .filter(Column::EventKey.eq(event_key))
            .exec(&self.db)
            .await
            .context("update system template")?;
        Ok(result.rows_affected > 0)
    }

    async fn seed(&self, templates: &[SystemTemplate]) -> RepoResult<u64> {
        if templates.is_empty() {
            return Ok(0);
        }
        let rows = templates.iter().map(|t| system_notification_templates::ActiveModel {
            id: Set(t.id),
            event_key: Set(t.event_key.clone()),
            name: Set(t.name.clone()),
            enabled: Set(t.enabled),
            heading: Set(t.heading.clone()),
            title: Set(t.title.clone()),
            message: Set(t.message.clone()),
            kind: Set(t.kind.as_str().to_owned()),
            icon: Set(t.icon.clone()),
            template_vars: Set(Value::from(t.template_vars.clone())),
            created_at: Set(t.created_at),
            updated_at: Set(t.updated_at),
        });
        let inserted = system_notification_templates::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::column(system_notification_templates::Column::EventKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("seed system templates")?;
        Ok(inserted)
    }
}

fn system_template_from_model(model: system_notification_templates::Model) -> SystemTemplate {
    SystemTemplate {
        id: model.id,
        event_key: model.event_key,
        name: model.name,
        enabled: model.enabled,
        heading: model.heading,
        title: model.title,
        message: model.message,
        kind: NotificationKind::parse(&model.kind).unwrap_or_default(),
        icon: model.icon,
        template_vars: serde_json::from_value(model.template_vars).unwrap_or_default(),
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

// ── User directory ───────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserDirectory {
    pub db: DatabaseConnection,
}

impl UserDirectory for DbUserDirectory {
    async fn list_ids(&self) -> RepoResult<Vec<Uuid>> {
        let ids = users::Entity::find()
            .select_only()
            .column(users::Column::Id)
            .order_by_asc(users::Column::Id)
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
            .context("list user ids")?;
        Ok(ids)
    }

    async fn list(&self, page: PageRequest) -> RepoResult<Vec<DirectoryUser>> {
        let models = users::Entity::find()
            .order_by_asc(users::Column::Username)
            .limit(page.limit())
            .offset(page.offset())
            .all(&self.db)
            .await
            .context("list directory users")?;
        Ok(models
            .into_iter()
            .map(|m| DirectoryUser {
                id: m.id,
                username: m.username,
                email: m.email,
                first_name: m.first_name,
                last_name: m.last_name,
                profile_picture_url: m.profile_picture_url,
                created_at: m.created_at,
                updated_at: m.updated_at,
            })
            .collect())
    }

    async fn upsert_newer(&self, directory_users: &[DirectoryUser]) -> RepoResult<u64> {
        if directory_users.is_empty() {
            return Ok(0);
        }
        let rows = directory_users.iter().map(|u| users::ActiveModel {
            id: Set(u.id),
            username: Set(u.username.clone()),
            email: Set(u.email.clone()),
            first_name: Set(u.first_name.clone()),
            last_name: Set(u.last_name.clone()),
            profile_picture_url: Set(u.profile_picture_url.clone()),
            created_at: Set(u.created_at),
            updated_at: Set(u.updated_at),
        });
        let written = users::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::column(users::Column::Id)
                    .update_columns([
                        users::Column::Username,
                        users::Column::Email,
                        users::Column::FirstName,
                        users::Column::LastName,
                        users::Column::ProfilePictureUrl,
                        users::Column::UpdatedAt,
                    ])
                    .action_and_where(Expr::cust("excluded.updated_at > users.updated_at"))
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("upsert directory users")?;
        Ok(written)
    }
}

// ── Sync state ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSyncStateRepository {
    pub db: DatabaseConnection,
}

impl SyncStateRepository for DbSyncStateRepository {
    async fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let model = sync_states::Entity::find_by_id(key.to_owned())
            .one(&self.db)
            .await
            .context("get sync state")?;
        Ok(model.map(|m| m.value))
    }

    async fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        sync_states::Entity::insert(sync_states::ActiveModel {
            key: Set(key.to_owned()),
            value: Set(value.to_owned()),
            updated_at: Set(Utc::now()),
        })
        .on_conflict(
            OnConflict::column(sync_states::Column::Key)
                .update_columns([sync_states::Column::Value, sync_states::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(&self.db)
        .await
        .context("set sync state")?;
        Ok(())
    }
}
