use sea_orm::entity::prelude::*;

/// Notification template authored by an admin or created by a system trigger.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub creator_id: Uuid,
    pub kind: String,
    pub heading: String,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub content_image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub media_urls: Json,
    pub content_link: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub action_links: Json,
    #[sea_orm(column_type = "JsonBinary")]
    pub metadata: Json,
    pub is_draft: bool,
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub delivered_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::notification_recipients::Entity")]
    NotificationRecipients,
}

impl Related<super::notification_recipients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NotificationRecipients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
