use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NotificationRecipients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(NotificationRecipients::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(NotificationRecipients::NotificationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationRecipients::UserId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(NotificationRecipients::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(NotificationRecipients::DeliveredAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(NotificationRecipients::ReadAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(NotificationRecipients::ErrorMessage).text())
                    .col(ColumnDef::new(NotificationRecipients::DeviceId).string_len(100))
                    .col(
                        ColumnDef::new(NotificationRecipients::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(NotificationRecipients::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                NotificationRecipients::Table,
                                NotificationRecipients::NotificationId,
                            )
                            .to(Notifications::Table, Notifications::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(NotificationRecipients::Table)
                    .col(NotificationRecipients::UserId)
                    .col((NotificationRecipients::CreatedAt, IndexOrder::Desc))
                    .name("idx_notification_recipients_user_id_created_at")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(NotificationRecipients::Table)
                    .col(NotificationRecipients::NotificationId)
                    .name("idx_notification_recipients_notification_id")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(NotificationRecipients::Table)
                    .col(NotificationRecipients::UserId)
                    .col(NotificationRecipients::Status)
                    .name("idx_notification_recipients_user_id_status")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NotificationRecipients::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum NotificationRecipients {
    Table,
    Id,
    NotificationId,
    UserId,
    Status,
    DeliveredAt,
    ReadAt,
    ErrorMessage,
    DeviceId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Notifications {
    Table,
    Id,
}
