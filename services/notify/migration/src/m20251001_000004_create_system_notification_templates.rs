use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SystemNotificationTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SystemNotificationTemplates::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SystemNotificationTemplates::EventKey)
                            .string_len(100)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SystemNotificationTemplates::Name)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SystemNotificationTemplates::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(SystemNotificationTemplates::Heading)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SystemNotificationTemplates::Title)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SystemNotificationTemplates::Message)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SystemNotificationTemplates::Kind)
                            .string_len(32)
                            .not_null()
                            .default("info"),
                    )
                    .col(ColumnDef::new(SystemNotificationTemplates::Icon).string_len(50))
                    .col(
                        ColumnDef::new(SystemNotificationTemplates::TemplateVars)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(SystemNotificationTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SystemNotificationTemplates::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(SystemNotificationTemplates::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum SystemNotificationTemplates {
    Table,
    Id,
    EventKey,
    Name,
    Enabled,
    Heading,
    Title,
    Message,
    Kind,
    Icon,
    TemplateVars,
    CreatedAt,
    UpdatedAt,
}
