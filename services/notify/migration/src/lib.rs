use sea_orm_migration::prelude::*;

mod m20251001_000001_create_users;
mod m20251001_000002_create_notifications;
mod m20251001_000003_create_notification_recipients;
mod m20251001_000004_create_system_notification_templates;
mod m20251001_000005_create_sync_states;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251001_000001_create_users::Migration),
            Box::new(m20251001_000002_create_notifications::Migration),
            Box::new(m20251001_000003_create_notification_recipients::Migration),
            Box::new(m20251001_000004_create_system_notification_templates::Migration),
            Box::new(m20251001_000005_create_sync_states::Migration),
        ]
    }
}
