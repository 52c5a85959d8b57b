use std::time::Duration;

use sea_orm::DatabaseConnection;

use crate::broadcaster::Broadcaster;
use crate::infra::db::{
    DbDedupIndex, DbNotificationRepository, DbRecipientRepository, DbSyncStateRepository,
    DbSystemTemplateRepository, DbUserDirectory,
};
use crate::infra::mail::SmtpMailer;
use crate::infra::profile::HttpProfileSource;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub broadcaster: Broadcaster,
    pub mailer: SmtpMailer,
    /// `None` when no profile service is configured.
    pub profiles: Option<HttpProfileSource>,
    pub service_token: String,
    pub side_effect_timeout: Duration,
}

impl AppState {
    pub fn notification_repo(&self) -> DbNotificationRepository {
        DbNotificationRepository {
            db: self.db.clone(),
        }
    }

    pub fn recipient_repo(&self) -> DbRecipientRepository {
        DbRecipientRepository {
            db: self.db.clone(),
        }
    }

    pub fn dedup_index(&self) -> DbDedupIndex {
        DbDedupIndex {
            db: self.db.clone(),
        }
    }

    pub fn system_template_repo(&self) -> DbSystemTemplateRepository {
        DbSystemTemplateRepository {
            db: self.db.clone(),
        }
    }

    pub fn user_directory(&self) -> DbUserDirectory {
        DbUserDirectory {
            db: self.db.clone(),
        }
    }

    pub fn sync_state_repo(&self) -> DbSyncStateRepository {
        DbSyncStateRepository {
            db: self.db.clone(),
        }
    }
}
