use chrono::{DateTime, SecondsFormat, Utc};

use tidings_core::task::PeriodicJob;

use crate::domain::repository::{ProfileSource, SyncStateRepository, UserDirectory};
use crate::error::NotifyServiceError;

/// Sync-state key holding the start time of the last successful sync.
pub const LAST_USER_SYNC_KEY: &str = "last_user_sync_time";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Only profiles changed since the last recorded sync.
    Incremental,
    /// Every profile, regardless of the recorded sync time.
    Full,
    /// Profiles changed after an explicit point in time.
    Since(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub fetched: usize,
    pub written: u64,
}

pub struct SyncDirectoryUseCase<P, D, S>
where
    P: ProfileSource,
    D: UserDirectory,
    S: SyncStateRepository,
{
    pub source: P,
    pub directory: D,
    pub state: S,
}

impl<P, D, S> SyncDirectoryUseCase<P, D, S>
where
    P: ProfileSource,
    D: UserDirectory,
    S: SyncStateRepository,
{
    pub async fn execute(&self, mode: SyncMode) -> Result<SyncReport, NotifyServiceError> {
        let started = Utc::now();
        let since = match mode {
            SyncMode::Incremental => self.last_sync().await?,
            SyncMode::Full => None,
            SyncMode::Since(at) => Some(at),
        };

        let users = self.source.fetch_users(since).await?;
        let written = if users.is_empty() {
            0
        } else {
            self.directory.upsert_newer(&users).await?
        };

        // Only advanced after a successful write.
        self.state
            .set(
                LAST_USER_SYNC_KEY,
                &started.to_rfc3339_opts(SecondsFormat::Micros, true),
            )
            .await?;

        Ok(SyncReport {
            fetched: users.len(),
            written,
        })
    }

    async fn last_sync(&self) -> Result<Option<DateTime<Utc>>, NotifyServiceError> {
        let Some(raw) = self.state.get(LAST_USER_SYNC_KEY).await? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                tracing::warn!(value = %raw, error = %e, "unreadable last sync time, running full sync");
                Ok(None)
            }
        }
    }
}

pub struct DirectorySyncJob<P, D, S>
where
    P: ProfileSource,
    D: UserDirectory,
    S: SyncStateRepository,
{
    pub usecase: SyncDirectoryUseCase<P, D, S>,
    pub mode: SyncMode,
}

impl<P, D, S> PeriodicJob for DirectorySyncJob<P, D, S>
where
    P: ProfileSource + 'static,
    D: UserDirectory + 'static,
    S: SyncStateRepository + 'static,
{
    fn name(&self) -> &'static str {
        match self.mode {
            SyncMode::Full => "directory-full-sync",
            SyncMode::Incremental | SyncMode::Since(_) => "directory-sync",
        }
    }

    async fn run(&self) -> anyhow::Result<()> {
        let report = self.usecase.execute(self.mode).await?;
        if report.written > 0 || self.mode == SyncMode::Full {
            tracing::info!(
                mode = self.name(),
                fetched = report.fetched,
                written = report.written,
                "user directory synced"
            );
        }
        Ok(())
    }
}
