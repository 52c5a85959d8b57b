use std::time::Duration;

use serde::Deserialize;

use tidings_core::config::Config;

use crate::broadcaster::DEFAULT_QUEUE_CAPACITY;
use crate::infra::mail::SmtpSettings;

/// Notify service configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port for the HTTP server (default 3114). Env var: `NOTIFY_PORT`.
    #[serde(default = "default_port")]
    pub notify_port: u16,
    /// Shared secret expected in `x-service-token` on `/svc` routes, and sent
    /// to the profile service.
    pub service_token: String,
    /// Profile service base URL. Directory sync is disabled when unset.
    #[serde(default)]
    pub profile_service_url: Option<String>,

    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_pass: Option<String>,
    #[serde(default = "default_smtp_from")]
    pub smtp_from: String,

    #[serde(default = "default_sync_interval")]
    pub directory_sync_interval_secs: u64,
    #[serde(default = "default_full_sync_interval")]
    pub directory_full_sync_interval_secs: u64,
    #[serde(default = "default_scheduler_interval")]
    pub scheduler_interval_secs: u64,
    #[serde(default = "default_queue_capacity")]
    pub broadcast_queue_capacity: usize,
    #[serde(default = "default_side_effect_timeout")]
    pub side_effect_timeout_secs: u64,
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl Config for NotifyConfig {}

fn default_port() -> u16 {
    3114
}

fn default_smtp_host() -> String {
    "localhost".to_owned()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_smtp_from() -> String {
    "Tidings <no-reply@localhost>".to_owned()
}

fn default_sync_interval() -> u64 {
    10
}

fn default_full_sync_interval() -> u64 {
    24 * 60 * 60
}

fn default_scheduler_interval() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_side_effect_timeout() -> u64 {
    30
}

fn default_shutdown_grace() -> u64 {
    10
}

impl NotifyConfig {
    pub fn smtp(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: self.smtp_user.clone(),
            password: self.smtp_pass.clone(),
            from: self.smtp_from.clone(),
        }
    }

    pub fn directory_sync_interval(&self) -> Duration {
        Duration::from_secs(self.directory_sync_interval_secs.max(1))
    }

    pub fn directory_full_sync_interval(&self) -> Duration {
        Duration::from_secs(self.directory_full_sync_interval_secs.max(1))
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler_interval_secs.max(1))
    }

    pub fn side_effect_timeout(&self) -> Duration {
        Duration::from_secs(self.side_effect_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
