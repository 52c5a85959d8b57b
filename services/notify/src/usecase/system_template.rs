use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::repository::SystemTemplateRepository;
use crate::domain::types::{NotificationKind, SystemTemplate, SystemTemplatePatch};
use crate::error::NotifyServiceError;

// ── ListSystemTemplates ──────────────────────────────────────────────────────

pub struct ListSystemTemplatesUseCase<R: SystemTemplateRepository> {
    pub repo: R,
}

impl<R: SystemTemplateRepository> ListSystemTemplatesUseCase<R> {
    pub async fn execute(&self) -> Result<Vec<SystemTemplate>, NotifyServiceError> {
        self.repo.list().await
    }
}

// ── UpdateSystemTemplate ─────────────────────────────────────────────────────

pub struct UpdateSystemTemplateUseCase<R: SystemTemplateRepository> {
    pub repo: R,
}

impl<R: SystemTemplateRepository> UpdateSystemTemplateUseCase<R> {
    pub async fn execute(
        &self,
        event_key: &str,
        patch: SystemTemplatePatch,
    ) -> Result<(), NotifyServiceError> {
        if patch.is_empty() {
            return Err(NotifyServiceError::Validation(
                "no valid fields to update".to_owned(),
            ));
        }
        for (field, value) in [
            ("heading", &patch.heading),
            ("title", &patch.title),
            ("message", &patch.message),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(NotifyServiceError::Validation(format!(
                    "{field} must not be empty"
                )));
            }
        }
        if !self.repo.update(event_key, &patch, Utc::now()).await? {
            return Err(NotifyServiceError::SystemTemplateNotFound);
        }
        tracing::info!(event_key, "system template updated");
        Ok(())
    }
}

// ── SeedSystemTemplates ──────────────────────────────────────────────────────

pub struct SeedSystemTemplatesUseCase<R: SystemTemplateRepository> {
    pub repo: R,
}

impl<R: SystemTemplateRepository> SeedSystemTemplatesUseCase<R> {
    /// Insert the built-in templates that do not exist yet. Existing rows,
    /// including admin edits, are left untouched.
    pub async fn execute(&self) -> Result<u64, NotifyServiceError> {
        let inserted = self.repo.seed(&default_system_templates(Utc::now())).await?;
        tracing::info!(inserted, "system templates seeded");
        Ok(inserted)
    }
}

struct Seed {
    event_key: &'static str,
    name: &'static str,
    heading: &'static str,
    title: &'static str,
    message: &'static str,
    kind: NotificationKind,
    icon: &'static str,
    vars: &'static [&'static str],
}

const SEEDS: &[Seed] = &[
    Seed {
        event_key: "user.login.success",
        name: "Login Successful",
        heading: "Welcome back, {{user_name}}!",
        title: "Login Successful",
        message: "You signed in at {{timestamp}} from {{device_os}} ({{ip_address}}).",
        kind: NotificationKind::Success,
        icon: "unlock",
        vars: &["user_name", "timestamp", "device_os", "ip_address"],
    },
    Seed {
        event_key: "user.login.failed",
        name: "Login Failed",
        heading: "Suspicious Login Attempt",
        title: "Login Failed",
        message: "{{attempt_count}} failed attempts from {{ip_address}}. Account locked for {{lock_duration}} minutes.",
        kind: NotificationKind::Security,
        icon: "shield-alert",
        vars: &["user_name", "attempt_count", "ip_address", "lock_duration", "timestamp"],
    },
    Seed {
        event_key: "wallet.deposit.completed",
        name: "Deposit Confirmed",
        heading: "Deposit of {{amount}} {{currency}} received",
        title: "Deposit Success",
        message: "Your deposit has been credited. New balance: {{new_balance}} {{currency}}.",
        kind: NotificationKind::Success,
        icon: "arrow-down-circle",
        vars: &["user_name", "amount", "currency", "new_balance", "reference", "timestamp"],
    },
    Seed {
        event_key: "wallet.withdraw.requested",
        name: "Withdrawal Requested",
        heading: "Withdrawal request for {{amount}} {{currency}}",
        title: "Withdrawal Initiated",
        message: "We're processing your withdrawal. Funds will reflect in {{estimated_time}}.",
        kind: NotificationKind::Info,
        icon: "arrow-up-circle",
        vars: &["user_name", "amount", "currency", "estimated_time", "reference", "timestamp"],
    },
    Seed {
        event_key: "wallet.withdraw.completed",
        name: "Withdrawal Completed",
        heading: "Withdrawal of {{amount}} {{currency}} sent",
        title: "Withdrawal Success",
        message: "Funds sent to {{destination}}. Transaction ID: {{txid}}.",
        kind: NotificationKind::Success,
        icon: "check-circle",
        vars: &["user_name", "amount", "currency", "destination", "txid", "timestamp"],
    },
    Seed {
        event_key: "kyc.submitted",
        name: "KYC Submitted",
        heading: "KYC documents submitted",
        title: "KYC In Review",
        message: "Your verification is being processed. We'll notify you shortly.",
        kind: NotificationKind::Info,
        icon: "file-text",
        vars: &["user_name", "timestamp"],
    },
    Seed {
        event_key: "kyc.approved",
        name: "KYC Approved",
        heading: "KYC approved, {{user_name}}!",
        title: "Account Verified",
        message: "Your identity has been verified. Every feature of your account is now available.",
        kind: NotificationKind::Success,
        icon: "user-check",
        vars: &["user_name", "timestamp"],
    },
    Seed {
        event_key: "kyc.rejected",
        name: "KYC Rejected",
        heading: "KYC rejected",
        title: "Verification Failed",
        message: "Reason: {{rejection_reason}}. You may resubmit with corrections.",
        kind: NotificationKind::ActionRequired,
        icon: "user-x",
        vars: &["user_name", "rejection_reason", "timestamp"],
    },
    Seed {
        event_key: "account.suspended",
        name: "Account Suspended",
        heading: "Account suspended",
        title: "Action Required",
        message: "Your account was suspended at {{timestamp}}. Reason: {{reason}}.",
        kind: NotificationKind::Security,
        icon: "lock",
        vars: &["user_name", "reason", "timestamp"],
    },
    Seed {
        event_key: "account.suspension.lifted",
        name: "Suspension Lifted",
        heading: "Suspension lifted",
        title: "Account Restored",
        message: "Your account is now active again as of {{timestamp}}.",
        kind: NotificationKind::Success,
        icon: "unlock",
        vars: &["user_name", "timestamp"],
    },
    Seed {
        event_key: "profile.updated",
        name: "Profile Updated",
        heading: "Profile Updated",
        title: "Your Profile Changed",
        message: "{{message}}",
        kind: NotificationKind::Info,
        icon: "user",
        vars: &["user_name", "timestamp", "message"],
    },
    Seed {
        event_key: "profile.email.updated",
        name: "Email Updated",
        heading: "Email Address Updated",
        title: "Your Email Changed",
        message: "{{message}}",
        kind: NotificationKind::Info,
        icon: "mail",
        vars: &["user_name", "timestamp", "message"],
    },
];

/// Built-in system templates, enabled by default.
pub fn default_system_templates(now: DateTime<Utc>) -> Vec<SystemTemplate> {
    SEEDS
        .iter()
        .map(|seed| SystemTemplate {
            id: Uuid::now_v7(),
            event_key: seed.event_key.to_owned(),
            name: seed.name.to_owned(),
            enabled: true,
            heading: seed.heading.to_owned(),
            title: seed.title.to_owned(),
            message: seed.message.to_owned(),
            kind: seed.kind,
            icon: Some(seed.icon.to_owned()),
            template_vars: seed.vars.iter().map(|v| (*v).to_owned()).collect(),
            created_at: now,
            updated_at: now,
        })
        .collect()
}
