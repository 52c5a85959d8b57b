use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use uuid::Uuid;

use tidings_core::task::spawn_detached;

use crate::broadcaster::{Broadcaster, LiveEvent};
use crate::domain::email::{EMAIL_NOTICE_MESSAGE, EmailNotice};
use crate::domain::repository::{Mailer, NotificationRepository};
use crate::domain::types::{
    MetaValue, Metadata, NotificationKind, NotificationRecipient, NotificationTemplate,
    TemplateContent,
};
use crate::error::NotifyServiceError;

pub struct SendEmailInput {
    pub user_id: Uuid,
    pub email: String,
    pub email_type: String,
    pub context: Map<String, Value>,
}

pub struct SendEmailNoticeUseCase<M, R>
where
    M: Mailer + Clone + 'static,
    R: NotificationRepository + Clone + 'static,
{
    pub mailer: M,
    pub notifications: R,
    pub broadcaster: Broadcaster,
    pub timeout: Duration,
}

impl<M, R> SendEmailNoticeUseCase<M, R>
where
    M: Mailer + Clone + 'static,
    R: NotificationRepository + Clone + 'static,
{
    /// Validate the request, then send the email and record an in-app notice
    /// in the background. Background failures are logged only.
    pub fn execute(&self, input: SendEmailInput) -> Result<JoinHandle<()>, NotifyServiceError> {
        let email = input.email.trim().to_owned();
        if email.is_empty() || !email.contains('@') {
            return Err(NotifyServiceError::Validation(
                "a valid email is required".to_owned(),
            ));
        }
        let notice = EmailNotice::compose(&input.email_type, &input.context)?;

        let mailer = self.mailer.clone();
        let notifications = self.notifications.clone();
        let broadcaster = self.broadcaster.clone();
        let user_id = input.user_id;
        Ok(spawn_detached("email-notice", self.timeout, async move {
            if let Err(e) = mailer.send(&email, &notice.subject, &notice.body).await {
                tracing::warn!(
                    %user_id,
                    email_type = notice.kind.as_str(),
                    error = %e,
                    "email send failed"
                );
            }
            record_notice(&notifications, &broadcaster, user_id, &notice).await
        }))
    }
}

async fn record_notice<R: NotificationRepository>(
    notifications: &R,
    broadcaster: &Broadcaster,
    user_id: Uuid,
    notice: &EmailNotice,
) -> Result<(), NotifyServiceError> {
    let now = Utc::now();
    let mut metadata = Metadata::new();
    metadata.insert("email_type", MetaValue::Text(notice.kind.as_str().to_owned()));

    let template = NotificationTemplate {
        is_draft: false,
        delivered_at: Some(now),
        ..NotificationTemplate::new_draft(
            Uuid::nil(),
            TemplateContent {
                kind: NotificationKind::Info,
                heading: notice.kind.heading().to_owned(),
                title: notice.subject.clone(),
                message: EMAIL_NOTICE_MESSAGE.to_owned(),
                action_links: notice.action_link.iter().cloned().collect(),
                metadata,
                ..Default::default()
            },
            now,
        )
    };
    let recipient = NotificationRecipient::delivered(template.id, user_id, now);
    notifications
        .create_with_recipient(&template, &recipient)
        .await?;
    broadcaster.publish(LiveEvent::notification_created(user_id, Arc::new(template)));
    Ok(())
}
