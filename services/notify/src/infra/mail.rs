use std::sync::Arc;

use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::domain::repository::{Mailer, RepoResult};
use crate::error::NotifyServiceError;

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// Plain-text SMTP mailer over STARTTLS/TLS relay.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyServiceError> {
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|e| NotifyServiceError::Validation(format!("invalid from address: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| NotifyServiceError::Transport(e.to_string()))?
            .port(settings.port);
        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: Arc::new(builder.build()),
            from,
        })
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> RepoResult<()> {
        let to: Mailbox = to
            .parse()
            .map_err(|e| NotifyServiceError::Validation(format!("invalid recipient address: {e}")))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_owned())
            .map_err(|e| NotifyServiceError::Validation(format!("failed to build email: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| NotifyServiceError::Transport(e.to_string()))?;
        tracing::debug!(subject, "email sent");
        Ok(())
    }
}
