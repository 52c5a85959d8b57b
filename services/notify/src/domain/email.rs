use serde_json::{Map, Value};

use crate::domain::types::ActionLink;
use crate::error::NotifyServiceError;

/// Feed message recorded after an email notice has been sent.
pub const EMAIL_NOTICE_MESSAGE: &str =
    "We've sent an email to your inbox. Please check your spam folder if you don't see it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailKind {
    EmailVerification,
    PasswordReset,
    Otp,
    NewLogin,
    DepositDetected,
    WithdrawCompleted,
}

impl EmailKind {
    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email_verification" => Some(Self::EmailVerification),
            "password_reset" => Some(Self::PasswordReset),
            "otp" => Some(Self::Otp),
            "new_login" => Some(Self::NewLogin),
            "deposit_detected" => Some(Self::DepositDetected),
            "withdraw_completed" => Some(Self::WithdrawCompleted),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
            Self::Otp => "otp",
            Self::NewLogin => "new_login",
            Self::DepositDetected => "deposit_detected",
            Self::WithdrawCompleted => "withdraw_completed",
        }
    }

    /// Heading of the in-app notice that follows the email.
    pub fn heading(self) -> &'static str {
        match self {
            Self::EmailVerification => "Email Verification Required",
            Self::PasswordReset => "Password Reset Requested",
            Self::Otp => "Login Verification Code",
            Self::NewLogin => "New Login Activity",
            Self::DepositDetected => "Deposit Confirmed",
            Self::WithdrawCompleted => "Withdrawal Completed",
        }
    }
}

/// A rendered plain-text email plus what the in-app notice should link to.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailNotice {
    pub kind: EmailKind,
    pub subject: String,
    pub body: String,
    pub action_link: Option<ActionLink>,
}

impl EmailNotice {
    pub fn compose(kind: &str, context: &Map<String, Value>) -> Result<Self, NotifyServiceError> {
        let kind = EmailKind::parse(kind).ok_or_else(|| {
            NotifyServiceError::Validation(format!("unsupported email type: {}", kind.trim()))
        })?;

        let notice = match kind {
            EmailKind::EmailVerification => {
                let url = required_str(context, "verify_url")?;
                Self {
                    kind,
                    subject: "Verify Your Email Address".to_owned(),
                    body: format!("Confirm your email address by opening this link:\n\n{url}\n"),
                    action_link: Some(primary_link("Verify Email", url)),
                }
            }
            EmailKind::PasswordReset => {
                let link = required_str(context, "reset_link")?;
                Self {
                    kind,
                    subject: "Reset Your Password".to_owned(),
                    body: format!(
                        "A password reset was requested for your account. Open this link to choose a new password:\n\n{link}\n\nIf you did not request this, you can ignore this email.\n"
                    ),
                    action_link: Some(primary_link("Reset Password", link)),
                }
            }
            EmailKind::Otp => {
                let code = required_str(context, "otp")?;
                if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(NotifyServiceError::Validation(
                        "invalid OTP format: expected 6-digit numeric".to_owned(),
                    ));
                }
                Self {
                    kind,
                    subject: "Your Login Code".to_owned(),
                    body: format!("Your one-time login code is {code}.\n"),
                    action_link: None,
                }
            }
            EmailKind::NewLogin => {
                let data = required_object(context)?;
                Self {
                    kind,
                    subject: "New Login to Your Account".to_owned(),
                    body: format!(
                        "We noticed a new sign-in to your account.\n\nDevice: {}\nIP address: {}\nTime: {}\n\nIf this wasn't you, reset your password right away.\n",
                        text(data, "device"),
                        text(data, "ip_address"),
                        text(data, "timestamp"),
                    ),
                    action_link: None,
                }
            }
            EmailKind::DepositDetected => {
                let data = required_object(context)?;
                let (amount, currency) = (text(data, "amount"), text(data, "currency"));
                Self {
                    kind,
                    subject: format!("Deposit of {amount} {currency} Confirmed"),
                    body: format!(
                        "Your deposit of {amount} {currency} has been credited.\nReference: {}\n",
                        text(data, "reference")
                    ),
                    action_link: None,
                }
            }
            EmailKind::WithdrawCompleted => {
                let data = required_object(context)?;
                let (amount, currency) = (text(data, "amount"), text(data, "currency"));
                Self {
                    kind,
                    subject: format!("Withdrawal of {amount} {currency} Completed"),
                    body: format!(
                        "Your withdrawal of {amount} {currency} has been sent.\nTransaction ID: {}\n",
                        text(data, "txid")
                    ),
                    action_link: None,
                }
            }
        };
        Ok(notice)
    }
}

fn primary_link(label: &str, url: &str) -> ActionLink {
    ActionLink {
        label: label.to_owned(),
        url: url.to_owned(),
        style: Some("primary".to_owned()),
    }
}

fn required_str<'a>(context: &'a Map<String, Value>, key: &str) -> Result<&'a str, NotifyServiceError> {
    context
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| NotifyServiceError::Validation(format!("missing {key} in context")))
}

fn required_object(context: &Map<String, Value>) -> Result<&Map<String, Value>, NotifyServiceError> {
    context
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| NotifyServiceError::Validation("missing data in context".to_owned()))
}

fn text(data: &Map<String, Value>, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
