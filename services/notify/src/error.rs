use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Notify service domain error variants.
#[derive(Debug, thiserror::Error)]
pub enum NotifyServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("notification is not editable")]
    NotEditable,
    #[error("notification not found")]
    NotificationNotFound,
    #[error("system template not found")]
    SystemTemplateNotFound,
    #[error("missing required variable: {0}")]
    MissingVariable(String),
    #[error("forbidden")]
    Forbidden,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("storage error")]
    Storage(#[from] anyhow::Error),
}

impl NotifyServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::NotEditable => "NOT_EDITABLE",
            Self::NotificationNotFound => "NOTIFICATION_NOT_FOUND",
            Self::SystemTemplateNotFound => "SYSTEM_TEMPLATE_NOT_FOUND",
            Self::MissingVariable(_) => "MISSING_VARIABLE",
            Self::Forbidden => "FORBIDDEN",
            Self::Transport(_) => "TRANSPORT",
            Self::Storage(_) => "STORAGE",
        }
    }
}

impl IntoResponse for NotifyServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) | Self::MissingVariable(_) => StatusCode::BAD_REQUEST,
            Self::NotEditable => StatusCode::CONFLICT,
            Self::NotificationNotFound | Self::SystemTemplateNotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if let Self::Storage(ref e) = self {
            tracing::error!(error = %format!("{e:#}"), kind = "STORAGE", "storage error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
