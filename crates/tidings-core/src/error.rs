use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Rejections raised by shared extractors before a handler runs.
///
/// Service errors carry their own enums; this one covers caller
/// authentication and unexpected failures in plumbing code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The caller could not be authenticated. The reason is returned to the
    /// caller verbatim, so it must not echo secrets.
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        // TraceLayer records every status line; only 500s need the cause.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %format!("{e:#}"), kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
