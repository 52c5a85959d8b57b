//! Service-to-service endpoints under `/svc`, authenticated by a shared token.

use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use tidings_core::error::AppError;

use crate::domain::types::TriggerOutcome;
use crate::error::NotifyServiceError;
use crate::handlers::response::{CountResponse, NotificationResponse};
use crate::state::AppState;
use crate::usecase::directory_sync::{SyncDirectoryUseCase, SyncMode};
use crate::usecase::email::{SendEmailInput, SendEmailNoticeUseCase};
use crate::usecase::feed::{ReportFailureInput, ReportFailureUseCase};
use crate::usecase::trigger::{TriggerInput, TriggerSystemEventUseCase};

pub const SERVICE_TOKEN_HEADER: &str = "x-service-token";

/// Marker extractor: the request carried the configured service token.
#[derive(Debug, Clone, Copy)]
pub struct ServiceCaller;

impl FromRequestParts<AppState> for ServiceCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(SERVICE_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if presented.is_empty() {
            tracing::warn!(path = %parts.uri.path(), "service call without token");
            return Err(AppError::Unauthorized("missing service token"));
        }
        if presented != state.service_token {
            tracing::warn!(path = %parts.uri.path(), "service call with wrong token");
            return Err(AppError::Unauthorized("invalid service token"));
        }
        Ok(ServiceCaller)
    }
}

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TriggerRequest {
    pub event_key: String,
    pub user_id: Uuid,
    #[serde(default)]
    pub variables: Map<String, Value>,
    pub dedup_key: Option<String>,
}

#[derive(Deserialize)]
pub struct EmailRequest {
    pub user_id: Uuid,
    pub email: String,
    pub email_type: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct FailureRequest {
    pub user_id: Uuid,
    pub notification_id: Uuid,
    pub error_message: String,
    pub device_id: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct SyncUsersRequest {
    pub since: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct SyncUsersResponse {
    pub fetched: usize,
    pub written: u64,
}

// ── POST /svc/notifications/trigger ──────────────────────────────────────────

pub async fn trigger(
    _caller: ServiceCaller,
    State(state): State<AppState>,
    Json(body): Json<TriggerRequest>,
) -> Result<Response, NotifyServiceError> {
    let usecase = TriggerSystemEventUseCase {
        system_templates: state.system_template_repo(),
        notifications: state.notification_repo(),
        dedup: state.dedup_index(),
        broadcaster: state.broadcaster.clone(),
    };
    let outcome = usecase
        .execute(TriggerInput {
            event_key: body.event_key,
            user_id: body.user_id,
            variables: body.variables,
            dedup_key: body.dedup_key,
        })
        .await?;

    Ok(trigger_response(outcome))
}

/// `201` with the created notification, `202` when a recent event with the
/// same dedup key suppressed it, `204` when no enabled template matches.
fn trigger_response(outcome: TriggerOutcome) -> Response {
    match outcome {
        TriggerOutcome::Delivered(template) => (
            StatusCode::CREATED,
            Json(NotificationResponse::from(template)),
        )
            .into_response(),
        TriggerOutcome::Deduped => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "deduped" })),
        )
            .into_response(),
        TriggerOutcome::NotFound => StatusCode::NO_CONTENT.into_response(),
    }
}

// ── POST /svc/notifications/email ────────────────────────────────────────────

pub async fn send_email(
    _caller: ServiceCaller,
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<StatusCode, NotifyServiceError> {
    let usecase = SendEmailNoticeUseCase {
        mailer: state.mailer.clone(),
        notifications: state.notification_repo(),
        broadcaster: state.broadcaster.clone(),
        timeout: state.side_effect_timeout,
    };
    // The handle is dropped; the send finishes in the background.
    usecase.execute(SendEmailInput {
        user_id: body.user_id,
        email: body.email,
        email_type: body.email_type,
        context: body.context,
    })?;
    Ok(StatusCode::ACCEPTED)
}

// ── POST /svc/notifications/failures ─────────────────────────────────────────

pub async fn report_failure(
    _caller: ServiceCaller,
    State(state): State<AppState>,
    Json(body): Json<FailureRequest>,
) -> Result<Json<CountResponse>, NotifyServiceError> {
    let usecase = ReportFailureUseCase {
        repo: state.recipient_repo(),
    };
    let updated = usecase
        .execute(ReportFailureInput {
            user_id: body.user_id,
            notification_id: body.notification_id,
            error_message: body.error_message,
            device_id: body.device_id,
        })
        .await?;
    Ok(Json(CountResponse { updated }))
}

// ── POST /svc/users/sync ─────────────────────────────────────────────────────

pub async fn sync_users(
    _caller: ServiceCaller,
    State(state): State<AppState>,
    Json(body): Json<SyncUsersRequest>,
) -> Result<Json<SyncUsersResponse>, NotifyServiceError> {
    let Some(source) = state.profiles.clone() else {
        return Err(NotifyServiceError::Validation(
            "directory sync is not configured".to_owned(),
        ));
    };
    let usecase = SyncDirectoryUseCase {
        source,
        directory: state.user_directory(),
        state: state.sync_state_repo(),
    };
    let mode = body.since.map_or(SyncMode::Full, SyncMode::Since);
    let report = usecase.execute(mode).await?;
    Ok(Json(SyncUsersResponse {
        fetched: report.fetched,
        written: report.written,
    }))
}
