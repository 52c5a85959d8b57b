use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tidings_auth_types::identity::IdentityHeaders;
use tidings_domain::pagination::PageRequest;

use crate::error::NotifyServiceError;
use crate::handlers::response::{CountResponse, FeedItemResponse};
use crate::state::AppState;
use crate::usecase::feed::{
    AcknowledgeDeliveryUseCase, ClearAllUseCase, DeleteForUserUseCase, GetFeedUseCase,
    GetUnreadUseCase, HasUnreadUseCase, MarkAllReadUseCase, MarkReadUseCase,
};

// ── Query / body types ───────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct FeedQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    pub since: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
pub struct NotificationIdsRequest {
    pub notification_ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct HasUnreadResponse {
    pub has_unread: bool,
}

// ── GET /users/@me/notifications ─────────────────────────────────────────────

pub async fn get_feed(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<FeedItemResponse>>, NotifyServiceError> {
    let usecase = GetFeedUseCase {
        repo: state.recipient_repo(),
    };
    let page = PageRequest::new(query.per_page, query.page);
    let entries = usecase.execute(identity.user_id, page, query.since).await?;
    Ok(Json(entries.into_iter().map(FeedItemResponse::from).collect()))
}

// ── GET /users/@me/notifications/unread ──────────────────────────────────────

pub async fn get_unread(
    identity: IdentityHeaders,
    State(state): State<AppState>,
) -> Result<Json<Vec<FeedItemResponse>>, NotifyServiceError> {
    let usecase = GetUnreadUseCase {
        repo: state.recipient_repo(),
    };
    let entries = usecase.execute(identity.user_id).await?;
    Ok(Json(entries.into_iter().map(FeedItemResponse::from).collect()))
}

// ── GET /users/@me/notifications/has-unread ──────────────────────────────────

pub async fn has_unread(
    identity: IdentityHeaders,
    State(state): State<AppState>,
) -> Result<Json<HasUnreadResponse>, NotifyServiceError> {
    let usecase = HasUnreadUseCase {
        repo: state.recipient_repo(),
    };
    let has_unread = usecase.execute(identity.user_id).await?;
    Ok(Json(HasUnreadResponse { has_unread }))
}

// ── POST /users/@me/notifications/read ───────────────────────────────────────

pub async fn mark_read(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Json(body): Json<NotificationIdsRequest>,
) -> Result<Json<CountResponse>, NotifyServiceError> {
    let usecase = MarkReadUseCase {
        repo: state.recipient_repo(),
    };
    let updated = usecase
        .execute(identity.user_id, &body.notification_ids)
        .await?;
    Ok(Json(CountResponse { updated }))
}

// ── POST /users/@me/notifications/read-all ───────────────────────────────────

pub async fn mark_all_read(
    identity: IdentityHeaders,
    State(state): State<AppState>,
) -> Result<Json<CountResponse>, NotifyServiceError> {
    let usecase = MarkAllReadUseCase {
        repo: state.recipient_repo(),
    };
    let updated = usecase.execute(identity.user_id).await?;
    Ok(Json(CountResponse { updated }))
}

// ── POST /users/@me/notifications/delivered ──────────────────────────────────

pub async fn acknowledge_delivery(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Json(body): Json<NotificationIdsRequest>,
) -> Result<Json<CountResponse>, NotifyServiceError> {
    let usecase = AcknowledgeDeliveryUseCase {
        repo: state.recipient_repo(),
    };
    let updated = usecase
        .execute(identity.user_id, &body.notification_ids)
        .await?;
    Ok(Json(CountResponse { updated }))
}

// ── POST /users/@me/notifications/clear ──────────────────────────────────────

pub async fn clear_all(
    identity: IdentityHeaders,
    State(state): State<AppState>,
) -> Result<Json<CountResponse>, NotifyServiceError> {
    let usecase = ClearAllUseCase {
        repo: state.recipient_repo(),
    };
    let updated = usecase.execute(identity.user_id).await?;
    Ok(Json(CountResponse { updated }))
}

// ── DELETE /users/@me/notifications/{id} ─────────────────────────────────────

pub async fn delete_for_user(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
) -> Result<StatusCode, NotifyServiceError> {
    let usecase = DeleteForUserUseCase {
        repo: state.recipient_repo(),
    };
    usecase.execute(identity.user_id, notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
