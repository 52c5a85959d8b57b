use axum::{
    Json,
    extract::{Path, RawQuery, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use tidings_auth_types::identity::IdentityHeaders;
use tidings_domain::pagination::PageRequest;

use crate::broadcaster::PublishReport;
use crate::domain::types::{
    ActionLink, AdminStatusFilter, HistoryFilter, Metadata, NotificationKind, SystemTemplatePatch,
    TemplateContent, TemplateFilter,
};
use crate::error::NotifyServiceError;
use crate::handlers::response::{
    DirectoryUserResponse, NotificationResponse, ReceiptResponse, SystemTemplateResponse,
};
use crate::state::AppState;
use crate::usecase::admin::{
    BroadcastUseCase, HistoryUseCase, ListDirectoryUsersUseCase, ListDraftsUseCase,
    ListTemplatesUseCase, ReceiptsUseCase,
};
use crate::usecase::lifecycle::{
    ConvertToDraftUseCase, CreateDraftInput, CreateDraftUseCase, DeleteTemplateUseCase,
    PublishUseCase, ScheduleUseCase, UnscheduleUseCase, UpdateDraftUseCase,
};
use crate::usecase::system_template::{ListSystemTemplatesUseCase, UpdateSystemTemplateUseCase};

fn require_admin(identity: &IdentityHeaders) -> Result<(), NotifyServiceError> {
    if identity.is_admin() {
        Ok(())
    } else {
        Err(NotifyServiceError::Forbidden)
    }
}

fn parse_query<T: DeserializeOwned + Default>(raw: Option<String>) -> Result<T, NotifyServiceError> {
    raw.as_deref()
        .map(serde_qs::from_str)
        .transpose()
        .map_err(|e| NotifyServiceError::Validation(format!("invalid query: {e}")))
        .map(Option::unwrap_or_default)
}

fn parse_kind(kind: Option<&str>) -> Result<NotificationKind, NotifyServiceError> {
    match kind {
        None => Ok(NotificationKind::default()),
        Some(s) => NotificationKind::parse(s)
            .ok_or_else(|| NotifyServiceError::Validation(format!("invalid kind: {s}"))),
    }
}

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct TemplateRequest {
    pub creator_id: Option<Uuid>,
    pub kind: Option<String>,
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub content_image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub content_link: Option<String>,
    #[serde(default)]
    pub action_links: Vec<ActionLink>,
    #[serde(default)]
    pub metadata: Value,
}

impl TemplateRequest {
    fn into_content(self) -> Result<TemplateContent, NotifyServiceError> {
        Ok(TemplateContent {
            kind: parse_kind(self.kind.as_deref())?,
            heading: self.heading,
            title: self.title,
            message: self.message,
            content_image_url: self.content_image_url,
            thumbnail_url: self.thumbnail_url,
            media_urls: self.media_urls,
            content_link: self.content_link,
            action_links: self.action_links,
            metadata: Metadata::from_json(self.metadata),
        })
    }
}

#[derive(Deserialize)]
pub struct TargetsRequest {
    #[serde(default)]
    pub target_user_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct ScheduleRequest {
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub target_user_ids: Vec<Uuid>,
}

#[derive(Deserialize)]
pub struct SystemTemplatePatchRequest {
    pub heading: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub kind: Option<String>,
    pub icon: Option<String>,
    pub enabled: Option<bool>,
}

#[derive(Deserialize)]
pub struct BroadcastRequest {
    pub event_type: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct TemplateListQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    pub status: Option<String>,
    pub creator_id: Option<Uuid>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct HistoryQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    pub creator_id: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct PageQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

#[derive(Serialize)]
pub struct PublishResponse {
    pub notification: NotificationResponse,
    pub recipients: usize,
    pub live: PublishReport,
}

// ── GET /admin/notifications ─────────────────────────────────────────────────

pub async fn list_templates(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<NotificationResponse>>, NotifyServiceError> {
    require_admin(&identity)?;
    let query: TemplateListQuery = parse_query(raw_query)?;
    let status = query
        .status
        .as_deref()
        .map(|s| {
            AdminStatusFilter::parse(s)
                .ok_or_else(|| NotifyServiceError::Validation(format!("invalid status: {s}")))
        })
        .transpose()?;

    let usecase = ListTemplatesUseCase {
        repo: state.notification_repo(),
    };
    let templates = usecase
        .execute(
            TemplateFilter {
                status,
                creator_id: query.creator_id,
            },
            PageRequest::new(query.per_page, query.page),
        )
        .await?;
    Ok(Json(templates.into_iter().map(NotificationResponse::from).collect()))
}

// ── POST /admin/notifications ────────────────────────────────────────────────

pub async fn create_draft(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Json(body): Json<TemplateRequest>,
) -> Result<(StatusCode, Json<NotificationResponse>), NotifyServiceError> {
    require_admin(&identity)?;
    let creator_id = body.creator_id;
    let content = body.into_content()?;
    let usecase = CreateDraftUseCase {
        repo: state.notification_repo(),
    };
    let template = usecase
        .execute(identity.user_id, CreateDraftInput { creator_id, content })
        .await?;
    Ok((StatusCode::CREATED, Json(template.into())))
}

// ── GET /admin/notifications/drafts ──────────────────────────────────────────

pub async fn list_drafts(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<NotificationResponse>>, NotifyServiceError> {
    require_admin(&identity)?;
    let query: TemplateListQuery = parse_query(raw_query)?;
    let usecase = ListDraftsUseCase {
        repo: state.notification_repo(),
    };
    let drafts = usecase
        .execute(query.creator_id, PageRequest::new(query.per_page, query.page))
        .await?;
    Ok(Json(drafts.into_iter().map(NotificationResponse::from).collect()))
}

// ── GET /admin/notifications/history ─────────────────────────────────────────

pub async fn history(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<NotificationResponse>>, NotifyServiceError> {
    require_admin(&identity)?;
    let query: HistoryQuery = parse_query(raw_query)?;
    let usecase = HistoryUseCase {
        repo: state.notification_repo(),
    };
    let templates = usecase
        .execute(
            HistoryFilter {
                creator_id: query.creator_id,
                start: query.start,
                end: query.end,
            },
            PageRequest::new(query.per_page, query.page),
        )
        .await?;
    Ok(Json(templates.into_iter().map(NotificationResponse::from).collect()))
}

// ── PUT /admin/notifications/{id} ────────────────────────────────────────────

pub async fn update_draft(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TemplateRequest>,
) -> Result<Json<NotificationResponse>, NotifyServiceError> {
    require_admin(&identity)?;
    let content = body.into_content()?;
    let usecase = UpdateDraftUseCase {
        repo: state.notification_repo(),
    };
    let template = usecase.execute(id, content).await?;
    Ok(Json(template.into()))
}

// ── DELETE /admin/notifications/{id} ─────────────────────────────────────────

pub async fn delete_template(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, NotifyServiceError> {
    require_admin(&identity)?;
    let usecase = DeleteTemplateUseCase {
        repo: state.notification_repo(),
    };
    usecase.execute(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /admin/notifications/{id}/publish ───────────────────────────────────

pub async fn publish(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TargetsRequest>,
) -> Result<Json<PublishResponse>, NotifyServiceError> {
    require_admin(&identity)?;
    let usecase = PublishUseCase {
        repo: state.notification_repo(),
        directory: state.user_directory(),
        broadcaster: state.broadcaster.clone(),
    };
    let outcome = usecase.execute(id, &body.target_user_ids).await?;
    Ok(Json(PublishResponse {
        notification: outcome.template.into(),
        recipients: outcome.recipients,
        live: outcome.live,
    }))
}

// ── POST /admin/notifications/{id}/schedule ──────────────────────────────────

pub async fn schedule(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ScheduleRequest>,
) -> Result<Json<NotificationResponse>, NotifyServiceError> {
    require_admin(&identity)?;
    let usecase = ScheduleUseCase {
        repo: state.notification_repo(),
    };
    let template = usecase
        .execute(id, body.scheduled_at, &body.target_user_ids)
        .await?;
    Ok(Json(template.into()))
}

// ── POST /admin/notifications/{id}/unschedule ────────────────────────────────

pub async fn unschedule(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationResponse>, NotifyServiceError> {
    require_admin(&identity)?;
    let usecase = UnscheduleUseCase {
        repo: state.notification_repo(),
    };
    let template = usecase.execute(id).await?;
    Ok(Json(template.into()))
}

// ── POST /admin/notifications/{id}/convert-to-draft ──────────────────────────

pub async fn convert_to_draft(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, NotifyServiceError> {
    require_admin(&identity)?;
    let usecase = ConvertToDraftUseCase {
        repo: state.notification_repo(),
    };
    usecase.execute(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── GET /admin/notifications/{id}/receipts ───────────────────────────────────

pub async fn receipts(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReceiptResponse>>, NotifyServiceError> {
    require_admin(&identity)?;
    let usecase = ReceiptsUseCase {
        notifications: state.notification_repo(),
        recipients: state.recipient_repo(),
    };
    let receipts = usecase.execute(id).await?;
    Ok(Json(receipts.into_iter().map(ReceiptResponse::from).collect()))
}

// ── GET /admin/users ─────────────────────────────────────────────────────────

pub async fn list_users(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<Vec<DirectoryUserResponse>>, NotifyServiceError> {
    require_admin(&identity)?;
    let query: PageQuery = parse_query(raw_query)?;
    let usecase = ListDirectoryUsersUseCase {
        directory: state.user_directory(),
    };
    let users = usecase
        .execute(PageRequest::new(query.per_page, query.page))
        .await?;
    Ok(Json(users.into_iter().map(DirectoryUserResponse::from).collect()))
}

// ── GET /admin/system-templates ──────────────────────────────────────────────

pub async fn list_system_templates(
    identity: IdentityHeaders,
    State(state): State<AppState>,
) -> Result<Json<Vec<SystemTemplateResponse>>, NotifyServiceError> {
    require_admin(&identity)?;
    let usecase = ListSystemTemplatesUseCase {
        repo: state.system_template_repo(),
    };
    let templates = usecase.execute().await?;
    Ok(Json(templates.into_iter().map(SystemTemplateResponse::from).collect()))
}

// ── PATCH /admin/system-templates/{event_key} ────────────────────────────────

pub async fn update_system_template(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(event_key): Path<String>,
    Json(body): Json<SystemTemplatePatchRequest>,
) -> Result<StatusCode, NotifyServiceError> {
    require_admin(&identity)?;
    let kind = body
        .kind
        .as_deref()
        .map(|k| parse_kind(Some(k)))
        .transpose()?;
    let usecase = UpdateSystemTemplateUseCase {
        repo: state.system_template_repo(),
    };
    usecase
        .execute(
            &event_key,
            SystemTemplatePatch {
                heading: body.heading,
                title: body.title,
                message: body.message,
                kind,
                icon: body.icon,
                enabled: body.enabled,
            },
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /admin/broadcast ────────────────────────────────────────────────────

pub async fn broadcast(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Json(body): Json<BroadcastRequest>,
) -> Result<Json<PublishReport>, NotifyServiceError> {
    require_admin(&identity)?;
    let usecase = BroadcastUseCase {
        broadcaster: state.broadcaster.clone(),
    };
    let report = usecase.execute(&body.event_type, body.payload)?;
    Ok(Json(report))
}
