use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{delete, get, patch, post, put},
};
use tower_http::trace::TraceLayer;

use tidings_core::health::{self, healthz};
use tidings_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    admin::{
        broadcast, convert_to_draft, create_draft, delete_template, history, list_drafts,
        list_system_templates, list_templates, list_users, publish, receipts, schedule,
        unschedule, update_draft, update_system_template,
    },
    feed::{
        acknowledge_delivery, clear_all, delete_for_user, get_feed, get_unread, has_unread,
        mark_all_read, mark_read,
    },
    service::{report_failure, send_email, sync_users, trigger},
    stream::stream_notifications,
};
use crate::state::AppState;

async fn readyz(State(state): State<AppState>) -> StatusCode {
    health::readyz(&state.db).await
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Feed
        .route("/users/@me/notifications", get(get_feed))
        .route("/users/@me/notifications/unread", get(get_unread))
        .route("/users/@me/notifications/has-unread", get(has_unread))
        .route("/users/@me/notifications/stream", get(stream_notifications))
        .route("/users/@me/notifications/read", post(mark_read))
        .route("/users/@me/notifications/read-all", post(mark_all_read))
        .route("/users/@me/notifications/delivered", post(acknowledge_delivery))
        .route("/users/@me/notifications/clear", post(clear_all))
        .route("/users/@me/notifications/{id}", delete(delete_for_user))
        // Admin: templates
        .route("/admin/notifications", get(list_templates))
        .route("/admin/notifications", post(create_draft))
        .route("/admin/notifications/drafts", get(list_drafts))
        .route("/admin/notifications/history", get(history))
        .route("/admin/notifications/{id}", put(update_draft))
        .route("/admin/notifications/{id}", delete(delete_template))
        .route("/admin/notifications/{id}/publish", post(publish))
        .route("/admin/notifications/{id}/schedule", post(schedule))
        .route("/admin/notifications/{id}/unschedule", post(unschedule))
        .route("/admin/notifications/{id}/convert-to-draft", post(convert_to_draft))
        .route("/admin/notifications/{id}/receipts", get(receipts))
        // Admin: directory, system templates, broadcast
        .route("/admin/users", get(list_users))
        .route("/admin/system-templates", get(list_system_templates))
        .route("/admin/system-templates/{event_key}", patch(update_system_template))
        .route("/admin/broadcast", post(broadcast))
        // Service-to-service
        .route("/svc/notifications/trigger", post(trigger))
        .route("/svc/notifications/email", post(send_email))
        .route("/svc/notifications/failures", post(report_failure))
        .route("/svc/users/sync", post(sync_users))
        .layer(TraceLayer::new_for_http())
        .layer(propagate_request_id_layer())
        .layer(request_id_layer())
        .with_state(state)
}
