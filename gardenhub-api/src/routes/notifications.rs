/// Notification inbox endpoints
///
/// - `GET /v1/notifications` - Newest first, paginated
/// - `GET /v1/notifications/unread-count`
/// - `POST /v1/notifications/:id/read`
/// - `POST /v1/notifications/read-all`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::Pagination,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use gardenhub_shared::{auth::middleware::AuthContext, models::notification::Notification};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Notification>>> {
    let notifications =
        Notification::list_for_recipient(&state.db, auth.user_id, page.limit(), page.offset())
            .await?;
    Ok(Json(notifications))
}

pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<UnreadCount>> {
    let unread = Notification::unread_count(&state.db, auth.user_id).await?;
    Ok(Json(UnreadCount { unread }))
}

/// Only the recipient can mark a notification; anyone else gets 404
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(notification_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if !Notification::mark_read(&state.db, notification_id, auth.user_id).await? {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<MarkAllReadResponse>> {
    let updated = Notification::mark_all_read(&state.db, auth.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}
