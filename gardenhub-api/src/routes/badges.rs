/// Badge endpoints
///
/// - `GET /v1/badges` - Full catalogue
/// - `GET /v1/users/:id/badges` - Badges a user has earned

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use gardenhub_shared::{auth::middleware::AuthContext, models::badge::Badge};
use uuid::Uuid;

pub async fn list_badges(
    State(state): State<AppState>,
    _auth: AuthContext,
) -> ApiResult<Json<Vec<Badge>>> {
    Ok(Json(Badge::list(&state.db).await?))
}

pub async fn list_user_badges(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Badge>>> {
    Ok(Json(Badge::list_for_user(&state.db, user_id).await?))
}
