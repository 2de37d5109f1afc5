/// Report and moderation endpoints
///
/// Anyone can file a report; everything else requires the moderator or
/// admin role, checked against the profile on each call.
///
/// - `POST /v1/reports` - `{"target_kind", "target_id", "reason", "description"?}`
/// - `GET /v1/reports?pending=true`
/// - `POST /v1/reports/:id/review` - `{"is_valid": bool}`
/// - `POST /v1/moderation/users/:id/suspend` - `{"reason", "days"?}`
/// - `POST /v1/moderation/users/:id/unsuspend`
/// - `POST /v1/moderation/users/:id/ban` - `{"reason"}`
/// - `POST /v1/moderation/gardens/:id/hide` - `{"reason"}`
/// - `POST /v1/moderation/gardens/:id/unhide`
/// - `DELETE /v1/moderation/gardens/:id`

use crate::{
    app::AppState,
    error::ApiResult,
    routes::gardens::GardenResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use gardenhub_shared::{
    auth::{authorization::require_moderator, middleware::AuthContext},
    moderation::{FileReport, ReportTarget},
    models::{
        report::{Report, ReportReason, ReportTargetKind},
        user::Profile,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReportRequest {
    pub target_kind: ReportTargetKind,
    pub target_id: Uuid,
    pub reason: ReportReason,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
}

fn default_pending() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ReportFilter {
    #[serde(default = "default_pending")]
    pub pending: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub is_valid: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SuspendRequest {
    #[validate(length(min = 1, max = 1000, message = "Reason is required"))]
    pub reason: String,

    /// Defaults to 7
    #[validate(range(min = 1, max = 3650, message = "Days must be between 1 and 3650"))]
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReasonRequest {
    #[validate(length(min = 1, max = 1000, message = "Reason is required"))]
    pub reason: String,
}

pub async fn create_report(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateReportRequest>,
) -> ApiResult<(StatusCode, Json<Report>)> {
    req.validate()?;

    let report = state
        .services
        .moderation
        .create_report(
            auth.user_id,
            FileReport {
                target: ReportTarget::new(req.target_kind, req.target_id),
                reason: req.reason,
                description: req.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list_reports(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(filter): Query<ReportFilter>,
) -> ApiResult<Json<Vec<Report>>> {
    require_moderator(state.store(), auth.user_id).await?;
    Ok(Json(Report::list(&state.db, filter.pending).await?))
}

pub async fn review_report(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(report_id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<Report>> {
    let report = state
        .services
        .moderation
        .review(auth.user_id, report_id, req.is_valid)
        .await?;
    Ok(Json(report))
}

pub async fn suspend_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SuspendRequest>,
) -> ApiResult<Json<Profile>> {
    req.validate()?;
    let profile = state
        .services
        .moderation
        .suspend_user(auth.user_id, user_id, req.reason.trim(), req.days)
        .await?;
    Ok(Json(profile))
}

pub async fn unsuspend_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<Profile>> {
    let profile = state
        .services
        .moderation
        .unsuspend_user(auth.user_id, user_id)
        .await?;
    Ok(Json(profile))
}

pub async fn ban_user(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
    Json(req): Json<ReasonRequest>,
) -> ApiResult<Json<Profile>> {
    req.validate()?;
    let profile = state
        .services
        .moderation
        .ban_user(auth.user_id, user_id, req.reason.trim())
        .await?;
    Ok(Json(profile))
}

pub async fn hide_garden(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
    Json(req): Json<ReasonRequest>,
) -> ApiResult<Json<GardenResponse>> {
    req.validate()?;
    let garden = state
        .services
        .moderation
        .hide_garden(auth.user_id, garden_id, req.reason.trim())
        .await?;
    Ok(Json(garden.into()))
}

pub async fn unhide_garden(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
) -> ApiResult<Json<GardenResponse>> {
    let garden = state
        .services
        .moderation
        .unhide_garden(auth.user_id, garden_id)
        .await?;
    Ok(Json(garden.into()))
}

pub async fn delete_garden(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .services
        .moderation
        .delete_garden(auth.user_id, garden_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
