/// Garden event endpoints
///
/// - `POST /v1/gardens/:id/events` - Managers schedule an event
/// - `GET /v1/gardens/:id/events` - Public events; members also see private ones
/// - `POST /v1/events/:id/vote` - `{"status": "going" | "not_going" | "maybe"}`
/// - `GET /v1/events/:id/attendances`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use gardenhub_shared::{
    auth::{authorization::require_garden_member, middleware::AuthContext},
    models::event::{
        AttendanceStatus, CreateGardenEvent, EventAttendance, EventVisibility, GardenEvent,
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

fn default_visibility() -> EventVisibility {
    EventVisibility::Public
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[serde(default = "default_visibility")]
    pub visibility: EventVisibility,

    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub status: AttendanceStatus,
}

async fn is_member(state: &AppState, garden_id: Uuid, user_id: Uuid) -> bool {
    require_garden_member(state.store(), garden_id, user_id)
        .await
        .is_ok()
}

pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
    Json(req): Json<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<GardenEvent>)> {
    req.validate()?;

    let event = state
        .services
        .memberships
        .create_event(
            auth.user_id,
            CreateGardenEvent {
                garden_id,
                created_by: auth.user_id,
                title: req.title.trim().to_string(),
                description: req.description,
                visibility: req.visibility,
                starts_at: req.starts_at,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn list_events(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
) -> ApiResult<Json<Vec<GardenEvent>>> {
    let include_private = is_member(&state, garden_id, auth.user_id).await;
    Ok(Json(
        GardenEvent::list_by_garden(&state.db, garden_id, include_private).await?,
    ))
}

pub async fn vote(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
    Json(req): Json<VoteRequest>,
) -> ApiResult<Json<EventAttendance>> {
    let attendance = state
        .services
        .memberships
        .mark_attendance(auth.user_id, event_id, req.status)
        .await?;
    Ok(Json(attendance))
}

pub async fn list_attendances(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(event_id): Path<Uuid>,
) -> ApiResult<Json<Vec<EventAttendance>>> {
    let event = state
        .store()
        .get_event(event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))?;

    if event.visibility == EventVisibility::Private
        && !is_member(&state, event.garden_id, auth.user_id).await
    {
        return Err(ApiError::NotFound("Event not found".to_string()));
    }

    Ok(Json(EventAttendance::list_by_event(&state.db, event_id).await?))
}
