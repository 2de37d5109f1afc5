/// Profile and social graph endpoints
///
/// # Endpoints
///
/// - `GET /v1/profile/me` - Own account and profile
/// - `PATCH /v1/profile/me` - Update display name, bio, location, opt-in
/// - `GET /v1/profile/me/suspension` - Own suspension/ban status
/// - `GET /v1/users/:id` - Public profile with follow counts
/// - `POST|DELETE /v1/users/:id/follow`
/// - `POST|DELETE /v1/users/:id/block`
/// - `POST /v1/devices` - Register a push token

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
    auth::middleware::AuthContext,
    models::{
        social::{Block, Follow, PushDevice},
        user::{Profile, UpdateProfile, User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

const PLATFORMS: [&str; 3] = ["android", "ios", "web"];

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub profile: Profile,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub display_name: Option<String>,

    #[validate(length(max = 1000, message = "Bio must be at most 1000 characters"))]
    pub bio: Option<String>,

    #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
    pub location: Option<String>,

    pub receives_notifications: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuspensionStatus {
    pub is_suspended: bool,
    pub suspension_reason: Option<String>,
    pub suspended_until: Option<DateTime<Utc>>,
    pub is_banned: bool,
    pub ban_reason: Option<String>,
}

/// What other users see
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub following: i64,
    pub followers: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RelationResponse {
    /// False when the call was a no-op (already following, not blocked, ...)
    pub changed: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDeviceRequest {
    #[validate(length(min = 1, max = 4096, message = "Token is required"))]
    pub token: String,

    pub platform: String,
}

async fn load_me(state: &AppState, user_id: Uuid) -> ApiResult<(User, Profile)> {
    let user = state
        .store()
        .get_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let profile = state
        .store()
        .get_profile(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;
    Ok((user, profile))
}

pub async fn get_me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<MeResponse>> {
    let (user, profile) = load_me(&state, auth.user_id).await?;
    Ok(Json(MeResponse { user, profile }))
}

pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Profile>> {
    req.validate()?;

    let profile = Profile::update(
        &state.db,
        auth.user_id,
        UpdateProfile {
            display_name: req.display_name,
            bio: req.bio,
            location: req.location,
            receives_notifications: req.receives_notifications,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

pub async fn suspension_status(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<SuspensionStatus>> {
    let (_, profile) = load_me(&state, auth.user_id).await?;
    Ok(Json(SuspensionStatus {
        is_suspended: profile.is_suspended,
        suspension_reason: profile.suspension_reason,
        suspended_until: profile.suspended_until,
        is_banned: profile.is_banned,
        ban_reason: profile.ban_reason,
    }))
}

pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<PublicProfile>> {
    let (user, profile) = load_me(&state, user_id).await?;
    if !user.is_active {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    let (following, followers) = Follow::counts(&state.db, user_id).await?;

    Ok(Json(PublicProfile {
        id: user.id,
        display_name: user.display_name,
        role: profile.role,
        bio: profile.bio,
        location: profile.location,
        following,
        followers,
        created_at: user.created_at,
    }))
}

pub async fn follow(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<RelationResponse>> {
    let changed = state.services.community.follow(auth.user_id, user_id).await?;
    Ok(Json(RelationResponse { changed }))
}

pub async fn unfollow(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<RelationResponse>> {
    let changed = state.services.community.unfollow(auth.user_id, user_id).await?;
    Ok(Json(RelationResponse { changed }))
}

pub async fn block(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<RelationResponse>> {
    if user_id == auth.user_id {
        return Err(ApiError::invalid("user_id", "cannot block yourself"));
    }
    let changed = Block::create(&state.db, auth.user_id, user_id).await?;
    Ok(Json(RelationResponse { changed }))
}

pub async fn unblock(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<RelationResponse>> {
    let changed = Block::delete(&state.db, auth.user_id, user_id).await?;
    Ok(Json(RelationResponse { changed }))
}

pub async fn register_device(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<RegisterDeviceRequest>,
) -> ApiResult<(StatusCode, Json<PushDevice>)> {
    req.validate()?;
    let platform = req.platform.to_ascii_lowercase();
    if !PLATFORMS.contains(&platform.as_str()) {
        return Err(ApiError::invalid(
            "platform",
            format!("must be one of {}", PLATFORMS.join(", ")),
        ));
    }

    let device = PushDevice::register(&state.db, auth.user_id, req.token.trim(), &platform).await?;
    Ok((StatusCode::CREATED, Json(device)))
}
