/// Garden, membership and custom task type endpoints
///
/// # Endpoints
///
/// - `POST /v1/gardens` - Create a garden (caller becomes its manager)
/// - `GET /v1/gardens` - List public, non-hidden gardens
/// - `GET|PATCH|DELETE /v1/gardens/:id`
/// - `POST /v1/gardens/:id/join` - Request membership
/// - `GET /v1/gardens/:id/memberships` - Members only
/// - `POST|GET /v1/gardens/:id/task-types` - Managers create, members list
/// - `POST /v1/memberships/:id/accept|reject` - Managers only
/// - `DELETE /v1/memberships/:id` - Leave, or removal by a manager
///
/// Images are accepted and returned as base64 data URLs.

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
use gardenhub_shared::{
    auth::{
        authorization::{require_garden_manager, require_garden_member, require_moderator},
        middleware::AuthContext,
    },
    gardens::Reconciliation,
    media::{self, Image},
    models::{
        garden::{CreateGarden, CustomTaskType, Garden, UpdateGarden},
        membership::{Membership, MembershipStatus},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGardenRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
    pub location: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be within -90..90"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be within -180..180"))]
    pub longitude: Option<f64>,

    #[serde(default = "default_true")]
    pub is_public: bool,

    /// `data:image/...;base64,...`
    pub cover_image: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGardenRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 200, message = "Location must be at most 200 characters"))]
    pub location: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be within -90..90"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be within -180..180"))]
    pub longitude: Option<f64>,

    pub is_public: Option<bool>,

    pub cover_image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GardenResponse {
    #[serde(flatten)]
    pub garden: Garden,

    /// Data URL, absent when the garden has no cover
    pub cover_image: Option<String>,
}

impl From<Garden> for GardenResponse {
    fn from(garden: Garden) -> Self {
        let cover_image = media::render(
            garden.cover_image.as_deref(),
            garden.cover_image_mime.as_deref(),
        );
        Self { garden, cover_image }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskTypeRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

/// Result of removing a membership
#[derive(Debug, Serialize, Deserialize)]
pub struct RemovalResponse {
    /// `unchanged`, `promoted` or `garden_deleted`
    pub outcome: String,

    /// The member promoted to manager, if any
    pub promoted_user_id: Option<Uuid>,
}

impl From<Reconciliation> for RemovalResponse {
    fn from(outcome: Reconciliation) -> Self {
        match outcome {
            Reconciliation::Unchanged => Self {
                outcome: "unchanged".to_string(),
                promoted_user_id: None,
            },
            Reconciliation::Promoted(user_id) => Self {
                outcome: "promoted".to_string(),
                promoted_user_id: Some(user_id),
            },
            Reconciliation::GardenDeleted => Self {
                outcome: "garden_deleted".to_string(),
                promoted_user_id: None,
            },
        }
    }
}

/// Loads a garden the caller may see
///
/// Hidden and private gardens are visible to their accepted members and to
/// moderators; everyone else gets 404.
async fn visible_garden(state: &AppState, garden_id: Uuid, user_id: Uuid) -> ApiResult<Garden> {
    let not_found = || ApiError::NotFound("Garden not found".to_string());
    let garden = state.store().get_garden(garden_id).await?.ok_or_else(not_found)?;

    if garden.is_public && !garden.is_hidden {
        return Ok(garden);
    }
    if require_garden_member(state.store(), garden_id, user_id).await.is_ok()
        || require_moderator(state.store(), user_id).await.is_ok()
    {
        return Ok(garden);
    }
    Err(not_found())
}

fn decode_image(data_url: Option<&str>) -> ApiResult<Option<(Vec<u8>, String)>> {
    Ok(media::decode_optional(data_url)?.map(Image::into_parts))
}

pub async fn create_garden(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateGardenRequest>,
) -> ApiResult<(StatusCode, Json<GardenResponse>)> {
    req.validate()?;
    let cover_image = decode_image(req.cover_image.as_deref())?;

    let garden = state
        .services
        .memberships
        .create_garden(
            auth.user_id,
            CreateGarden {
                name: req.name.trim().to_string(),
                description: req.description,
                location: req.location,
                latitude: req.latitude,
                longitude: req.longitude,
                is_public: req.is_public,
                cover_image,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(garden.into())))
}

pub async fn list_gardens(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<GardenResponse>>> {
    let gardens = Garden::list_visible(&state.db, page.limit(), page.offset()).await?;
    Ok(Json(gardens.into_iter().map(GardenResponse::from).collect()))
}

pub async fn get_garden(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
) -> ApiResult<Json<GardenResponse>> {
    let garden = visible_garden(&state, garden_id, auth.user_id).await?;
    Ok(Json(garden.into()))
}

pub async fn update_garden(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
    Json(req): Json<UpdateGardenRequest>,
) -> ApiResult<Json<GardenResponse>> {
    req.validate()?;
    require_garden_manager(state.store(), garden_id, auth.user_id).await?;
    let cover_image = decode_image(req.cover_image.as_deref())?;

    let garden = Garden::update(
        &state.db,
        garden_id,
        UpdateGarden {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
            location: req.location,
            latitude: req.latitude,
            longitude: req.longitude,
            is_public: req.is_public,
            cover_image,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Garden not found".to_string()))?;

    Ok(Json(garden.into()))
}

pub async fn delete_garden(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_garden_manager(state.store(), garden_id, auth.user_id).await?;
    if !state.store().delete_garden(garden_id).await? {
        return Err(ApiError::NotFound("Garden not found".to_string()));
    }
    tracing::info!(%garden_id, user_id = %auth.user_id, "Garden deleted by manager");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join_garden(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
) -> ApiResult<(StatusCode, Json<Membership>)> {
    let membership = state
        .services
        .memberships
        .request_join(auth.user_id, garden_id)
        .await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// Members see the accepted roster plus pending requests; managers need the
/// latter to act on them
pub async fn list_memberships(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Membership>>> {
    require_garden_member(state.store(), garden_id, auth.user_id).await?;
    let memberships = state
        .store()
        .garden_memberships(garden_id)
        .await?
        .into_iter()
        .filter(|m| m.status != MembershipStatus::Rejected)
        .collect();
    Ok(Json(memberships))
}

pub async fn accept_membership(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(membership_id): Path<Uuid>,
) -> ApiResult<Json<Membership>> {
    let membership = state
        .services
        .memberships
        .accept(auth.user_id, membership_id)
        .await?;
    Ok(Json(membership))
}

pub async fn reject_membership(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(membership_id): Path<Uuid>,
) -> ApiResult<Json<Membership>> {
    let membership = state
        .services
        .memberships
        .reject(auth.user_id, membership_id)
        .await?;
    Ok(Json(membership))
}

pub async fn remove_membership(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(membership_id): Path<Uuid>,
) -> ApiResult<Json<RemovalResponse>> {
    let outcome = state
        .services
        .memberships
        .remove_member(auth.user_id, membership_id)
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn create_task_type(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
    Json(req): Json<CreateTaskTypeRequest>,
) -> ApiResult<(StatusCode, Json<CustomTaskType>)> {
    req.validate()?;
    require_garden_manager(state.store(), garden_id, auth.user_id).await?;

    let task_type = CustomTaskType::create(
        &state.db,
        garden_id,
        req.name.trim(),
        req.description.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(task_type)))
}

pub async fn list_task_types(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CustomTaskType>>> {
    require_garden_member(state.store(), garden_id, auth.user_id).await?;
    Ok(Json(CustomTaskType::list_by_garden(&state.db, garden_id).await?))
}
