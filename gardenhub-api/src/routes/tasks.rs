/// Task endpoints
///
/// # Endpoints
///
/// - `POST /v1/gardens/:id/tasks` - Create a task or recurring template
/// - `GET /v1/gardens/:id/tasks?status=` - List a garden's tasks
/// - `GET /v1/tasks/:id` - Task with its assignees
/// - `POST /v1/tasks/:id/{accept,decline,complete,self-assign,cancel}`
/// - `POST /v1/tasks/:id/assign` - `{"user_id": "..."}`
///
/// Status rules live in the task service; illegal moves answer 409.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use gardenhub_shared::{
    auth::{authorization::require_garden_member, middleware::AuthContext},
    models::task::{CreateTask, Task, TaskStatus, TaskType},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[serde(default)]
    pub task_type: TaskType,

    /// Required when `task_type` is `custom`
    pub custom_type_id: Option<Uuid>,

    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_recurring: bool,

    /// `daily`, `weekly`, `monthly` or `yearly`
    pub recurrence_period: Option<String>,

    pub recurrence_end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub assignees: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub task: Task,
    pub assignees: Vec<Uuid>,
}

async fn with_assignees(state: &AppState, task: Task) -> ApiResult<TaskResponse> {
    let assignees = state.store().task_assignees(task.id).await?;
    Ok(TaskResponse { task, assignees })
}

pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    req.validate()?;

    let mut assignees = req.assignees;
    assignees.sort();
    assignees.dedup();

    let task = state
        .services
        .tasks
        .create(
            auth.user_id,
            CreateTask {
                garden_id,
                title: req.title.trim().to_string(),
                description: req.description,
                task_type: req.task_type,
                custom_type_id: req.custom_type_id,
                created_by: Some(auth.user_id),
                due_date: req.due_date,
                is_recurring: req.is_recurring,
                recurrence_period: req.recurrence_period.map(|p| p.trim().to_lowercase()),
                recurrence_end_date: req.recurrence_end_date,
                parent_task_id: None,
            },
            &assignees,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(with_assignees(&state, task).await?)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(garden_id): Path<Uuid>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<Vec<Task>>> {
    require_garden_member(state.store(), garden_id, auth.user_id).await?;
    Ok(Json(Task::list_by_garden(&state.db, garden_id, filter.status).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state
        .store()
        .get_task(task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    require_garden_member(state.store(), task.garden_id, auth.user_id).await?;
    Ok(Json(with_assignees(&state, task).await?))
}

pub async fn accept_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state.services.tasks.accept(auth.user_id, task_id).await?;
    Ok(Json(with_assignees(&state, task).await?))
}

pub async fn decline_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state.services.tasks.decline(auth.user_id, task_id).await?;
    Ok(Json(with_assignees(&state, task).await?))
}

pub async fn complete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state.services.tasks.complete(auth.user_id, task_id).await?;
    Ok(Json(with_assignees(&state, task).await?))
}

pub async fn assign_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
    Json(req): Json<AssignRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state
        .services
        .tasks
        .assign(auth.user_id, task_id, req.user_id)
        .await?;
    Ok(Json(with_assignees(&state, task).await?))
}

pub async fn self_assign_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state.services.tasks.self_assign(auth.user_id, task_id).await?;
    Ok(Json(with_assignees(&state, task).await?))
}

pub async fn cancel_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = state.services.tasks.cancel(auth.user_id, task_id).await?;
    Ok(Json(with_assignees(&state, task).await?))
}
