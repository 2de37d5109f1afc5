/// Forum endpoints
///
/// # Endpoints
///
/// - `POST|GET /v1/forum/posts` - Create / list active posts
/// - `GET|DELETE /v1/forum/posts/:id` - Read / remove (author or moderator)
/// - `POST /v1/forum/posts/:id/like` - Toggle like
/// - `POST|GET /v1/forum/posts/:id/comments`
/// - `POST /v1/forum/posts/:id/best-answer` - Post author picks a comment
/// - `DELETE /v1/forum/comments/:id` - Author or moderator
/// - `POST /v1/forum/comments/:id/like` - Toggle like

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
    auth::{authorization::require_ownership, middleware::AuthContext},
    media::{self, Image},
    models::forum::{Comment, ContentState, CreateComment, CreatePost, ForumPost},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 20000, message = "Content must be 1-20000 characters"))]
    pub content: String,

    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 10000, message = "Content must be 1-10000 characters"))]
    pub content: String,

    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BestAnswerRequest {
    pub comment_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: ForumPost,
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub like_count: Option<i64>,
}

impl From<ForumPost> for PostResponse {
    fn from(post: ForumPost) -> Self {
        let image = media::render(post.image.as_deref(), post.image_mime.as_deref());
        Self {
            post,
            image,
            like_count: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    #[serde(flatten)]
    pub comment: Comment,
    pub image: Option<String>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        let image = media::render(comment.image.as_deref(), comment.image_mime.as_deref());
        Self { comment, image }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    /// Whether the caller likes the item after the toggle
    pub liked: bool,
}

async fn active_post(state: &AppState, post_id: Uuid) -> ApiResult<ForumPost> {
    state
        .store()
        .get_post(post_id)
        .await?
        .filter(|p| p.state == ContentState::Active)
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))
}

pub async fn create_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreatePostRequest>,
) -> ApiResult<(StatusCode, Json<PostResponse>)> {
    req.validate()?;
    let image = media::decode_optional(req.image.as_deref())?.map(Image::into_parts);

    let post = state
        .services
        .community
        .create_post(CreatePost {
            author_id: auth.user_id,
            title: req.title,
            content: req.content,
            image,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(post.into())))
}

pub async fn list_posts(
    State(state): State<AppState>,
    _auth: AuthContext,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<PostResponse>>> {
    let posts = ForumPost::list_active(&state.db, page.limit(), page.offset()).await?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

pub async fn get_post(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<PostResponse>> {
    let post = active_post(&state, post_id).await?;
    let like_count = ForumPost::like_count(&state.db, post_id).await?;
    Ok(Json(PostResponse {
        like_count: Some(like_count),
        ..post.into()
    }))
}

pub async fn delete_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(post_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.community.remove_post(auth.user_id, post_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_post(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<LikeResponse>> {
    active_post(&state, post_id).await?;
    let liked = ForumPost::toggle_like(&state.db, post_id, auth.user_id).await?;
    Ok(Json(LikeResponse { liked }))
}

pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(post_id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<CommentResponse>)> {
    req.validate()?;
    let image = media::decode_optional(req.image.as_deref())?.map(Image::into_parts);

    let comment = state
        .services
        .community
        .create_comment(CreateComment {
            post_id,
            author_id: auth.user_id,
            content: req.content,
            image,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(comment.into())))
}

pub async fn list_comments(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    active_post(&state, post_id).await?;
    let comments = Comment::list_active_by_post(&state.db, post_id).await?;
    Ok(Json(comments.into_iter().map(CommentResponse::from).collect()))
}

/// Marks one of the post's active comments as the accepted answer
pub async fn set_best_answer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(post_id): Path<Uuid>,
    Json(req): Json<BestAnswerRequest>,
) -> ApiResult<Json<PostResponse>> {
    let post = active_post(&state, post_id).await?;
    require_ownership(auth.user_id, post.author_id)?;

    let comment = state
        .store()
        .get_comment(req.comment_id)
        .await?
        .filter(|c| c.post_id == post_id && c.state == ContentState::Active)
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    let post = ForumPost::set_best_answer(&state.db, post_id, comment.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    Ok(Json(post.into()))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(comment_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .services
        .community
        .remove_comment(auth.user_id, comment_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(comment_id): Path<Uuid>,
) -> ApiResult<Json<LikeResponse>> {
    state
        .store()
        .get_comment(comment_id)
        .await?
        .filter(|c| c.state == ContentState::Active)
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;
    let liked = Comment::toggle_like(&state.db, comment_id, auth.user_id).await?;
    Ok(Json(LikeResponse { liked }))
}
