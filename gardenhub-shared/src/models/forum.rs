/// Forum posts and comments
///
/// Both carry a [`ContentState`]; every listing and count filters on
/// `state = 'active'`, so moderation removal takes content out of view
/// without deleting rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Lifecycle state of user-authored content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "content_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentState {
    Active,
    Removed,
}

/// Forum post
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ForumPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub state: ContentState,
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
    pub image_mime: Option<String>,

    /// Comment chosen by the author as the answer
    pub best_answer_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a post
#[derive(Debug, Clone, Default)]
pub struct CreatePost {
    pub author_id: Uuid,
    pub title: String,
    pub content: String,
    pub image: Option<(Vec<u8>, String)>,
}

/// Forum comment
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub state: ContentState,
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
    pub image_mime: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Default)]
pub struct CreateComment {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub image: Option<(Vec<u8>, String)>,
}

const POST_COLUMNS: &str = "id, author_id, title, content, state, image, image_mime, \
     best_answer_id, created_at, updated_at";

const COMMENT_COLUMNS: &str =
    "id, post_id, author_id, content, state, image, image_mime, created_at, updated_at";

fn split_image(image: Option<(Vec<u8>, String)>) -> (Option<Vec<u8>>, Option<String>) {
    match image {
        Some((bytes, mime)) => (Some(bytes), Some(mime)),
        None => (None, None),
    }
}

impl ForumPost {
    /// Creates a post
    pub async fn create(pool: &PgPool, data: CreatePost) -> Result<Self, sqlx::Error> {
        let (image, mime) = split_image(data.image);
        sqlx::query_as::<_, ForumPost>(&format!(
            "INSERT INTO forum_posts (author_id, title, content, image, image_mime)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {POST_COLUMNS}"
        ))
        .bind(data.author_id)
        .bind(&data.title)
        .bind(&data.content)
        .bind(image)
        .bind(mime)
        .fetch_one(pool)
        .await
    }

    /// Finds a post by ID regardless of state
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ForumPost>(&format!(
            "SELECT {POST_COLUMNS} FROM forum_posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists active posts, newest first
    pub async fn list_active(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ForumPost>(&format!(
            "SELECT {POST_COLUMNS} FROM forum_posts
             WHERE state = 'active'
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Changes the content state of a post
    pub async fn set_state(
        pool: &PgPool,
        id: Uuid,
        state: ContentState,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE forum_posts SET state = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(state)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Marks one of the post's active comments as best answer
    ///
    /// Returns None if the comment does not belong to the post or is removed.
    pub async fn set_best_answer(
        pool: &PgPool,
        id: Uuid,
        comment_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, ForumPost>(&format!(
            "UPDATE forum_posts SET best_answer_id = $2, updated_at = NOW()
             WHERE id = $1 AND EXISTS (
                 SELECT 1 FROM comments c
                 WHERE c.id = $2 AND c.post_id = $1 AND c.state = 'active'
             )
             RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(comment_id)
        .fetch_optional(pool)
        .await
    }

    /// Toggles the caller's like; returns true if the post is now liked
    pub async fn toggle_like(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query("INSERT INTO post_likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(true)
    }

    /// Number of likes on a post
    pub async fn like_count(pool: &PgPool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Removes every post by a user; returns the number affected
    pub async fn remove_all_by_author(pool: &PgPool, author_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE forum_posts SET state = 'removed', updated_at = NOW()
             WHERE author_id = $1 AND state = 'active'",
        )
        .bind(author_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

impl Comment {
    /// Creates a comment
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        let (image, mime) = split_image(data.image);
        sqlx::query_as::<_, Comment>(&format!(
            "INSERT INTO comments (post_id, author_id, content, image, image_mime)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(data.post_id)
        .bind(data.author_id)
        .bind(&data.content)
        .bind(image)
        .bind(mime)
        .fetch_one(pool)
        .await
    }

    /// Finds a comment by ID regardless of state
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists the active comments of a post, oldest first
    pub async fn list_active_by_post(
        pool: &PgPool,
        post_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments
             WHERE post_id = $1 AND state = 'active'
             ORDER BY created_at"
        ))
        .bind(post_id)
        .fetch_all(pool)
        .await
    }

    /// Changes the content state of a comment
    pub async fn set_state(
        pool: &PgPool,
        id: Uuid,
        state: ContentState,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE comments SET state = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(state)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Toggles the caller's like; returns true if the comment is now liked
    pub async fn toggle_like(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let removed =
            sqlx::query("DELETE FROM comment_likes WHERE comment_id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(pool)
                .await?;
        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO comment_likes (comment_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(true)
    }

    /// Removes every comment by a user; returns the number affected
    pub async fn remove_all_by_author(pool: &PgPool, author_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE comments SET state = 'removed', updated_at = NOW()
             WHERE author_id = $1 AND state = 'active'",
        )
        .bind(author_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
