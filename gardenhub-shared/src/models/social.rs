/// Follow/block relations and push device registrations
///
/// Follows and blocks are asymmetric self-references on `users`. A push
/// device row stores one registration token; re-registering a known token
/// moves it to the caller and reactivates it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Follow relation (follower -> followed)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub follower_id: Uuid,
    pub followed_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    /// Inserts a follow; returns false if it already existed
    pub async fn create(
        pool: &PgPool,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO follows (follower_id, followed_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(followed_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Removes a follow; returns false if none existed
    pub async fn delete(
        pool: &PgPool,
        follower_id: Uuid,
        followed_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
            .bind(follower_id)
            .bind(followed_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Counts (following, followers) for a user
    pub async fn counts(pool: &PgPool, user_id: Uuid) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM follows WHERE follower_id = $1),
                (SELECT COUNT(*) FROM follows WHERE followed_id = $1)",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}

/// Block relation (blocker -> blocked)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Block {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Block {
    /// Inserts a block; returns false if it already existed
    pub async fn create(
        pool: &PgPool,
        blocker_id: Uuid,
        blocked_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO blocks (blocker_id, blocked_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Removes a block; returns false if none existed
    pub async fn delete(
        pool: &PgPool,
        blocker_id: Uuid,
        blocked_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM blocks WHERE blocker_id = $1 AND blocked_id = $2")
            .bind(blocker_id)
            .bind(blocked_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Push device registration
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PushDevice {
    pub id: Uuid,
    pub user_id: Uuid,

    /// Registration token handed out by the push provider
    pub token: String,

    /// Client platform label ("android", "ios", "web", ...)
    pub platform: String,

    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PushDevice {
    /// Registers a token for a user, reactivating it if already known
    pub async fn register(
        pool: &PgPool,
        user_id: Uuid,
        token: &str,
        platform: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, PushDevice>(
            "INSERT INTO push_devices (user_id, token, platform)
             VALUES ($1, $2, $3)
             ON CONFLICT (token) DO UPDATE
             SET user_id = EXCLUDED.user_id,
                 platform = EXCLUDED.platform,
                 active = TRUE,
                 updated_at = NOW()
             RETURNING id, user_id, token, platform, active, created_at, updated_at",
        )
        .bind(user_id)
        .bind(token)
        .bind(platform)
        .fetch_one(pool)
        .await
    }

    /// Lists the active tokens of a user
    pub async fn active_tokens(pool: &PgPool, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT token FROM push_devices WHERE user_id = $1 AND active ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}
