/// In-app notifications
///
/// Rows are written by the notification dispatcher and read back by the
/// recipient, newest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Notification category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Task,
    Membership,
    Forum,
    Follow,
    Badge,
    Event,
    Weather,
    Moderation,
    System,
}

impl NotificationCategory {
    /// Converts category to its wire form (also used in push payloads)
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Task => "task",
            NotificationCategory::Membership => "membership",
            NotificationCategory::Forum => "forum",
            NotificationCategory::Follow => "follow",
            NotificationCategory::Badge => "badge",
            NotificationCategory::Event => "event",
            NotificationCategory::Weather => "weather",
            NotificationCategory::Moderation => "moderation",
            NotificationCategory::System => "system",
        }
    }
}

/// Persisted notification
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,

    /// Optional in-app deep link
    pub link: Option<String>,

    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a notification
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub recipient_id: Uuid,
    pub title: String,
    pub message: String,
    pub category: NotificationCategory,
    pub link: Option<String>,
}

const NOTIFICATION_COLUMNS: &str =
    "id, recipient_id, title, message, category, link, read, created_at";

impl Notification {
    /// Inserts a notification
    pub async fn create(pool: &PgPool, data: CreateNotification) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "INSERT INTO notifications (recipient_id, title, message, category, link)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(data.recipient_id)
        .bind(&data.title)
        .bind(&data.message)
        .bind(data.category)
        .bind(&data.link)
        .fetch_one(pool)
        .await
    }

    /// Lists a recipient's notifications, newest first
    pub async fn list_for_recipient(
        pool: &PgPool,
        recipient_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Notification>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications
             WHERE recipient_id = $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(recipient_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Number of unread notifications
    pub async fn unread_count(pool: &PgPool, recipient_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT read",
        )
        .bind(recipient_id)
        .fetch_one(pool)
        .await
    }

    /// Marks one notification read; scoped to its recipient
    pub async fn mark_read(pool: &PgPool, id: Uuid, recipient_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE id = $1 AND recipient_id = $2",
        )
        .bind(id)
        .bind(recipient_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Marks all of a recipient's notifications read
    pub async fn mark_all_read(pool: &PgPool, recipient_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE recipient_id = $1 AND NOT read",
        )
        .bind(recipient_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
