/// Garden events and attendance votes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EventVisibility {
    /// Listed for everyone
    Public,

    /// Listed for accepted garden members only
    Private,
}

impl Default for EventVisibility {
    fn default() -> Self {
        EventVisibility::Public
    }
}

/// One vote per (event, user)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attendance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Going,
    NotGoing,
    Maybe,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GardenEvent {
    pub id: Uuid,
    pub garden_id: Uuid,
    pub created_by: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub visibility: EventVisibility,
    pub starts_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateGardenEvent {
    pub garden_id: Uuid,
    pub created_by: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub visibility: EventVisibility,
    pub starts_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventAttendance {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub status: AttendanceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const EVENT_COLUMNS: &str =
    "id, garden_id, created_by, title, description, visibility, starts_at, created_at, updated_at";

impl GardenEvent {
    pub async fn create(pool: &PgPool, data: CreateGardenEvent) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, GardenEvent>(&format!(
            "INSERT INTO garden_events (garden_id, created_by, title, description, visibility, starts_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {EVENT_COLUMNS}"
        ))
        .bind(data.garden_id)
        .bind(data.created_by)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.visibility)
        .bind(data.starts_at)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, GardenEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM garden_events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists a garden's events in start order; private ones only if asked
    pub async fn list_by_garden(
        pool: &PgPool,
        garden_id: Uuid,
        include_private: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, GardenEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM garden_events
             WHERE garden_id = $1 AND ($2 OR visibility = 'public')
             ORDER BY starts_at"
        ))
        .bind(garden_id)
        .bind(include_private)
        .fetch_all(pool)
        .await
    }
}

impl EventAttendance {
    /// Records or replaces a user's vote
    pub async fn upsert(
        pool: &PgPool,
        event_id: Uuid,
        user_id: Uuid,
        status: AttendanceStatus,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, EventAttendance>(
            "INSERT INTO event_attendances (event_id, user_id, status)
             VALUES ($1, $2, $3)
             ON CONFLICT (event_id, user_id) DO UPDATE
             SET status = EXCLUDED.status, updated_at = NOW()
             RETURNING event_id, user_id, status, created_at, updated_at",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(status)
        .fetch_one(pool)
        .await
    }

    pub async fn list_by_event(pool: &PgPool, event_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, EventAttendance>(
            "SELECT event_id, user_id, status, created_at, updated_at
             FROM event_attendances WHERE event_id = $1 ORDER BY created_at",
        )
        .bind(event_id)
        .fetch_all(pool)
        .await
    }
}
