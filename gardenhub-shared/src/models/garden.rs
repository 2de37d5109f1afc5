/// Garden and custom task type models
///
/// A garden owns its memberships, tasks, custom task types and events
/// (all `ON DELETE CASCADE`). `is_public` is the owner-controlled visibility
/// flag; `is_hidden` is set by moderators and excludes the garden from
/// listings.
///
/// # Example
///
/// ```no_run
/// use gardenhub_shared::models::garden::{Garden, CreateGarden};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let garden = Garden::create(&pool, CreateGarden {
///     name: "Oosterpark Allotment".to_string(),
///     location: Some("Amsterdam".to_string()),
///     ..Default::default()
/// }).await?;
///
/// let visible = Garden::list_visible(&pool, 50, 0).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Garden
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Garden {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Visible to non-members
    pub is_public: bool,

    /// Hidden by a moderator
    pub is_hidden: bool,
    pub hidden_reason: Option<String>,

    /// Raw cover image bytes; rendered as a data URL by the API
    #[serde(skip)]
    pub cover_image: Option<Vec<u8>>,
    pub cover_image_mime: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a garden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGarden {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_public: bool,
    #[serde(skip)]
    pub cover_image: Option<(Vec<u8>, String)>,
}

impl Default for CreateGarden {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            location: None,
            latitude: None,
            longitude: None,
            is_public: true,
            cover_image: None,
        }
    }
}

/// Input for updating a garden
///
/// Only non-None fields are updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateGarden {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_public: Option<bool>,
    #[serde(skip)]
    pub cover_image: Option<(Vec<u8>, String)>,
}

const GARDEN_COLUMNS: &str = "id, name, description, location, latitude, longitude, is_public, \
     is_hidden, hidden_reason, cover_image, cover_image_mime, created_at, updated_at";

impl Garden {
    /// Creates a garden
    ///
    /// Callers normally go through `MembershipService::create_garden`, which
    /// also inserts the founding manager membership.
    pub async fn create(pool: &PgPool, data: CreateGarden) -> Result<Self, sqlx::Error> {
        let (image, mime) = match data.cover_image {
            Some((bytes, mime)) => (Some(bytes), Some(mime)),
            None => (None, None),
        };

        sqlx::query_as::<_, Garden>(&format!(
            "INSERT INTO gardens
                (name, description, location, latitude, longitude, is_public, cover_image, cover_image_mime)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {GARDEN_COLUMNS}"
        ))
        .bind(&data.name)
        .bind(&data.description)
        .bind(&data.location)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.is_public)
        .bind(image)
        .bind(mime)
        .fetch_one(pool)
        .await
    }

    /// Finds a garden by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Garden>(&format!("SELECT {GARDEN_COLUMNS} FROM gardens WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists public, non-hidden gardens, newest first
    pub async fn list_visible(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Garden>(&format!(
            "SELECT {GARDEN_COLUMNS} FROM gardens
             WHERE is_public AND NOT is_hidden
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Updates a garden
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateGarden,
    ) -> Result<Option<Self>, sqlx::Error> {
        let (image, mime) = match data.cover_image {
            Some((bytes, mime)) => (Some(bytes), Some(mime)),
            None => (None, None),
        };

        sqlx::query_as::<_, Garden>(&format!(
            "UPDATE gardens
             SET name = COALESCE($2, name),
                 description = COALESCE($3, description),
                 location = COALESCE($4, location),
                 latitude = COALESCE($5, latitude),
                 longitude = COALESCE($6, longitude),
                 is_public = COALESCE($7, is_public),
                 cover_image = COALESCE($8, cover_image),
                 cover_image_mime = COALESCE($9, cover_image_mime),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {GARDEN_COLUMNS}"
        ))
        .bind(id)
        .bind(data.name)
        .bind(data.description)
        .bind(data.location)
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.is_public)
        .bind(image)
        .bind(mime)
        .fetch_optional(pool)
        .await
    }

    /// Sets or clears the moderation hidden flag
    pub async fn set_hidden(
        pool: &PgPool,
        id: Uuid,
        hidden: bool,
        reason: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Garden>(&format!(
            "UPDATE gardens
             SET is_hidden = $2, hidden_reason = $3, updated_at = NOW()
             WHERE id = $1
             RETURNING {GARDEN_COLUMNS}"
        ))
        .bind(id)
        .bind(hidden)
        .bind(reason)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a garden and everything it owns
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM gardens WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Garden-scoped task type defined by a manager
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomTaskType {
    pub id: Uuid,
    pub garden_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CustomTaskType {
    /// Creates a custom task type; names are unique per garden
    pub async fn create(
        pool: &PgPool,
        garden_id: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, CustomTaskType>(
            "INSERT INTO custom_task_types (garden_id, name, description)
             VALUES ($1, $2, $3)
             RETURNING id, garden_id, name, description, created_at",
        )
        .bind(garden_id)
        .bind(name)
        .bind(description)
        .fetch_one(pool)
        .await
    }

    /// Finds a custom task type by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CustomTaskType>(
            "SELECT id, garden_id, name, description, created_at
             FROM custom_task_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists the custom task types of a garden
    pub async fn list_by_garden(pool: &PgPool, garden_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, CustomTaskType>(
            "SELECT id, garden_id, name, description, created_at
             FROM custom_task_types WHERE garden_id = $1 ORDER BY name",
        )
        .bind(garden_id)
        .fetch_all(pool)
        .await
    }
}
