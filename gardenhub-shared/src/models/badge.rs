/// Badge catalog and awards
///
/// The catalog is static and seeded by migration. Each badge carries a JSON
/// requirement: either `{"count": N}` (a counter threshold) or
/// `{"season": "spring"}` for the seasonal event badges.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE badges (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     key VARCHAR(64) NOT NULL UNIQUE,
///     name VARCHAR(100) NOT NULL,
///     category badge_category NOT NULL,
///     requirement JSONB NOT NULL DEFAULT '{}',
///     ...
/// );
///
/// CREATE TABLE user_badges (
///     ...
///     UNIQUE (user_id, badge_id)
/// );
/// ```

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Badge category; each category is scanned by one trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "badge_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    TaskCreation,
    TaskCompletion,
    PeopleFollowed,
    FollowersGained,
    ForumPosts,
    ForumAnswers,
    Welcome,
    GardenJoining,
    GardenCreation,
    EventParticipation,
    EventSeasonal,
}

/// Meteorological season (northern hemisphere)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Season of a calendar month (1-12)
    ///
    /// Mar-May spring, Jun-Aug summer, Sep-Nov autumn, Dec-Feb winter.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    /// Season of a timestamp (UTC month)
    pub fn of(at: DateTime<Utc>) -> Self {
        Season::from_month(at.month())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }
}

/// Award requirement stored as JSONB
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeRequirement {
    /// Counter threshold (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,

    /// Required season for seasonal badges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<Season>,
}

impl BadgeRequirement {
    pub fn count(n: i64) -> Self {
        Self {
            count: Some(n),
            season: None,
        }
    }

    pub fn season(season: Season) -> Self {
        Self {
            count: None,
            season: Some(season),
        }
    }
}

/// Catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Badge {
    pub id: Uuid,

    /// Stable identifier used by the rule engine (e.g. `task_creator_10`)
    pub key: String,

    pub name: String,
    pub description: String,
    pub category: BadgeCategory,
    pub requirement: Json<BadgeRequirement>,
    pub created_at: DateTime<Utc>,
}

/// Badge earned by a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserBadge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub badge_id: Uuid,
    pub awarded_at: DateTime<Utc>,
}

const BADGE_COLUMNS: &str = "id, key, name, description, category, requirement, created_at";

impl Badge {
    /// Lists the whole catalog
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Badge>(&format!(
            "SELECT {BADGE_COLUMNS} FROM badges ORDER BY category, key"
        ))
        .fetch_all(pool)
        .await
    }

    /// Finds a badge by key
    pub async fn find_by_key(pool: &PgPool, key: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Badge>(&format!("SELECT {BADGE_COLUMNS} FROM badges WHERE key = $1"))
            .bind(key)
            .fetch_optional(pool)
            .await
    }

    /// Lists the badges of one category
    pub async fn list_by_category(
        pool: &PgPool,
        category: BadgeCategory,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Badge>(&format!(
            "SELECT {BADGE_COLUMNS} FROM badges WHERE category = $1 ORDER BY key"
        ))
        .bind(category)
        .fetch_all(pool)
        .await
    }

    /// Lists the badges earned by a user, most recent first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Badge>(
            "SELECT b.id, b.key, b.name, b.description, b.category, b.requirement, b.created_at
             FROM badges b
             JOIN user_badges ub ON ub.badge_id = b.id
             WHERE ub.user_id = $1
             ORDER BY ub.awarded_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

impl UserBadge {
    /// Awards a badge; returns None if the user already had it
    pub async fn award(
        pool: &PgPool,
        user_id: Uuid,
        badge_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, UserBadge>(
            "INSERT INTO user_badges (user_id, badge_id) VALUES ($1, $2)
             ON CONFLICT (user_id, badge_id) DO NOTHING
             RETURNING id, user_id, badge_id, awarded_at",
        )
        .bind(user_id)
        .bind(badge_id)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_season_by_month() {
        let expected = [
            (1, Season::Winter),
            (2, Season::Winter),
            (3, Season::Spring),
            (4, Season::Spring),
            (5, Season::Spring),
            (6, Season::Summer),
            (7, Season::Summer),
            (8, Season::Summer),
            (9, Season::Autumn),
            (10, Season::Autumn),
            (11, Season::Autumn),
            (12, Season::Winter),
        ];
        for (month, season) in expected {
            assert_eq!(Season::from_month(month), season, "month {month}");
        }
    }

    #[test]
    fn test_season_of_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(Season::of(at), Season::Winter);
    }

    #[test]
    fn test_requirement_json_shapes() {
        let count: BadgeRequirement = serde_json::from_str(r#"{"count": 10}"#).unwrap();
        assert_eq!(count, BadgeRequirement::count(10));

        let season: BadgeRequirement = serde_json::from_str(r#"{"season": "autumn"}"#).unwrap();
        assert_eq!(season, BadgeRequirement::season(Season::Autumn));

        let empty: BadgeRequirement = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, BadgeRequirement::default());
    }
}
