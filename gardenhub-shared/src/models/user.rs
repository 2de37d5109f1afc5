/// User account and profile models
///
/// Every account is a pair of rows: `users` holds identity and credentials,
/// `profiles` holds community-facing state (role, location, notification
/// opt-in, suspension and ban flags). Both rows are inserted in the same
/// transaction by [`User::create_with_profile`], so a profile exists for
/// exactly one user.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'moderator', 'member', 'guest');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     display_name VARCHAR(150),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     ...
/// );
///
/// CREATE TABLE profiles (
///     user_id UUID PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
///     role user_role NOT NULL DEFAULT 'member',
///     receives_notifications BOOLEAN NOT NULL DEFAULT TRUE,
///     is_suspended BOOLEAN NOT NULL DEFAULT FALSE,
///     suspended_until TIMESTAMPTZ,
///     is_banned BOOLEAN NOT NULL DEFAULT FALSE,
///     ...
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use gardenhub_shared::models::user::{User, CreateUser};
/// use gardenhub_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let (user, profile) = User::create_with_profile(&pool, CreateUser {
///     email: "rosa@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     display_name: Some("Rosa".to_string()),
///     location: Some("Amsterdam".to_string()),
/// }).await?;
///
/// assert_eq!(profile.user_id, user.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Community role stored on the profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full administrative access
    Admin,

    /// Can review reports and apply moderation actions
    Moderator,

    /// Regular community member
    Member,

    /// Read-mostly account
    Guest,
}

impl UserRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Moderator => "moderator",
            UserRole::Member => "member",
            UserRole::Guest => "guest",
        }
    }

    /// Parses a role from its string form
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(UserRole::Admin),
            "moderator" => Some(UserRole::Moderator),
            "member" => Some(UserRole::Member),
            "guest" => Some(UserRole::Guest),
            _ => None,
        }
    }

    /// Whether this role may review reports and moderate content
    pub fn can_moderate(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Moderator)
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT)
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Optional display name
    pub display_name: Option<String>,

    /// False once the account has been deactivated (e.g. by a ban)
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a user together with its profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    /// Optional display name
    pub display_name: Option<String>,

    /// Optional free-form location, used for weather alerts
    pub location: Option<String>,
}

/// Community profile of a user
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    /// Owning user (one profile per user)
    pub user_id: Uuid,

    pub role: UserRole,
    pub bio: Option<String>,

    /// Free-form location string; weather alerts match on it exactly
    pub location: Option<String>,

    /// Opt-in flag checked by the notification dispatcher
    pub receives_notifications: bool,

    pub is_suspended: bool,
    pub suspension_reason: Option<String>,
    pub suspended_until: Option<DateTime<Utc>>,

    pub is_banned: bool,
    pub ban_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Whether the suspension has run out and should be lifted
    pub fn suspension_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_suspended && self.suspended_until.map_or(false, |until| until <= now)
    }

    /// Whether the account is currently locked out of the API
    pub fn is_restricted(&self, now: DateTime<Utc>) -> bool {
        self.is_banned || (self.is_suspended && !self.suspension_expired(now))
    }
}

/// Input for the owner-editable part of a profile
///
/// Only non-None fields are updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub receives_notifications: Option<bool>,
}

/// Suspension applied to a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suspension {
    pub reason: String,
    pub until: DateTime<Utc>,
}

const USER_COLUMNS: &str =
    "id, email, password_hash, display_name, is_active, created_at, updated_at, last_login_at";

const PROFILE_COLUMNS: &str = "user_id, role, bio, location, receives_notifications, \
     is_suspended, suspension_reason, suspended_until, is_banned, ban_reason, created_at, updated_at";

impl User {
    /// Creates a user and its profile in one transaction
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create_with_profile(
        pool: &PgPool,
        data: CreateUser,
    ) -> Result<(Self, Profile), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, password_hash, display_name)
             VALUES ($1, $2, $3)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&data.email)
        .bind(&data.password_hash)
        .bind(&data.display_name)
        .fetch_one(&mut *tx)
        .await?;

        let profile = sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO profiles (user_id, location)
             VALUES ($1, $2)
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&data.location)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((user, profile))
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Records a successful login
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Activates or deactivates the account
    pub async fn set_active(pool: &PgPool, id: Uuid, active: bool) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(active)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

impl Profile {
    /// Finds the profile of a user
    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Updates the owner-editable fields of a profile
    ///
    /// The display name lives on `users` and is updated in the same
    /// transaction.
    pub async fn update(
        pool: &PgPool,
        user_id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if let Some(display_name) = &data.display_name {
            sqlx::query("UPDATE users SET display_name = $2, updated_at = NOW() WHERE id = $1")
                .bind(user_id)
                .bind(display_name)
                .execute(&mut *tx)
                .await?;
        }

        let profile = sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles
             SET bio = COALESCE($2, bio),
                 location = COALESCE($3, location),
                 receives_notifications = COALESCE($4, receives_notifications),
                 updated_at = NOW()
             WHERE user_id = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&data.bio)
        .bind(&data.location)
        .bind(data.receives_notifications)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(profile)
    }

    /// Applies or clears a suspension
    pub async fn set_suspension(
        pool: &PgPool,
        user_id: Uuid,
        suspension: Option<Suspension>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let (suspended, reason, until) = match suspension {
            Some(s) => (true, Some(s.reason), Some(s.until)),
            None => (false, None, None),
        };

        sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles
             SET is_suspended = $2, suspension_reason = $3, suspended_until = $4, updated_at = NOW()
             WHERE user_id = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(suspended)
        .bind(reason)
        .bind(until)
        .fetch_optional(pool)
        .await
    }

    /// Sets the permanent ban flag
    pub async fn set_banned(
        pool: &PgPool,
        user_id: Uuid,
        reason: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "UPDATE profiles
             SET is_banned = TRUE, ban_reason = $2, updated_at = NOW()
             WHERE user_id = $1
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(reason)
        .fetch_optional(pool)
        .await
    }

    /// Lists the distinct non-empty locations across all profiles
    pub async fn distinct_locations(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT DISTINCT location FROM profiles
             WHERE location IS NOT NULL AND location <> ''
             ORDER BY location",
        )
        .fetch_all(pool)
        .await
    }

    /// Lists opted-in profiles whose location is exactly `location`
    pub async fn opted_in_at_location(
        pool: &PgPool,
        location: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles
             WHERE location = $1 AND receives_notifications
             ORDER BY created_at"
        ))
        .bind(location)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn profile() -> Profile {
        let now = Utc::now();
        Profile {
            user_id: Uuid::new_v4(),
            role: UserRole::Member,
            bio: None,
            location: None,
            receives_notifications: true,
            is_suspended: false,
            suspension_reason: None,
            suspended_until: None,
            is_banned: false,
            ban_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_role_roundtrip() {
        for role in [UserRole::Admin, UserRole::Moderator, UserRole::Member, UserRole::Guest] {
            assert_eq!(UserRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::from_str("owner"), None);
    }

    #[test]
    fn test_can_moderate() {
        assert!(UserRole::Admin.can_moderate());
        assert!(UserRole::Moderator.can_moderate());
        assert!(!UserRole::Member.can_moderate());
        assert!(!UserRole::Guest.can_moderate());
    }

    #[test]
    fn test_active_suspension_restricts() {
        let now = Utc::now();
        let mut p = profile();
        p.is_suspended = true;
        p.suspended_until = Some(now + Duration::days(2));

        assert!(!p.suspension_expired(now));
        assert!(p.is_restricted(now));
    }

    #[test]
    fn test_expired_suspension_does_not_restrict() {
        let now = Utc::now();
        let mut p = profile();
        p.is_suspended = true;
        p.suspended_until = Some(now - Duration::minutes(1));

        assert!(p.suspension_expired(now));
        assert!(!p.is_restricted(now));
    }

    #[test]
    fn test_ban_always_restricts() {
        let mut p = profile();
        p.is_banned = true;
        assert!(p.is_restricted(Utc::now()));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "a@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            display_name: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
    }
}
