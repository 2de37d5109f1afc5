/// Garden membership model and database operations
///
/// A membership links a user to a garden with a role and a status. It is
/// created by a join request (pending) or by garden creation (accepted
/// manager).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE membership_role AS ENUM ('manager', 'worker');
/// CREATE TYPE membership_status AS ENUM ('pending', 'accepted', 'rejected');
///
/// CREATE TABLE garden_memberships (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     garden_id UUID NOT NULL REFERENCES gardens(id) ON DELETE CASCADE,
///     role membership_role NOT NULL DEFAULT 'worker',
///     status membership_status NOT NULL DEFAULT 'pending',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (user_id, garden_id)
/// );
/// ```
///
/// # Roles
///
/// - **manager**: Accepts/rejects join requests, manages tasks and task types
/// - **worker**: Takes on tasks
///
/// # Example
///
/// ```no_run
/// use gardenhub_shared::models::membership::{Membership, CreateMembership, MembershipRole, MembershipStatus};
/// use uuid::Uuid;
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let membership = Membership::create(&pool, CreateMembership {
///     user_id: Uuid::new_v4(),
///     garden_id: Uuid::new_v4(),
///     role: MembershipRole::Worker,
///     status: MembershipStatus::Pending,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role within a garden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    Manager,
    Worker,
}

impl MembershipRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipRole::Manager => "manager",
            MembershipRole::Worker => "worker",
        }
    }
}

/// Membership status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "membership_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    /// Join requested, awaiting a manager
    Pending,

    /// Full member
    Accepted,

    /// Request turned down
    Rejected,
}

impl MembershipStatus {
    /// Converts status to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Pending => "pending",
            MembershipStatus::Accepted => "accepted",
            MembershipStatus::Rejected => "rejected",
        }
    }

    /// Checks if transition to target status is valid
    ///
    /// Only pending requests can be decided; decisions are final.
    pub fn can_transition_to(&self, target: MembershipStatus) -> bool {
        matches!(
            (self, target),
            (MembershipStatus::Pending, MembershipStatus::Accepted)
                | (MembershipStatus::Pending, MembershipStatus::Rejected)
        )
    }
}

/// Garden membership
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub garden_id: Uuid,
    pub role: MembershipRole,
    pub status: MembershipStatus,

    /// Join time; the earliest accepted member is promoted first
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// Accepted manager membership
    pub fn is_active_manager(&self) -> bool {
        self.role == MembershipRole::Manager && self.status == MembershipStatus::Accepted
    }
}

/// Input for creating a membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub user_id: Uuid,
    pub garden_id: Uuid,
    pub role: MembershipRole,
    pub status: MembershipStatus,
}

const MEMBERSHIP_COLUMNS: &str = "id, user_id, garden_id, role, status, created_at, updated_at";

impl Membership {
    /// Creates a membership
    ///
    /// # Errors
    ///
    /// Returns an error if the user already has a membership for the garden
    /// (unique constraint violation) or a referenced row is missing.
    pub async fn create(pool: &PgPool, data: CreateMembership) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            "INSERT INTO garden_memberships (user_id, garden_id, role, status)
             VALUES ($1, $2, $3, $4)
             RETURNING {MEMBERSHIP_COLUMNS}"
        ))
        .bind(data.user_id)
        .bind(data.garden_id)
        .bind(data.role)
        .bind(data.status)
        .fetch_one(pool)
        .await
    }

    /// Finds a membership by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM garden_memberships WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds the membership of a user in a garden
    pub async fn find(
        pool: &PgPool,
        user_id: Uuid,
        garden_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM garden_memberships
             WHERE user_id = $1 AND garden_id = $2"
        ))
        .bind(user_id)
        .bind(garden_id)
        .fetch_optional(pool)
        .await
    }

    /// Lists all memberships of a garden in join order
    pub async fn list_by_garden(pool: &PgPool, garden_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM garden_memberships
             WHERE garden_id = $1
             ORDER BY created_at, id"
        ))
        .bind(garden_id)
        .fetch_all(pool)
        .await
    }

    /// Lists the gardens a user is an accepted member of
    pub async fn list_accepted_by_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            "SELECT {MEMBERSHIP_COLUMNS} FROM garden_memberships
             WHERE user_id = $1 AND status = 'accepted'
             ORDER BY created_at"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Updates the status of a membership
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: MembershipStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            "UPDATE garden_memberships SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {MEMBERSHIP_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    /// Updates the role of a membership
    pub async fn set_role(
        pool: &PgPool,
        id: Uuid,
        role: MembershipRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Membership>(&format!(
            "UPDATE garden_memberships SET role = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {MEMBERSHIP_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await
    }

    /// Deletes a membership
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM garden_memberships WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use MembershipStatus::*;
        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Accepted.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Accepted));
        assert!(!Accepted.can_transition_to(Pending));
    }

    #[test]
    fn test_is_active_manager() {
        let now = Utc::now();
        let mut m = Membership {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            garden_id: Uuid::new_v4(),
            role: MembershipRole::Manager,
            status: MembershipStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        assert!(!m.is_active_manager());
        m.status = MembershipStatus::Accepted;
        assert!(m.is_active_manager());
        m.role = MembershipRole::Worker;
        assert!(!m.is_active_manager());
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&MembershipStatus::Accepted).unwrap(),
            "\"accepted\""
        );
        assert_eq!(serde_json::to_string(&MembershipRole::Manager).unwrap(), "\"manager\"");
    }
}
