/// Abstract data store used by the domain services
///
/// The notification dispatcher, badge engine, membership lifecycle, task
/// workflow, moderation workflow and the worker jobs only talk to
/// persistence through the [`Store`] trait. Production wires in
/// [`postgres::PgStore`]; tests use [`memory::MemoryStore`].
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use gardenhub_shared::store::{Store, postgres::PgStore};
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
/// let locations = store.distinct_locations().await?;
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::models::badge::{Badge, BadgeCategory, UserBadge};
use crate::models::event::{AttendanceStatus, CreateGardenEvent, EventAttendance, GardenEvent};
use crate::models::forum::{Comment, ContentState, CreateComment, CreatePost, ForumPost};
use crate::models::garden::{CreateGarden, CustomTaskType, Garden};
use crate::models::job_run::JobRun;
use crate::models::membership::{CreateMembership, Membership, MembershipRole, MembershipStatus};
use crate::models::notification::{CreateNotification, Notification};
use crate::models::report::{CreateReport, Report};
use crate::models::task::{CreateTask, Task, TaskStatus};
use crate::models::user::{CreateUser, Profile, Suspension, User};

/// Persistence error
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Unique constraint violated
    #[error("Duplicate entry: {0}")]
    Conflict(String),

    /// Foreign key points at a missing row
    #[error("Missing reference: {0}")]
    MissingReference(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            if db_err.is_unique_violation() {
                return StoreError::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return StoreError::MissingReference(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Counters recomputed by the badge engine
///
/// Every counter is a full count query over the current state, never an
/// incrementally maintained number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Tasks created by the user
    TasksCreated(Uuid),

    /// Completed tasks the user is assigned to
    TasksCompleted(Uuid),

    /// Users the user follows
    Following(Uuid),

    /// Users following the user
    Followers(Uuid),

    /// Active forum posts authored by the user
    ActivePosts(Uuid),

    /// Active comments authored by the user
    ActiveComments(Uuid),

    /// Accepted garden memberships of the user
    AcceptedMemberships(Uuid),

    /// Manager-role memberships of the user
    ManagerMemberships(Uuid),

    /// Event attendances the user marked as going
    GoingAttendances(Uuid),
}

/// Data store consumed by the domain services
#[async_trait]
pub trait Store: Send + Sync {
    // Accounts

    /// Creates a user and its profile atomically
    async fn create_user(&self, data: CreateUser) -> StoreResult<(User, Profile)>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Looks up a user by (already lowercased) email
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn set_user_active(&self, id: Uuid, active: bool) -> StoreResult<bool>;
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    async fn set_suspension(
        &self,
        user_id: Uuid,
        suspension: Option<Suspension>,
    ) -> StoreResult<Option<Profile>>;
    async fn set_banned(&self, user_id: Uuid, reason: &str) -> StoreResult<Option<Profile>>;
    async fn distinct_locations(&self) -> StoreResult<Vec<String>>;
    async fn opted_in_profiles_at(&self, location: &str) -> StoreResult<Vec<Profile>>;

    // Social graph and devices

    /// Returns false if the follow already existed
    async fn add_follow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<bool>;
    async fn remove_follow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<bool>;
    async fn active_push_tokens(&self, user_id: Uuid) -> StoreResult<Vec<String>>;

    // Notifications and badges

    async fn insert_notification(&self, data: CreateNotification) -> StoreResult<Notification>;
    async fn badge_by_key(&self, key: &str) -> StoreResult<Option<Badge>>;
    async fn badges_in_category(&self, category: BadgeCategory) -> StoreResult<Vec<Badge>>;

    /// Returns None if the user already holds the badge
    async fn insert_user_badge(&self, user_id: Uuid, badge_id: Uuid)
        -> StoreResult<Option<UserBadge>>;
    async fn count(&self, counter: Counter) -> StoreResult<i64>;

    // Gardens and memberships

    async fn insert_garden(&self, data: CreateGarden) -> StoreResult<Garden>;
    async fn get_garden(&self, id: Uuid) -> StoreResult<Option<Garden>>;
    async fn delete_garden(&self, id: Uuid) -> StoreResult<bool>;
    async fn set_garden_hidden(
        &self,
        id: Uuid,
        hidden: bool,
        reason: Option<&str>,
    ) -> StoreResult<Option<Garden>>;
    async fn get_custom_task_type(&self, id: Uuid) -> StoreResult<Option<CustomTaskType>>;

    /// Fails with `Conflict` if the user already has a membership
    async fn insert_membership(&self, data: CreateMembership) -> StoreResult<Membership>;
    async fn get_membership(&self, id: Uuid) -> StoreResult<Option<Membership>>;
    async fn find_membership(&self, user_id: Uuid, garden_id: Uuid)
        -> StoreResult<Option<Membership>>;

    /// All memberships of a garden in join order
    async fn garden_memberships(&self, garden_id: Uuid) -> StoreResult<Vec<Membership>>;
    async fn set_membership_status(
        &self,
        id: Uuid,
        status: MembershipStatus,
    ) -> StoreResult<Option<Membership>>;
    async fn set_membership_role(
        &self,
        id: Uuid,
        role: MembershipRole,
    ) -> StoreResult<Option<Membership>>;
    async fn delete_membership(&self, id: Uuid) -> StoreResult<bool>;

    // Tasks

    async fn insert_task(&self, data: CreateTask, assignees: &[Uuid]) -> StoreResult<Task>;
    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>>;
    async fn set_task_status(&self, id: Uuid, status: TaskStatus) -> StoreResult<Option<Task>>;
    async fn task_assignees(&self, task_id: Uuid) -> StoreResult<Vec<Uuid>>;

    /// Returns false if the user was already assigned
    async fn add_task_assignee(&self, task_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    async fn recurring_templates(&self) -> StoreResult<Vec<Task>>;
    async fn latest_instance(&self, template_id: Uuid) -> StoreResult<Option<Task>>;
    async fn instance_exists_on(&self, template_id: Uuid, date: NaiveDate) -> StoreResult<bool>;
    async fn open_tasks_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>>;

    // Forum

    async fn insert_post(&self, data: CreatePost) -> StoreResult<ForumPost>;
    async fn insert_comment(&self, data: CreateComment) -> StoreResult<Comment>;
    async fn get_post(&self, id: Uuid) -> StoreResult<Option<ForumPost>>;
    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>>;
    async fn set_post_state(&self, id: Uuid, state: ContentState) -> StoreResult<bool>;
    async fn set_comment_state(&self, id: Uuid, state: ContentState) -> StoreResult<bool>;

    /// Removes all active posts and comments of a user; returns (posts, comments)
    async fn remove_user_content(&self, user_id: Uuid) -> StoreResult<(u64, u64)>;

    // Reports

    /// Fails with `Conflict` if the reporter already reported the target
    async fn insert_report(&self, data: CreateReport) -> StoreResult<Report>;
    async fn get_report(&self, id: Uuid) -> StoreResult<Option<Report>>;

    /// Returns None if the report was already reviewed
    async fn mark_report_reviewed(
        &self,
        id: Uuid,
        is_valid: bool,
        reviewer_id: Uuid,
    ) -> StoreResult<Option<Report>>;

    // Events

    async fn insert_event(&self, data: CreateGardenEvent) -> StoreResult<GardenEvent>;
    async fn get_event(&self, id: Uuid) -> StoreResult<Option<GardenEvent>>;
    async fn upsert_attendance(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        status: AttendanceStatus,
    ) -> StoreResult<EventAttendance>;

    // Job log

    async fn start_job_run(&self, job_name: &str) -> StoreResult<JobRun>;
    async fn finish_job_run(&self, id: Uuid, success: bool, summary: &str) -> StoreResult<()>;
    async fn delete_job_runs_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_pass_through() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn test_conflict_display() {
        let err = StoreError::Conflict("reports_reporter_id_target_kind_target_id_key".into());
        assert!(err.to_string().starts_with("Duplicate entry"));
    }
}
