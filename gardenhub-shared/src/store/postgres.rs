/// PostgreSQL-backed [`Store`]
///
/// Thin delegation to the model functions plus the badge counter queries.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Counter, Store, StoreResult};
use crate::models::badge::{Badge, BadgeCategory, UserBadge};
use crate::models::event::{AttendanceStatus, CreateGardenEvent, EventAttendance, GardenEvent};
use crate::models::forum::{Comment, ContentState, CreateComment, CreatePost, ForumPost};
use crate::models::garden::{CreateGarden, CustomTaskType, Garden};
use crate::models::job_run::JobRun;
use crate::models::membership::{CreateMembership, Membership, MembershipRole, MembershipStatus};
use crate::models::notification::{CreateNotification, Notification};
use crate::models::report::{CreateReport, Report};
use crate::models::social::{Follow, PushDevice};
use crate::models::task::{CreateTask, Task, TaskStatus};
use crate::models::user::{CreateUser, Profile, Suspension, User};

/// Store over a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for read-only queries outside the store
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn counter_query(counter: Counter) -> (&'static str, Uuid) {
    match counter {
        Counter::TasksCreated(user) => ("SELECT COUNT(*) FROM tasks WHERE created_by = $1", user),
        Counter::TasksCompleted(user) => (
            "SELECT COUNT(*) FROM tasks t
             JOIN task_assignees ta ON ta.task_id = t.id
             WHERE ta.user_id = $1 AND t.status = 'completed'",
            user,
        ),
        Counter::Following(user) => ("SELECT COUNT(*) FROM follows WHERE follower_id = $1", user),
        Counter::Followers(user) => ("SELECT COUNT(*) FROM follows WHERE followed_id = $1", user),
        Counter::ActivePosts(user) => (
            "SELECT COUNT(*) FROM forum_posts WHERE author_id = $1 AND state = 'active'",
            user,
        ),
        Counter::ActiveComments(user) => (
            "SELECT COUNT(*) FROM comments WHERE author_id = $1 AND state = 'active'",
            user,
        ),
        Counter::AcceptedMemberships(user) => (
            "SELECT COUNT(*) FROM garden_memberships WHERE user_id = $1 AND status = 'accepted'",
            user,
        ),
        Counter::ManagerMemberships(user) => (
            "SELECT COUNT(*) FROM garden_memberships WHERE user_id = $1 AND role = 'manager'",
            user,
        ),
        Counter::GoingAttendances(user) => (
            "SELECT COUNT(*) FROM event_attendances WHERE user_id = $1 AND status = 'going'",
            user,
        ),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<(User, Profile)> {
        Ok(User::create_with_profile(&self.pool, data).await?)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn set_user_active(&self, id: Uuid, active: bool) -> StoreResult<bool> {
        Ok(User::set_active(&self.pool, id, active).await?)
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(Profile::find_by_user(&self.pool, user_id).await?)
    }

    async fn set_suspension(
        &self,
        user_id: Uuid,
        suspension: Option<Suspension>,
    ) -> StoreResult<Option<Profile>> {
        Ok(Profile::set_suspension(&self.pool, user_id, suspension).await?)
    }

    async fn set_banned(&self, user_id: Uuid, reason: &str) -> StoreResult<Option<Profile>> {
        Ok(Profile::set_banned(&self.pool, user_id, reason).await?)
    }

    async fn distinct_locations(&self) -> StoreResult<Vec<String>> {
        Ok(Profile::distinct_locations(&self.pool).await?)
    }

    async fn opted_in_profiles_at(&self, location: &str) -> StoreResult<Vec<Profile>> {
        Ok(Profile::opted_in_at_location(&self.pool, location).await?)
    }

    async fn add_follow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<bool> {
        Ok(Follow::create(&self.pool, follower_id, followed_id).await?)
    }

    async fn remove_follow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<bool> {
        Ok(Follow::delete(&self.pool, follower_id, followed_id).await?)
    }

    async fn active_push_tokens(&self, user_id: Uuid) -> StoreResult<Vec<String>> {
        Ok(PushDevice::active_tokens(&self.pool, user_id).await?)
    }

    async fn insert_notification(&self, data: CreateNotification) -> StoreResult<Notification> {
        Ok(Notification::create(&self.pool, data).await?)
    }

    async fn badge_by_key(&self, key: &str) -> StoreResult<Option<Badge>> {
        Ok(Badge::find_by_key(&self.pool, key).await?)
    }

    async fn badges_in_category(&self, category: BadgeCategory) -> StoreResult<Vec<Badge>> {
        Ok(Badge::list_by_category(&self.pool, category).await?)
    }

    async fn insert_user_badge(
        &self,
        user_id: Uuid,
        badge_id: Uuid,
    ) -> StoreResult<Option<UserBadge>> {
        Ok(UserBadge::award(&self.pool, user_id, badge_id).await?)
    }

    async fn count(&self, counter: Counter) -> StoreResult<i64> {
        let (sql, user_id) = counter_query(counter);
        let count: i64 = sqlx::query_scalar(sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_garden(&self, data: CreateGarden) -> StoreResult<Garden> {
        Ok(Garden::create(&self.pool, data).await?)
    }

    async fn get_garden(&self, id: Uuid) -> StoreResult<Option<Garden>> {
        Ok(Garden::find_by_id(&self.pool, id).await?)
    }

    async fn delete_garden(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Garden::delete(&self.pool, id).await?)
    }

    async fn set_garden_hidden(
        &self,
        id: Uuid,
        hidden: bool,
        reason: Option<&str>,
    ) -> StoreResult<Option<Garden>> {
        Ok(Garden::set_hidden(&self.pool, id, hidden, reason).await?)
    }

    async fn get_custom_task_type(&self, id: Uuid) -> StoreResult<Option<CustomTaskType>> {
        Ok(CustomTaskType::find_by_id(&self.pool, id).await?)
    }

    async fn insert_membership(&self, data: CreateMembership) -> StoreResult<Membership> {
        Ok(Membership::create(&self.pool, data).await?)
    }

    async fn get_membership(&self, id: Uuid) -> StoreResult<Option<Membership>> {
        Ok(Membership::find_by_id(&self.pool, id).await?)
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        garden_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        Ok(Membership::find(&self.pool, user_id, garden_id).await?)
    }

    async fn garden_memberships(&self, garden_id: Uuid) -> StoreResult<Vec<Membership>> {
        Ok(Membership::list_by_garden(&self.pool, garden_id).await?)
    }

    async fn set_membership_status(
        &self,
        id: Uuid,
        status: MembershipStatus,
    ) -> StoreResult<Option<Membership>> {
        Ok(Membership::set_status(&self.pool, id, status).await?)
    }

    async fn set_membership_role(
        &self,
        id: Uuid,
        role: MembershipRole,
    ) -> StoreResult<Option<Membership>> {
        Ok(Membership::set_role(&self.pool, id, role).await?)
    }

    async fn delete_membership(&self, id: Uuid) -> StoreResult<bool> {
        Ok(Membership::delete(&self.pool, id).await?)
    }

    async fn insert_task(&self, data: CreateTask, assignees: &[Uuid]) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data, assignees).await?)
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn set_task_status(&self, id: Uuid, status: TaskStatus) -> StoreResult<Option<Task>> {
        Ok(Task::set_status(&self.pool, id, status).await?)
    }

    async fn task_assignees(&self, task_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(Task::assignees(&self.pool, task_id).await?)
    }

    async fn add_task_assignee(&self, task_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(Task::add_assignee(&self.pool, task_id, user_id).await?)
    }

    async fn recurring_templates(&self) -> StoreResult<Vec<Task>> {
        Ok(Task::recurring_templates(&self.pool).await?)
    }

    async fn latest_instance(&self, template_id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::latest_instance(&self.pool, template_id).await?)
    }

    async fn instance_exists_on(&self, template_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        Ok(Task::instance_exists_on(&self.pool, template_id, date).await?)
    }

    async fn open_tasks_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>> {
        Ok(Task::open_due_between(&self.pool, from, to).await?)
    }

    async fn insert_post(&self, data: CreatePost) -> StoreResult<ForumPost> {
        Ok(ForumPost::create(&self.pool, data).await?)
    }

    async fn insert_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        Ok(Comment::create(&self.pool, data).await?)
    }

    async fn get_post(&self, id: Uuid) -> StoreResult<Option<ForumPost>> {
        Ok(ForumPost::find_by_id(&self.pool, id).await?)
    }

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(Comment::find_by_id(&self.pool, id).await?)
    }

    async fn set_post_state(&self, id: Uuid, state: ContentState) -> StoreResult<bool> {
        Ok(ForumPost::set_state(&self.pool, id, state).await?)
    }

    async fn set_comment_state(&self, id: Uuid, state: ContentState) -> StoreResult<bool> {
        Ok(Comment::set_state(&self.pool, id, state).await?)
    }

    async fn remove_user_content(&self, user_id: Uuid) -> StoreResult<(u64, u64)> {
        let posts = ForumPost::remove_all_by_author(&self.pool, user_id).await?;
        let comments = Comment::remove_all_by_author(&self.pool, user_id).await?;
        Ok((posts, comments))
    }

    async fn insert_report(&self, data: CreateReport) -> StoreResult<Report> {
        Ok(Report::create(&self.pool, data).await?)
    }

    async fn get_report(&self, id: Uuid) -> StoreResult<Option<Report>> {
        Ok(Report::find_by_id(&self.pool, id).await?)
    }

    async fn mark_report_reviewed(
        &self,
        id: Uuid,
        is_valid: bool,
        reviewer_id: Uuid,
    ) -> StoreResult<Option<Report>> {
        Ok(Report::mark_reviewed(&self.pool, id, is_valid, reviewer_id).await?)
    }

    async fn insert_event(&self, data: CreateGardenEvent) -> StoreResult<GardenEvent> {
        Ok(GardenEvent::create(&self.pool, data).await?)
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<GardenEvent>> {
        Ok(GardenEvent::find_by_id(&self.pool, id).await?)
    }

    async fn upsert_attendance(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        status: AttendanceStatus,
    ) -> StoreResult<EventAttendance> {
        Ok(EventAttendance::upsert(&self.pool, event_id, user_id, status).await?)
    }

    async fn start_job_run(&self, job_name: &str) -> StoreResult<JobRun> {
        Ok(JobRun::start(&self.pool, job_name).await?)
    }

    async fn finish_job_run(&self, id: Uuid, success: bool, summary: &str) -> StoreResult<()> {
        Ok(JobRun::finish(&self.pool, id, success, summary).await?)
    }

    async fn delete_job_runs_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        Ok(JobRun::delete_started_before(&self.pool, cutoff).await?)
    }
}
