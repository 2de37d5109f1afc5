/// In-memory [`Store`] for tests
///
/// Mirrors the constraints the PostgreSQL schema enforces (unique keys,
/// foreign keys, cascades) closely enough for the domain services to behave
/// the same way against it. Collections are kept in insertion order, which
/// stands in for `created_at` ordering.
///
/// Besides the trait, it exposes seeding and inspection helpers so tests can
/// arrange state and assert on side effects without going through services.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{Counter, Store, StoreError, StoreResult};
use crate::models::badge::{Badge, BadgeCategory, BadgeRequirement, Season, UserBadge};
use crate::models::event::{
    AttendanceStatus, CreateGardenEvent, EventAttendance, EventVisibility, GardenEvent,
};
use crate::models::forum::{Comment, ContentState, CreateComment, CreatePost, ForumPost};
use crate::models::garden::{CreateGarden, CustomTaskType, Garden};
use crate::models::job_run::JobRun;
use crate::models::membership::{CreateMembership, Membership, MembershipRole, MembershipStatus};
use crate::models::notification::{CreateNotification, Notification};
use crate::models::report::{CreateReport, Report};
use crate::models::social::PushDevice;
use crate::models::task::{CreateTask, Task, TaskStatus};
use crate::models::user::{CreateUser, Profile, Suspension, User, UserRole};

#[derive(Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    profiles: HashMap<Uuid, Profile>,
    follows: Vec<(Uuid, Uuid)>,
    devices: Vec<PushDevice>,
    notifications: Vec<Notification>,
    badges: Vec<Badge>,
    user_badges: Vec<UserBadge>,
    gardens: Vec<Garden>,
    custom_types: Vec<CustomTaskType>,
    memberships: Vec<Membership>,
    tasks: Vec<Task>,
    assignees: Vec<(Uuid, Uuid)>,
    posts: Vec<ForumPost>,
    comments: Vec<Comment>,
    reports: Vec<Report>,
    events: Vec<GardenEvent>,
    attendances: Vec<EventAttendance>,
    job_runs: Vec<JobRun>,
    unreachable_inboxes: HashSet<Uuid>,
}

impl Inner {
    fn cascade_garden(&mut self, garden_id: Uuid) {
        self.memberships.retain(|m| m.garden_id != garden_id);
        self.custom_types.retain(|t| t.garden_id != garden_id);

        let task_ids: Vec<Uuid> = self
            .tasks
            .iter()
            .filter(|t| t.garden_id == garden_id)
            .map(|t| t.id)
            .collect();
        self.tasks.retain(|t| t.garden_id != garden_id);
        self.assignees.retain(|(task, _)| !task_ids.contains(task));

        let event_ids: Vec<Uuid> = self
            .events
            .iter()
            .filter(|e| e.garden_id == garden_id)
            .map(|e| e.id)
            .collect();
        self.events.retain(|e| e.garden_id != garden_id);
        self.attendances.retain(|a| !event_ids.contains(&a.event_id));
    }

    fn require_user(&self, id: Uuid, what: &str) -> StoreResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference(format!("{what}_user_id_fkey")))
        }
    }
}

fn default_profile(user_id: Uuid, location: Option<String>, now: DateTime<Utc>) -> Profile {
    Profile {
        user_id,
        role: UserRole::Member,
        bio: None,
        location,
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

/// In-memory store guarded by an async mutex
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with the common badge catalog entries
    pub async fn with_badge_catalog() -> Self {
        let store = Self::new();
        let catalog: [(&str, &str, BadgeCategory, BadgeRequirement); 17] = [
            ("welcome", "Welcome Gardener", BadgeCategory::Welcome, BadgeRequirement::count(1)),
            ("task_creator_1", "First Sprout", BadgeCategory::TaskCreation, BadgeRequirement::count(1)),
            ("task_creator_10", "Planner", BadgeCategory::TaskCreation, BadgeRequirement::count(10)),
            ("task_completer_1", "Green Thumb", BadgeCategory::TaskCompletion, BadgeRequirement::count(1)),
            ("task_completer_10", "Hard Worker", BadgeCategory::TaskCompletion, BadgeRequirement::count(10)),
            ("following_1", "Curious", BadgeCategory::PeopleFollowed, BadgeRequirement::count(1)),
            ("followers_1", "Noticed", BadgeCategory::FollowersGained, BadgeRequirement::count(1)),
            ("forum_post_1", "Conversation Starter", BadgeCategory::ForumPosts, BadgeRequirement::count(1)),
            ("forum_answer_1", "Helping Hand", BadgeCategory::ForumAnswers, BadgeRequirement::count(1)),
            ("garden_joiner_1", "New Neighbour", BadgeCategory::GardenJoining, BadgeRequirement::count(1)),
            ("garden_creator_1", "Founder", BadgeCategory::GardenCreation, BadgeRequirement::count(1)),
            ("event_goer_1", "Showing Up", BadgeCategory::EventParticipation, BadgeRequirement::count(1)),
            ("event_goer_5", "Regular", BadgeCategory::EventParticipation, BadgeRequirement::count(5)),
            ("season_spring", "Spring Bloomer", BadgeCategory::EventSeasonal, BadgeRequirement::season(Season::Spring)),
            ("season_summer", "Summer Sun", BadgeCategory::EventSeasonal, BadgeRequirement::season(Season::Summer)),
            ("season_autumn", "Autumn Harvest", BadgeCategory::EventSeasonal, BadgeRequirement::season(Season::Autumn)),
            ("season_winter", "Winter Hardy", BadgeCategory::EventSeasonal, BadgeRequirement::season(Season::Winter)),
        ];
        for (key, name, category, requirement) in catalog {
            store.seed_badge(key, name, category, requirement).await;
        }
        store
    }

    /// Adds a catalog entry
    pub async fn seed_badge(
        &self,
        key: &str,
        name: &str,
        category: BadgeCategory,
        requirement: BadgeRequirement,
    ) -> Badge {
        let badge = Badge {
            id: Uuid::new_v4(),
            key: key.to_string(),
            name: name.to_string(),
            description: String::new(),
            category,
            requirement: Json(requirement),
            created_at: Utc::now(),
        };
        self.inner.lock().await.badges.push(badge.clone());
        badge
    }

    /// Creates a user with a default member profile
    pub async fn seed_user(&self, display_name: &str) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut inner = self.inner.lock().await;
        inner.users.insert(
            id,
            User {
                id,
                email: format!("{}-{}@example.com", display_name.to_lowercase(), id),
                password_hash: "$argon2id$test".to_string(),
                display_name: Some(display_name.to_string()),
                is_active: true,
                created_at: now,
                updated_at: now,
                last_login_at: None,
            },
        );
        inner.profiles.insert(id, default_profile(id, None, now));
        id
    }

    /// Edits a profile in place
    pub async fn update_profile<F: FnOnce(&mut Profile)>(&self, user_id: Uuid, f: F) {
        if let Some(profile) = self.inner.lock().await.profiles.get_mut(&user_id) {
            f(profile);
        }
    }

    pub async fn set_role(&self, user_id: Uuid, role: UserRole) {
        self.update_profile(user_id, |p| p.role = role).await;
    }

    /// Makes every notification insert for the user fail
    pub async fn fail_notifications_for(&self, user_id: Uuid) {
        self.inner.lock().await.unreachable_inboxes.insert(user_id);
    }

    /// Registers an active push token
    pub async fn add_device(&self, user_id: Uuid, token: &str) {
        let now = Utc::now();
        self.inner.lock().await.devices.push(PushDevice {
            id: Uuid::new_v4(),
            user_id,
            token: token.to_string(),
            platform: "android".to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        });
    }

    /// Adds a garden event
    pub async fn seed_event(&self, garden_id: Uuid, starts_at: DateTime<Utc>) -> GardenEvent {
        let now = Utc::now();
        let event = GardenEvent {
            id: Uuid::new_v4(),
            garden_id,
            created_by: None,
            title: "Work day".to_string(),
            description: None,
            visibility: EventVisibility::Public,
            starts_at,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().await.events.push(event.clone());
        event
    }

    /// Adds a custom task type
    pub async fn seed_custom_task_type(&self, garden_id: Uuid, name: &str) -> CustomTaskType {
        let custom = CustomTaskType {
            id: Uuid::new_v4(),
            garden_id,
            name: name.to_string(),
            description: None,
            created_at: Utc::now(),
        };
        self.inner.lock().await.custom_types.push(custom.clone());
        custom
    }

    /// Adds a job run with an explicit start time
    pub async fn seed_job_run(&self, job_name: &str, started_at: DateTime<Utc>) {
        self.inner.lock().await.job_runs.push(JobRun {
            id: Uuid::new_v4(),
            job_name: job_name.to_string(),
            started_at,
            finished_at: Some(started_at),
            success: Some(true),
            summary: None,
        });
    }

    /// Notifications of a recipient in insertion order
    pub async fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.inner
            .lock()
            .await
            .notifications
            .iter()
            .filter(|n| n.recipient_id == user_id)
            .cloned()
            .collect()
    }

    pub async fn notification_count(&self) -> usize {
        self.inner.lock().await.notifications.len()
    }

    /// Keys of the badges a user holds
    pub async fn badge_keys(&self, user_id: Uuid) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner
            .user_badges
            .iter()
            .filter(|ub| ub.user_id == user_id)
            .filter_map(|ub| inner.badges.iter().find(|b| b.id == ub.badge_id))
            .map(|b| b.key.clone())
            .collect()
    }

    pub async fn user_badge_rows(&self) -> usize {
        self.inner.lock().await.user_badges.len()
    }

    pub async fn garden_exists(&self, id: Uuid) -> bool {
        self.inner.lock().await.gardens.iter().any(|g| g.id == id)
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.inner.lock().await.tasks.clone()
    }

    pub async fn job_runs(&self) -> Vec<JobRun> {
        self.inner.lock().await.job_runs.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<(User, Profile)> {
        let mut inner = self.inner.lock().await;
        let email = data.email.to_lowercase();
        if inner.users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            display_name: data.display_name,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        let profile = default_profile(user.id, data.location, now);
        inner.users.insert(user.id, user.clone());
        inner.profiles.insert(user.id, profile.clone());
        Ok((user, profile))
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .inner
            .lock()
            .await
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn set_user_active(&self, id: Uuid, active: bool) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        Ok(match inner.users.get_mut(&id) {
            Some(user) => {
                user.is_active = active;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.inner.lock().await.profiles.get(&user_id).cloned())
    }

    async fn set_suspension(
        &self,
        user_id: Uuid,
        suspension: Option<Suspension>,
    ) -> StoreResult<Option<Profile>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.profiles.get_mut(&user_id).map(|profile| {
            match suspension {
                Some(s) => {
                    profile.is_suspended = true;
                    profile.suspension_reason = Some(s.reason);
                    profile.suspended_until = Some(s.until);
                }
                None => {
                    profile.is_suspended = false;
                    profile.suspension_reason = None;
                    profile.suspended_until = None;
                }
            }
            profile.updated_at = Utc::now();
            profile.clone()
        }))
    }

    async fn set_banned(&self, user_id: Uuid, reason: &str) -> StoreResult<Option<Profile>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.profiles.get_mut(&user_id).map(|profile| {
            profile.is_banned = true;
            profile.ban_reason = Some(reason.to_string());
            profile.updated_at = Utc::now();
            profile.clone()
        }))
    }

    async fn distinct_locations(&self) -> StoreResult<Vec<String>> {
        let inner = self.inner.lock().await;
        let mut locations: Vec<String> = inner
            .profiles
            .values()
            .filter_map(|p| p.location.clone())
            .filter(|l| !l.is_empty())
            .collect();
        locations.sort();
        locations.dedup();
        Ok(locations)
    }

    async fn opted_in_profiles_at(&self, location: &str) -> StoreResult<Vec<Profile>> {
        let inner = self.inner.lock().await;
        let mut profiles: Vec<Profile> = inner
            .profiles
            .values()
            .filter(|p| p.receives_notifications && p.location.as_deref() == Some(location))
            .cloned()
            .collect();
        profiles.sort_by_key(|p| p.created_at);
        Ok(profiles)
    }

    async fn add_follow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        inner.require_user(follower_id, "follows_follower")?;
        inner.require_user(followed_id, "follows_followed")?;
        if inner.follows.contains(&(follower_id, followed_id)) {
            return Ok(false);
        }
        inner.follows.push((follower_id, followed_id));
        Ok(true)
    }

    async fn remove_follow(&self, follower_id: Uuid, followed_id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.follows.len();
        inner.follows.retain(|f| *f != (follower_id, followed_id));
        Ok(inner.follows.len() < before)
    }

    async fn active_push_tokens(&self, user_id: Uuid) -> StoreResult<Vec<String>> {
        Ok(self
            .inner
            .lock()
            .await
            .devices
            .iter()
            .filter(|d| d.user_id == user_id && d.active)
            .map(|d| d.token.clone())
            .collect())
    }

    async fn insert_notification(&self, data: CreateNotification) -> StoreResult<Notification> {
        let mut inner = self.inner.lock().await;
        inner.require_user(data.recipient_id, "notifications_recipient")?;
        if inner.unreachable_inboxes.contains(&data.recipient_id) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id: data.recipient_id,
            title: data.title,
            message: data.message,
            category: data.category,
            link: data.link,
            read: false,
            created_at: Utc::now(),
        };
        inner.notifications.push(notification.clone());
        Ok(notification)
    }

    async fn badge_by_key(&self, key: &str) -> StoreResult<Option<Badge>> {
        Ok(self
            .inner
            .lock()
            .await
            .badges
            .iter()
            .find(|b| b.key == key)
            .cloned())
    }

    async fn badges_in_category(&self, category: BadgeCategory) -> StoreResult<Vec<Badge>> {
        Ok(self
            .inner
            .lock()
            .await
            .badges
            .iter()
            .filter(|b| b.category == category)
            .cloned()
            .collect())
    }

    async fn insert_user_badge(
        &self,
        user_id: Uuid,
        badge_id: Uuid,
    ) -> StoreResult<Option<UserBadge>> {
        let mut inner = self.inner.lock().await;
        if inner
            .user_badges
            .iter()
            .any(|ub| ub.user_id == user_id && ub.badge_id == badge_id)
        {
            return Ok(None);
        }
        let award = UserBadge {
            id: Uuid::new_v4(),
            user_id,
            badge_id,
            awarded_at: Utc::now(),
        };
        inner.user_badges.push(award.clone());
        Ok(Some(award))
    }

    async fn count(&self, counter: Counter) -> StoreResult<i64> {
        let inner = self.inner.lock().await;
        let n = match counter {
            Counter::TasksCreated(user) => inner
                .tasks
                .iter()
                .filter(|t| t.created_by == Some(user))
                .count(),
            Counter::TasksCompleted(user) => inner
                .assignees
                .iter()
                .filter(|(_, u)| *u == user)
                .filter(|(task_id, _)| {
                    inner
                        .tasks
                        .iter()
                        .any(|t| t.id == *task_id && t.status == TaskStatus::Completed)
                })
                .count(),
            Counter::Following(user) => inner.follows.iter().filter(|(f, _)| *f == user).count(),
            Counter::Followers(user) => inner.follows.iter().filter(|(_, f)| *f == user).count(),
            Counter::ActivePosts(user) => inner
                .posts
                .iter()
                .filter(|p| p.author_id == user && p.state == ContentState::Active)
                .count(),
            Counter::ActiveComments(user) => inner
                .comments
                .iter()
                .filter(|c| c.author_id == user && c.state == ContentState::Active)
                .count(),
            Counter::AcceptedMemberships(user) => inner
                .memberships
                .iter()
                .filter(|m| m.user_id == user && m.status == MembershipStatus::Accepted)
                .count(),
            Counter::ManagerMemberships(user) => inner
                .memberships
                .iter()
                .filter(|m| m.user_id == user && m.role == MembershipRole::Manager)
                .count(),
            Counter::GoingAttendances(user) => inner
                .attendances
                .iter()
                .filter(|a| a.user_id == user && a.status == AttendanceStatus::Going)
                .count(),
        };
        Ok(n as i64)
    }

    async fn insert_garden(&self, data: CreateGarden) -> StoreResult<Garden> {
        let now = Utc::now();
        let (cover_image, cover_image_mime) = match data.cover_image {
            Some((bytes, mime)) => (Some(bytes), Some(mime)),
            None => (None, None),
        };
        let garden = Garden {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            location: data.location,
            latitude: data.latitude,
            longitude: data.longitude,
            is_public: data.is_public,
            is_hidden: false,
            hidden_reason: None,
            cover_image,
            cover_image_mime,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().await.gardens.push(garden.clone());
        Ok(garden)
    }

    async fn get_garden(&self, id: Uuid) -> StoreResult<Option<Garden>> {
        Ok(self
            .inner
            .lock()
            .await
            .gardens
            .iter()
            .find(|g| g.id == id)
            .cloned())
    }

    async fn delete_garden(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.gardens.len();
        inner.gardens.retain(|g| g.id != id);
        let deleted = inner.gardens.len() < before;
        if deleted {
            inner.cascade_garden(id);
        }
        Ok(deleted)
    }

    async fn set_garden_hidden(
        &self,
        id: Uuid,
        hidden: bool,
        reason: Option<&str>,
    ) -> StoreResult<Option<Garden>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.gardens.iter_mut().find(|g| g.id == id).map(|garden| {
            garden.is_hidden = hidden;
            garden.hidden_reason = reason.map(str::to_string);
            garden.updated_at = Utc::now();
            garden.clone()
        }))
    }

    async fn get_custom_task_type(&self, id: Uuid) -> StoreResult<Option<CustomTaskType>> {
        Ok(self
            .inner
            .lock()
            .await
            .custom_types
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn insert_membership(&self, data: CreateMembership) -> StoreResult<Membership> {
        let mut inner = self.inner.lock().await;
        inner.require_user(data.user_id, "garden_memberships")?;
        if !inner.gardens.iter().any(|g| g.id == data.garden_id) {
            return Err(StoreError::MissingReference(
                "garden_memberships_garden_id_fkey".to_string(),
            ));
        }
        if inner
            .memberships
            .iter()
            .any(|m| m.user_id == data.user_id && m.garden_id == data.garden_id)
        {
            return Err(StoreError::Conflict(
                "garden_memberships_user_id_garden_id_key".to_string(),
            ));
        }

        let now = Utc::now();
        let membership = Membership {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            garden_id: data.garden_id,
            role: data.role,
            status: data.status,
            created_at: now,
            updated_at: now,
        };
        inner.memberships.push(membership.clone());
        Ok(membership)
    }

    async fn get_membership(&self, id: Uuid) -> StoreResult<Option<Membership>> {
        Ok(self
            .inner
            .lock()
            .await
            .memberships
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        garden_id: Uuid,
    ) -> StoreResult<Option<Membership>> {
        Ok(self
            .inner
            .lock()
            .await
            .memberships
            .iter()
            .find(|m| m.user_id == user_id && m.garden_id == garden_id)
            .cloned())
    }

    async fn garden_memberships(&self, garden_id: Uuid) -> StoreResult<Vec<Membership>> {
        Ok(self
            .inner
            .lock()
            .await
            .memberships
            .iter()
            .filter(|m| m.garden_id == garden_id)
            .cloned()
            .collect())
    }

    async fn set_membership_status(
        &self,
        id: Uuid,
        status: MembershipStatus,
    ) -> StoreResult<Option<Membership>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.memberships.iter_mut().find(|m| m.id == id).map(|m| {
            m.status = status;
            m.updated_at = Utc::now();
            m.clone()
        }))
    }

    async fn set_membership_role(
        &self,
        id: Uuid,
        role: MembershipRole,
    ) -> StoreResult<Option<Membership>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.memberships.iter_mut().find(|m| m.id == id).map(|m| {
            m.role = role;
            m.updated_at = Utc::now();
            m.clone()
        }))
    }

    async fn delete_membership(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.memberships.len();
        inner.memberships.retain(|m| m.id != id);
        Ok(inner.memberships.len() < before)
    }

    async fn insert_task(&self, data: CreateTask, assignees: &[Uuid]) -> StoreResult<Task> {
        let mut inner = self.inner.lock().await;
        if !inner.gardens.iter().any(|g| g.id == data.garden_id) {
            return Err(StoreError::MissingReference("tasks_garden_id_fkey".to_string()));
        }
        for user_id in assignees {
            inner.require_user(*user_id, "task_assignees")?;
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            garden_id: data.garden_id,
            title: data.title,
            description: data.description,
            task_type: data.task_type,
            custom_type_id: data.custom_type_id,
            created_by: data.created_by,
            status: TaskStatus::Pending,
            due_date: data.due_date,
            is_recurring: data.is_recurring,
            recurrence_period: data.recurrence_period,
            recurrence_end_date: data.recurrence_end_date,
            parent_task_id: data.parent_task_id,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.tasks.push(task.clone());
        for user_id in assignees {
            if !inner.assignees.contains(&(task.id, *user_id)) {
                inner.assignees.push((task.id, *user_id));
            }
        }
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self
            .inner
            .lock()
            .await
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn set_task_status(&self, id: Uuid, status: TaskStatus) -> StoreResult<Option<Task>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.tasks.iter_mut().find(|t| t.id == id).map(|task| {
            let now = Utc::now();
            task.status = status;
            if status == TaskStatus::Completed {
                task.completed_at = Some(now);
            }
            task.updated_at = now;
            task.clone()
        }))
    }

    async fn task_assignees(&self, task_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .inner
            .lock()
            .await
            .assignees
            .iter()
            .filter(|(t, _)| *t == task_id)
            .map(|(_, u)| *u)
            .collect())
    }

    async fn add_task_assignee(&self, task_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        inner.require_user(user_id, "task_assignees")?;
        if !inner.tasks.iter().any(|t| t.id == task_id) {
            return Err(StoreError::MissingReference(
                "task_assignees_task_id_fkey".to_string(),
            ));
        }
        if inner.assignees.contains(&(task_id, user_id)) {
            return Ok(false);
        }
        inner.assignees.push((task_id, user_id));
        Ok(true)
    }

    async fn recurring_templates(&self) -> StoreResult<Vec<Task>> {
        Ok(self
            .inner
            .lock()
            .await
            .tasks
            .iter()
            .filter(|t| t.is_template())
            .cloned()
            .collect())
    }

    async fn latest_instance(&self, template_id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self
            .inner
            .lock()
            .await
            .tasks
            .iter()
            .rev()
            .find(|t| t.parent_task_id == Some(template_id))
            .cloned())
    }

    async fn instance_exists_on(&self, template_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        Ok(self.inner.lock().await.tasks.iter().any(|t| {
            t.parent_task_id == Some(template_id)
                && t.due_date.map(|d| d.date_naive()) == Some(date)
        }))
    }

    async fn open_tasks_due_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<Task>> {
        let inner = self.inner.lock().await;
        let mut due: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|t| t.status.is_open())
            .filter(|t| t.due_date.map_or(false, |d| d > from && d <= to))
            .cloned()
            .collect();
        due.sort_by_key(|t| t.due_date);
        Ok(due)
    }

    async fn insert_post(&self, data: CreatePost) -> StoreResult<ForumPost> {
        let mut inner = self.inner.lock().await;
        inner.require_user(data.author_id, "forum_posts_author")?;
        let now = Utc::now();
        let (image, image_mime) = match data.image {
            Some((bytes, mime)) => (Some(bytes), Some(mime)),
            None => (None, None),
        };
        let post = ForumPost {
            id: Uuid::new_v4(),
            author_id: data.author_id,
            title: data.title,
            content: data.content,
            state: ContentState::Active,
            image,
            image_mime,
            best_answer_id: None,
            created_at: now,
            updated_at: now,
        };
        inner.posts.push(post.clone());
        Ok(post)
    }

    async fn insert_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        let mut inner = self.inner.lock().await;
        inner.require_user(data.author_id, "comments_author")?;
        if !inner.posts.iter().any(|p| p.id == data.post_id) {
            return Err(StoreError::MissingReference("comments_post_id_fkey".to_string()));
        }
        let now = Utc::now();
        let (image, image_mime) = match data.image {
            Some((bytes, mime)) => (Some(bytes), Some(mime)),
            None => (None, None),
        };
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: data.post_id,
            author_id: data.author_id,
            content: data.content,
            state: ContentState::Active,
            image,
            image_mime,
            created_at: now,
            updated_at: now,
        };
        inner.comments.push(comment.clone());
        Ok(comment)
    }

    async fn get_post(&self, id: Uuid) -> StoreResult<Option<ForumPost>> {
        Ok(self
            .inner
            .lock()
            .await
            .posts
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn get_comment(&self, id: Uuid) -> StoreResult<Option<Comment>> {
        Ok(self
            .inner
            .lock()
            .await
            .comments
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn set_post_state(&self, id: Uuid, state: ContentState) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        Ok(match inner.posts.iter_mut().find(|p| p.id == id) {
            Some(post) => {
                post.state = state;
                post.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_comment_state(&self, id: Uuid, state: ContentState) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        Ok(match inner.comments.iter_mut().find(|c| c.id == id) {
            Some(comment) => {
                comment.state = state;
                comment.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn remove_user_content(&self, user_id: Uuid) -> StoreResult<(u64, u64)> {
        let mut inner = self.inner.lock().await;
        let mut posts = 0;
        for post in inner
            .posts
            .iter_mut()
            .filter(|p| p.author_id == user_id && p.state == ContentState::Active)
        {
            post.state = ContentState::Removed;
            posts += 1;
        }
        let mut comments = 0;
        for comment in inner
            .comments
            .iter_mut()
            .filter(|c| c.author_id == user_id && c.state == ContentState::Active)
        {
            comment.state = ContentState::Removed;
            comments += 1;
        }
        Ok((posts, comments))
    }

    async fn insert_report(&self, data: CreateReport) -> StoreResult<Report> {
        let mut inner = self.inner.lock().await;
        inner.require_user(data.reporter_id, "reports_reporter")?;
        if inner.reports.iter().any(|r| {
            r.reporter_id == data.reporter_id
                && r.target_kind == data.target_kind
                && r.target_id == data.target_id
        }) {
            return Err(StoreError::Conflict(
                "reports_reporter_id_target_kind_target_id_key".to_string(),
            ));
        }
        let report = Report {
            id: Uuid::new_v4(),
            reporter_id: data.reporter_id,
            reported_user_id: data.reported_user_id,
            target_kind: data.target_kind,
            target_id: data.target_id,
            reason: data.reason,
            description: data.description,
            reviewed: false,
            is_valid: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
        };
        inner.reports.push(report.clone());
        Ok(report)
    }

    async fn get_report(&self, id: Uuid) -> StoreResult<Option<Report>> {
        Ok(self
            .inner
            .lock()
            .await
            .reports
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn mark_report_reviewed(
        &self,
        id: Uuid,
        is_valid: bool,
        reviewer_id: Uuid,
    ) -> StoreResult<Option<Report>> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .reports
            .iter_mut()
            .find(|r| r.id == id && !r.reviewed)
            .map(|report| {
                report.reviewed = true;
                report.is_valid = Some(is_valid);
                report.reviewed_by = Some(reviewer_id);
                report.reviewed_at = Some(Utc::now());
                report.clone()
            }))
    }

    async fn insert_event(&self, data: CreateGardenEvent) -> StoreResult<GardenEvent> {
        let mut inner = self.inner.lock().await;
        if !inner.gardens.iter().any(|g| g.id == data.garden_id) {
            return Err(StoreError::MissingReference("garden_events_garden_id_fkey".to_string()));
        }
        let now = Utc::now();
        let event = GardenEvent {
            id: Uuid::new_v4(),
            garden_id: data.garden_id,
            created_by: Some(data.created_by),
            title: data.title,
            description: data.description,
            visibility: data.visibility,
            starts_at: data.starts_at,
            created_at: now,
            updated_at: now,
        };
        inner.events.push(event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: Uuid) -> StoreResult<Option<GardenEvent>> {
        Ok(self
            .inner
            .lock()
            .await
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn upsert_attendance(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        status: AttendanceStatus,
    ) -> StoreResult<EventAttendance> {
        let mut inner = self.inner.lock().await;
        inner.require_user(user_id, "event_attendances")?;
        let now = Utc::now();
        if let Some(existing) = inner
            .attendances
            .iter_mut()
            .find(|a| a.event_id == event_id && a.user_id == user_id)
        {
            existing.status = status;
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let attendance = EventAttendance {
            event_id,
            user_id,
            status,
            created_at: now,
            updated_at: now,
        };
        inner.attendances.push(attendance.clone());
        Ok(attendance)
    }

    async fn start_job_run(&self, job_name: &str) -> StoreResult<JobRun> {
        let run = JobRun {
            id: Uuid::new_v4(),
            job_name: job_name.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            success: None,
            summary: None,
        };
        self.inner.lock().await.job_runs.push(run.clone());
        Ok(run)
    }

    async fn finish_job_run(&self, id: Uuid, success: bool, summary: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(run) = inner.job_runs.iter_mut().find(|r| r.id == id) {
            run.finished_at = Some(Utc::now());
            run.success = Some(success);
            run.summary = Some(summary.to_string());
        }
        Ok(())
    }

    async fn delete_job_runs_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let before = inner.job_runs.len();
        inner.job_runs.retain(|r| r.started_at >= cutoff);
        Ok((before - inner.job_runs.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_duplicate_membership_is_conflict() {
        let store = MemoryStore::new();
        let user = store.seed_user("Ana").await;
        let garden = store
            .insert_garden(CreateGarden {
                name: "Plot".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let data = CreateMembership {
            user_id: user,
            garden_id: garden.id,
            role: MembershipRole::Worker,
            status: MembershipStatus::Pending,
        };
        store.insert_membership(data.clone()).await.unwrap();
        let err = store.insert_membership(data).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_garden_cascades() {
        let store = MemoryStore::new();
        let user = store.seed_user("Ana").await;
        let garden = store
            .insert_garden(CreateGarden {
                name: "Plot".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .insert_membership(CreateMembership {
                user_id: user,
                garden_id: garden.id,
                role: MembershipRole::Manager,
                status: MembershipStatus::Accepted,
            })
            .await
            .unwrap();
        store
            .insert_task(
                CreateTask {
                    garden_id: garden.id,
                    title: "Weed".into(),
                    ..Default::default()
                },
                &[user],
            )
            .await
            .unwrap();

        assert!(store.delete_garden(garden.id).await.unwrap());
        assert!(store.garden_memberships(garden.id).await.unwrap().is_empty());
        assert!(store.tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_user_badge_insert_is_idempotent() {
        let store = MemoryStore::with_badge_catalog().await;
        let user = store.seed_user("Ana").await;
        let badge = store.badge_by_key("welcome").await.unwrap().unwrap();

        assert!(store.insert_user_badge(user, badge.id).await.unwrap().is_some());
        assert!(store.insert_user_badge(user, badge.id).await.unwrap().is_none());
        assert_eq!(store.user_badge_rows().await, 1);
    }

    #[tokio::test]
    async fn test_job_run_cleanup_cutoff() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.seed_job_run("old", now - chrono::Duration::days(8)).await;
        store.seed_job_run("recent", now - chrono::Duration::days(1)).await;

        let removed = store
            .delete_job_runs_before(now - chrono::Duration::days(7))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.job_runs().await[0].job_name, "recent");
    }
}
