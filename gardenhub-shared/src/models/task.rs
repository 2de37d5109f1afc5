/// Garden task model and database operations
///
/// Tasks belong to a garden and carry a status that moves through a fixed
/// transition table (see [`TaskStatus::can_transition_to`]). Recurring
/// tasks are templates: `is_recurring = true` and `parent_task_id IS NULL`.
/// The worker materializes dated, non-recurring instances that point back
/// at their template.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM (
///     'pending', 'accepted', 'declined', 'in_progress', 'completed', 'cancelled'
/// );
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     garden_id UUID NOT NULL REFERENCES gardens(id) ON DELETE CASCADE,
///     title VARCHAR(200) NOT NULL,
///     task_type task_type NOT NULL DEFAULT 'maintenance',
///     custom_type_id UUID REFERENCES custom_task_types(id) ON DELETE SET NULL,
///     status task_status NOT NULL DEFAULT 'pending',
///     due_date TIMESTAMPTZ,
///     is_recurring BOOLEAN NOT NULL DEFAULT FALSE,
///     recurrence_period VARCHAR(16),
///     recurrence_end_date TIMESTAMPTZ,
///     parent_task_id UUID REFERENCES tasks(id) ON DELETE CASCADE,
///     ...
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use gardenhub_shared::models::task::{Task, CreateTask, TaskType};
/// use uuid::Uuid;
/// # use sqlx::PgPool;
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     garden_id: Uuid::new_v4(),
///     title: "Water the tomatoes".to_string(),
///     task_type: TaskType::Watering,
///     ..Default::default()
/// }, &[]).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Built-in task types plus `Custom`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Watering,
    Weeding,
    Planting,
    Harvesting,
    Pruning,
    Fertilizing,
    Maintenance,

    /// Garden-defined type; `custom_type_id` must be set
    Custom,
}

impl TaskType {
    /// Whether tasks of this type must reference a custom task type
    pub fn requires_custom_type(&self) -> bool {
        matches!(self, TaskType::Custom)
    }
}

impl Default for TaskType {
    fn default() -> Self {
        TaskType::Maintenance
    }
}

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, waiting for an assignee to respond
    Pending,

    /// Acknowledged but not started
    Accepted,

    /// Turned down by the assignee
    Declined,

    /// Being worked on
    InProgress,

    /// Done
    Completed,

    /// Withdrawn by a manager or the creator
    Cancelled,
}

impl TaskStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Accepted => "accepted",
            TaskStatus::Declined => "declined",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Checks if status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Whether the task still needs doing (deadline reminders apply)
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            TaskStatus::Pending | TaskStatus::Accepted | TaskStatus::InProgress
        )
    }

    /// Checks if transition to target status is valid
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        match (self, target) {
            // Pending can be picked up, turned down, or withdrawn
            (TaskStatus::Pending, TaskStatus::Accepted) => true,
            (TaskStatus::Pending, TaskStatus::InProgress) => true,
            (TaskStatus::Pending, TaskStatus::Declined) => true,
            (TaskStatus::Pending, TaskStatus::Cancelled) => true,

            (TaskStatus::Accepted, TaskStatus::InProgress) => true,
            (TaskStatus::Accepted, TaskStatus::Declined) => true,
            (TaskStatus::Accepted, TaskStatus::Cancelled) => true,

            // Reassignment reopens a declined task
            (TaskStatus::Declined, TaskStatus::Pending) => true,
            (TaskStatus::Declined, TaskStatus::InProgress) => true,
            (TaskStatus::Declined, TaskStatus::Cancelled) => true,

            // Only work in progress can be completed
            (TaskStatus::InProgress, TaskStatus::Completed) => true,
            (TaskStatus::InProgress, TaskStatus::Cancelled) => true,

            _ => false,
        }
    }
}

/// Recurrence period of a task template
///
/// Stored as free text; unknown values fall back to a one-day offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurrencePeriod {
    /// Converts period to its stored form
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrencePeriod::Daily => "daily",
            RecurrencePeriod::Weekly => "weekly",
            RecurrencePeriod::Monthly => "monthly",
            RecurrencePeriod::Yearly => "yearly",
        }
    }

    /// Parses a stored period (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(RecurrencePeriod::Daily),
            "weekly" => Some(RecurrencePeriod::Weekly),
            "monthly" => Some(RecurrencePeriod::Monthly),
            "yearly" => Some(RecurrencePeriod::Yearly),
            _ => None,
        }
    }

    /// Fixed offset between two instances
    pub fn offset(&self) -> Duration {
        match self {
            RecurrencePeriod::Daily => Duration::days(1),
            RecurrencePeriod::Weekly => Duration::days(7),
            RecurrencePeriod::Monthly => Duration::days(30),
            RecurrencePeriod::Yearly => Duration::days(365),
        }
    }

    /// Offset for a stored period string, defaulting to one day
    pub fn offset_for(stored: Option<&str>) -> Duration {
        stored
            .and_then(RecurrencePeriod::from_str)
            .map(|p| p.offset())
            .unwrap_or_else(|| Duration::days(1))
    }
}

/// Garden task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub garden_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub custom_type_id: Option<Uuid>,

    /// Creator (nullable if the user was deleted)
    pub created_by: Option<Uuid>,

    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,

    pub is_recurring: bool,
    pub recurrence_period: Option<String>,
    pub recurrence_end_date: Option<DateTime<Utc>>,

    /// Template this instance was generated from
    pub parent_task_id: Option<Uuid>,

    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Recurring template (not an instance)
    pub fn is_template(&self) -> bool {
        self.is_recurring && self.parent_task_id.is_none()
    }
}

/// Input for creating a task
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTask {
    pub garden_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub custom_type_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub recurrence_period: Option<String>,
    pub recurrence_end_date: Option<DateTime<Utc>>,
    pub parent_task_id: Option<Uuid>,
}

const TASK_COLUMNS: &str = "id, garden_id, title, description, task_type, custom_type_id, \
     created_by, status, due_date, is_recurring, recurrence_period, recurrence_end_date, \
     parent_task_id, completed_at, created_at, updated_at";

impl Task {
    /// Creates a task and its assignee rows in one transaction
    pub async fn create(
        pool: &PgPool,
        data: CreateTask,
        assignees: &[Uuid],
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let task = sqlx::query_as::<_, Task>(&format!(
            "INSERT INTO tasks
                (garden_id, title, description, task_type, custom_type_id, created_by, due_date,
                 is_recurring, recurrence_period, recurrence_end_date, parent_task_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(data.garden_id)
        .bind(&data.title)
        .bind(&data.description)
        .bind(data.task_type)
        .bind(data.custom_type_id)
        .bind(data.created_by)
        .bind(data.due_date)
        .bind(data.is_recurring)
        .bind(&data.recurrence_period)
        .bind(data.recurrence_end_date)
        .bind(data.parent_task_id)
        .fetch_one(&mut *tx)
        .await?;

        for user_id in assignees {
            sqlx::query(
                "INSERT INTO task_assignees (task_id, user_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(task.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the tasks of a garden, soonest due first
    pub async fn list_by_garden(
        pool: &PgPool,
        garden_id: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE garden_id = $1 AND ($2::task_status IS NULL OR status = $2)
             ORDER BY due_date ASC NULLS LAST, created_at DESC"
        ))
        .bind(garden_id)
        .bind(status)
        .fetch_all(pool)
        .await
    }

    /// Updates the status, stamping `completed_at` on completion
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "UPDATE tasks
             SET status = $2,
                 completed_at = CASE WHEN $2 = 'completed'::task_status THEN NOW() ELSE completed_at END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    /// Lists the assignee user IDs of a task
    pub async fn assignees(pool: &PgPool, task_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM task_assignees WHERE task_id = $1 ORDER BY assigned_at, user_id",
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Adds an assignee; returns false if already assigned
    pub async fn add_assignee(
        pool: &PgPool,
        task_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO task_assignees (task_id, user_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(task_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Lists all recurring templates
    pub async fn recurring_templates(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE is_recurring AND parent_task_id IS NULL
             ORDER BY created_at"
        ))
        .fetch_all(pool)
        .await
    }

    /// Most recently created instance of a template
    pub async fn latest_instance(
        pool: &PgPool,
        template_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE parent_task_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(template_id)
        .fetch_optional(pool)
        .await
    }

    /// Whether the template already has an instance due on `date` (UTC)
    pub async fn instance_exists_on(
        pool: &PgPool,
        template_id: Uuid,
        date: NaiveDate,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (
                SELECT 1 FROM tasks
                WHERE parent_task_id = $1 AND (due_date AT TIME ZONE 'UTC')::date = $2
            )",
        )
        .bind(template_id)
        .bind(date)
        .fetch_one(pool)
        .await
    }

    /// Open tasks due in `(from, to]`
    pub async fn open_due_between(
        pool: &PgPool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE due_date > $1 AND due_date <= $2
               AND status IN ('pending', 'accepted', 'in_progress')
             ORDER BY due_date"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transition_table() {
        use TaskStatus::*;

        assert!(Pending.can_transition_to(InProgress));
        assert!(Pending.can_transition_to(Declined));
        assert!(Accepted.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Declined.can_transition_to(Pending));

        // completion requires work in progress
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Accepted.can_transition_to(Completed));
        assert!(!Declined.can_transition_to(Completed));

        for terminal in [Completed, Cancelled] {
            assert!(terminal.is_terminal());
            for target in [Pending, Accepted, Declined, InProgress, Completed, Cancelled] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn test_open_statuses() {
        assert!(TaskStatus::Pending.is_open());
        assert!(TaskStatus::InProgress.is_open());
        assert!(!TaskStatus::Declined.is_open());
        assert!(!TaskStatus::Completed.is_open());
    }

    #[test]
    fn test_period_offsets() {
        assert_eq!(RecurrencePeriod::Daily.offset(), Duration::days(1));
        assert_eq!(RecurrencePeriod::Weekly.offset(), Duration::days(7));
        assert_eq!(RecurrencePeriod::Monthly.offset(), Duration::days(30));
        assert_eq!(RecurrencePeriod::Yearly.offset(), Duration::days(365));
    }

    #[test]
    fn test_unknown_period_defaults_to_one_day() {
        assert_eq!(RecurrencePeriod::offset_for(Some("fortnightly")), Duration::days(1));
        assert_eq!(RecurrencePeriod::offset_for(None), Duration::days(1));
        assert_eq!(RecurrencePeriod::offset_for(Some("WEEKLY")), Duration::days(7));
    }

    #[test]
    fn test_status_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_custom_type_requirement() {
        assert!(TaskType::Custom.requires_custom_type());
        assert!(!TaskType::Watering.requires_custom_type());
    }
}
