/// Task workflow
///
/// Creation, assignment and status changes of garden tasks. Every status
/// change is checked against [`TaskStatus::can_transition_to`]; accepting a
/// task puts it straight into progress.
///
/// Who may do what:
///
/// | Operation | Allowed for |
/// |---|---|
/// | create, self-assign | accepted garden members |
/// | accept, decline | assignees |
/// | complete | assignees and garden managers |
/// | assign, cancel | the creator and garden managers |

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::auth::authorization::{require_garden_manager, require_garden_member};
use crate::error::{DomainError, DomainResult};
use crate::events::{DomainEvent, EventBus};
use crate::models::task::{CreateTask, RecurrencePeriod, Task, TaskStatus};
use crate::store::Store;

pub struct TaskService {
    store: Arc<dyn Store>,
    bus: Arc<EventBus>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>, bus: Arc<EventBus>) -> Self {
        Self { store, bus }
    }

    async fn task(&self, task_id: Uuid) -> DomainResult<Task> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("Task".to_string()))
    }

    async fn is_manager(&self, garden_id: Uuid, user_id: Uuid) -> DomainResult<bool> {
        Ok(self
            .store
            .find_membership(user_id, garden_id)
            .await?
            .map_or(false, |m| m.is_active_manager()))
    }

    async fn require_assignee(&self, task: &Task, user_id: Uuid) -> DomainResult<Vec<Uuid>> {
        let assignees = self.store.task_assignees(task.id).await?;
        if !assignees.contains(&user_id) {
            return Err(DomainError::Forbidden("not assigned to this task".to_string()));
        }
        Ok(assignees)
    }

    async fn require_creator_or_manager(&self, task: &Task, user_id: Uuid) -> DomainResult<()> {
        if task.created_by == Some(user_id) || self.is_manager(task.garden_id, user_id).await? {
            return Ok(());
        }
        Err(DomainError::Forbidden(
            "only the creator or a garden manager may do this".to_string(),
        ))
    }

    async fn transition(&self, task: &Task, target: TaskStatus) -> DomainResult<Task> {
        if !task.status.can_transition_to(target) {
            return Err(DomainError::InvalidTransition(format!(
                "task is {}, cannot become {}",
                task.status.as_str(),
                target.as_str()
            )));
        }
        self.store
            .set_task_status(task.id, target)
            .await?
            .ok_or_else(|| DomainError::NotFound("Task".to_string()))
    }

    async fn validate(&self, data: &CreateTask) -> DomainResult<()> {
        if data.title.trim().is_empty() {
            return Err(DomainError::validation("title", "must not be empty"));
        }

        match (data.task_type.requires_custom_type(), data.custom_type_id) {
            (true, None) => {
                return Err(DomainError::validation(
                    "custom_type_id",
                    "required when task_type is custom",
                ))
            }
            (false, Some(_)) => {
                return Err(DomainError::validation(
                    "custom_type_id",
                    "only allowed when task_type is custom",
                ))
            }
            (true, Some(custom_id)) => {
                let belongs = self
                    .store
                    .get_custom_task_type(custom_id)
                    .await?
                    .map_or(false, |t| t.garden_id == data.garden_id);
                if !belongs {
                    return Err(DomainError::validation(
                        "custom_type_id",
                        "unknown task type for this garden",
                    ));
                }
            }
            (false, None) => {}
        }

        if data.is_recurring {
            let period = data.recurrence_period.as_deref().unwrap_or_default();
            if RecurrencePeriod::from_str(period).is_none() {
                return Err(DomainError::validation(
                    "recurrence_period",
                    "must be daily, weekly, monthly or yearly",
                ));
            }
            if data.due_date.is_none() {
                return Err(DomainError::validation(
                    "due_date",
                    "required for recurring tasks",
                ));
            }
        }
        Ok(())
    }

    /// Creates a task (or recurring template) in a garden
    pub async fn create(
        &self,
        actor_id: Uuid,
        data: CreateTask,
        assignees: &[Uuid],
    ) -> DomainResult<Task> {
        require_garden_member(self.store.as_ref(), data.garden_id, actor_id).await?;
        if data.parent_task_id.is_some() {
            return Err(DomainError::validation(
                "parent_task_id",
                "instances are generated from templates",
            ));
        }
        self.validate(&data).await?;

        for assignee in assignees {
            if require_garden_member(self.store.as_ref(), data.garden_id, *assignee)
                .await
                .is_err()
            {
                return Err(DomainError::validation(
                    "assignees",
                    format!("{assignee} is not a member of this garden"),
                ));
            }
        }

        let task = self
            .store
            .insert_task(
                CreateTask {
                    created_by: Some(actor_id),
                    ..data
                },
                assignees,
            )
            .await?;

        info!(task_id = %task.id, garden_id = %task.garden_id, "Task created");
        self.publish_created(&task, assignees.to_vec()).await;
        Ok(task)
    }

    /// Materializes one instance of a recurring template
    ///
    /// The instance copies title, description, garden, type, custom type,
    /// creator and assignees, and starts out pending.
    pub async fn create_instance(&self, template: &Task, due: DateTime<Utc>) -> DomainResult<Task> {
        let assignees = self.store.task_assignees(template.id).await?;
        let instance = self
            .store
            .insert_task(
                CreateTask {
                    garden_id: template.garden_id,
                    title: template.title.clone(),
                    description: template.description.clone(),
                    task_type: template.task_type,
                    custom_type_id: template.custom_type_id,
                    created_by: template.created_by,
                    due_date: Some(due),
                    is_recurring: false,
                    recurrence_period: None,
                    recurrence_end_date: None,
                    parent_task_id: Some(template.id),
                },
                &assignees,
            )
            .await?;

        self.publish_created(&instance, assignees).await;
        Ok(instance)
    }

    async fn publish_created(&self, task: &Task, assignees: Vec<Uuid>) {
        self.bus
            .publish(&DomainEvent::TaskCreated {
                task_id: task.id,
                garden_id: task.garden_id,
                title: task.title.clone(),
                created_by: task.created_by,
                assignees,
            })
            .await;
    }

    /// Assignee takes the task on; it moves to in progress
    pub async fn accept(&self, actor_id: Uuid, task_id: Uuid) -> DomainResult<Task> {
        let task = self.task(task_id).await?;
        self.require_assignee(&task, actor_id).await?;
        self.transition(&task, TaskStatus::InProgress).await
    }

    pub async fn decline(&self, actor_id: Uuid, task_id: Uuid) -> DomainResult<Task> {
        let task = self.task(task_id).await?;
        self.require_assignee(&task, actor_id).await?;
        self.transition(&task, TaskStatus::Declined).await
    }

    /// Marks an in-progress task completed
    pub async fn complete(&self, actor_id: Uuid, task_id: Uuid) -> DomainResult<Task> {
        let task = self.task(task_id).await?;
        let assignees = self.store.task_assignees(task.id).await?;
        if !assignees.contains(&actor_id) && !self.is_manager(task.garden_id, actor_id).await? {
            return Err(DomainError::Forbidden("not assigned to this task".to_string()));
        }

        let completed = self.transition(&task, TaskStatus::Completed).await?;

        self.bus
            .publish(&DomainEvent::TaskCompleted {
                task_id: completed.id,
                title: completed.title.clone(),
                completed_by: actor_id,
                created_by: completed.created_by,
                assignees,
            })
            .await;

        Ok(completed)
    }

    /// Adds an assignee; a declined task is reopened
    pub async fn assign(&self, actor_id: Uuid, task_id: Uuid, user_id: Uuid) -> DomainResult<Task> {
        let task = self.task(task_id).await?;
        self.require_creator_or_manager(&task, actor_id).await?;
        self.add_assignee(task, actor_id, user_id).await
    }

    /// Caller assigns themselves
    pub async fn self_assign(&self, actor_id: Uuid, task_id: Uuid) -> DomainResult<Task> {
        let task = self.task(task_id).await?;
        self.add_assignee(task, actor_id, actor_id).await
    }

    async fn add_assignee(&self, task: Task, actor_id: Uuid, user_id: Uuid) -> DomainResult<Task> {
        if task.status.is_terminal() {
            return Err(DomainError::InvalidTransition(format!(
                "task is {}",
                task.status.as_str()
            )));
        }
        require_garden_member(self.store.as_ref(), task.garden_id, user_id).await?;

        if !self.store.add_task_assignee(task.id, user_id).await? {
            return Err(DomainError::Conflict("already assigned".to_string()));
        }

        let task = if task.status == TaskStatus::Declined {
            self.transition(&task, TaskStatus::Pending).await?
        } else {
            task
        };

        self.bus
            .publish(&DomainEvent::TaskAssigned {
                task_id: task.id,
                title: task.title.clone(),
                assignee_id: user_id,
                assigned_by: actor_id,
            })
            .await;

        Ok(task)
    }

    pub async fn cancel(&self, actor_id: Uuid, task_id: Uuid) -> DomainResult<Task> {
        let task = self.task(task_id).await?;
        self.require_creator_or_manager(&task, actor_id).await?;
        self.transition(&task, TaskStatus::Cancelled).await
    }

    /// Fails unless the caller manages the garden
    pub async fn require_manager(&self, actor_id: Uuid, garden_id: Uuid) -> DomainResult<()> {
        require_garden_manager(self.store.as_ref(), garden_id, actor_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gardens::MembershipService;
    use crate::models::garden::CreateGarden;
    use crate::models::task::TaskType;
    use crate::store::memory::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        tasks: TaskService,
        manager: Uuid,
        worker: Uuid,
        garden_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(EventBus::new());
        let memberships = MembershipService::new(store.clone(), bus.clone());

        let manager = store.seed_user("Ada").await;
        let worker = store.seed_user("Bram").await;
        let garden = memberships
            .create_garden(
                manager,
                CreateGarden {
                    name: "Plot 7".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let request = memberships.request_join(worker, garden.id).await.unwrap();
        memberships.accept(manager, request.id).await.unwrap();

        Fixture {
            store: store.clone(),
            tasks: TaskService::new(store, bus),
            manager,
            worker,
            garden_id: garden.id,
        }
    }

    fn watering(garden_id: Uuid) -> CreateTask {
        CreateTask {
            garden_id,
            title: "Water the beans".to_string(),
            task_type: TaskType::Watering,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_custom_type_required_iff_custom() {
        let f = fixture().await;

        let mut data = watering(f.garden_id);
        data.task_type = TaskType::Custom;
        let err = f.tasks.create(f.manager, data, &[]).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "custom_type_id"));

        let custom = f.store.seed_custom_task_type(f.garden_id, "Beekeeping").await;
        let mut data = watering(f.garden_id);
        data.custom_type_id = Some(custom.id);
        assert!(f.tasks.create(f.manager, data, &[]).await.is_err());

        let mut data = watering(f.garden_id);
        data.task_type = TaskType::Custom;
        data.custom_type_id = Some(custom.id);
        assert!(f.tasks.create(f.manager, data, &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_accept_then_complete() {
        let f = fixture().await;
        let task = f
            .tasks
            .create(f.manager, watering(f.garden_id), &[f.worker])
            .await
            .unwrap();

        let err = f.tasks.complete(f.worker, task.id).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));

        let started = f.tasks.accept(f.worker, task.id).await.unwrap();
        assert_eq!(started.status, TaskStatus::InProgress);

        let done = f.tasks.complete(f.worker, task.id).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_reassigning_declined_task_reopens_it() {
        let f = fixture().await;
        let task = f
            .tasks
            .create(f.manager, watering(f.garden_id), &[f.worker])
            .await
            .unwrap();

        let declined = f.tasks.decline(f.worker, task.id).await.unwrap();
        assert_eq!(declined.status, TaskStatus::Declined);

        let reopened = f.tasks.assign(f.manager, task.id, f.manager).await.unwrap();
        assert_eq!(reopened.status, TaskStatus::Pending);

        let err = f.tasks.self_assign(f.manager, task.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_only_creator_or_manager_cancels() {
        let f = fixture().await;
        let task = f
            .tasks
            .create(f.manager, watering(f.garden_id), &[])
            .await
            .unwrap();

        let err = f.tasks.cancel(f.worker, task.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let cancelled = f.tasks.cancel(f.manager, task.id).await.unwrap();
        assert_eq!(cancelled.status, TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_recurring_template_needs_period_and_due_date() {
        let f = fixture().await;
        let mut data = watering(f.garden_id);
        data.is_recurring = true;
        data.recurrence_period = Some("fortnightly".to_string());
        data.due_date = Some(Utc::now());

        let err = f.tasks.create(f.manager, data, &[]).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { ref field, .. } if field == "recurrence_period"));
    }
}
