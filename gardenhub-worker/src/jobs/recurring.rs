/// Recurring task generation
///
/// Every recurring template (`is_recurring` and no parent) gets its next
/// instance once that instance is due within a day. The reference point is
/// the due date of the template's latest instance, falling back to the
/// template's own due date. At most one instance per template per calendar
/// day (UTC) is ever created, so reruns are harmless.

use chrono::{DateTime, Duration, Utc};
use gardenhub_shared::error::DomainResult;
use gardenhub_shared::models::task::{RecurrencePeriod, Task};
use gardenhub_shared::store::Store;
use gardenhub_shared::tasks::TaskService;
use std::fmt;
use tracing::{debug, info, warn};

/// Instances are created this far ahead of their due date
pub fn lookahead() -> Duration {
    Duration::days(1)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecurringSummary {
    pub templates_scanned: usize,
    pub created: usize,
    pub skipped: usize,
}

impl fmt::Display for RecurringSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scanned {} templates, created {}, skipped {}",
            self.templates_scanned, self.created, self.skipped
        )
    }
}

enum Decision {
    Create(DateTime<Utc>),
    Skip(&'static str),
}

pub async fn generate_recurring_task_instances(
    store: &dyn Store,
    tasks: &TaskService,
    now: DateTime<Utc>,
    dry_run: bool,
) -> DomainResult<RecurringSummary> {
    let templates = store.recurring_templates().await?;
    let mut summary = RecurringSummary {
        templates_scanned: templates.len(),
        ..Default::default()
    };

    for template in &templates {
        let decision = match next_instance(store, template, now).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!(template_id = %template.id, error = %e, "Failed to evaluate template");
                summary.skipped += 1;
                continue;
            }
        };

        match decision {
            Decision::Skip(reason) => {
                debug!(template_id = %template.id, reason, "Template skipped");
                summary.skipped += 1;
            }
            Decision::Create(due) if dry_run => {
                info!(template_id = %template.id, %due, "Dry run: would create instance");
                summary.created += 1;
            }
            Decision::Create(due) => match tasks.create_instance(template, due).await {
                Ok(instance) => {
                    info!(template_id = %template.id, task_id = %instance.id, %due, "Created recurring instance");
                    summary.created += 1;
                }
                Err(e) => {
                    warn!(template_id = %template.id, error = %e, "Failed to create instance");
                    summary.skipped += 1;
                }
            },
        }
    }

    info!(%summary, dry_run, "Recurring generation finished");
    Ok(summary)
}

async fn next_instance(store: &dyn Store, template: &Task, now: DateTime<Utc>) -> DomainResult<Decision> {
    if template.recurrence_end_date.map_or(false, |end| end < now) {
        return Ok(Decision::Skip("recurrence ended"));
    }

    let reference = match store.latest_instance(template.id).await? {
        Some(instance) => instance.due_date,
        None => template.due_date,
    };
    let Some(reference) = reference else {
        warn!(template_id = %template.id, "Recurring template has no due date");
        return Ok(Decision::Skip("no reference date"));
    };

    let next_due = reference + RecurrencePeriod::offset_for(template.recurrence_period.as_deref());
    if next_due > now + lookahead() {
        return Ok(Decision::Skip("not due yet"));
    }
    if store.instance_exists_on(template.id, next_due.date_naive()).await? {
        return Ok(Decision::Skip("instance exists"));
    }

    Ok(Decision::Create(next_due))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use gardenhub_shared::events::EventBus;
    use gardenhub_shared::models::garden::CreateGarden;
    use gardenhub_shared::models::task::{CreateTask, TaskStatus};
    use gardenhub_shared::store::memory::MemoryStore;
    use std::sync::Arc;
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 9, 0, 0).unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        tasks: TaskService,
        garden_id: Uuid,
        owner: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let owner = store.seed_user("Ada").await;
        let garden = store
            .insert_garden(CreateGarden {
                name: "Allotment".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let tasks = TaskService::new(store.clone(), Arc::new(EventBus::new()));
        Fixture {
            store,
            tasks,
            garden_id: garden.id,
            owner,
        }
    }

    async fn template(f: &Fixture, period: &str, due: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Task {
        f.store
            .insert_task(
                CreateTask {
                    garden_id: f.garden_id,
                    title: "Water the beds".to_string(),
                    created_by: Some(f.owner),
                    due_date: Some(due),
                    is_recurring: true,
                    recurrence_period: Some(period.to_string()),
                    recurrence_end_date: end,
                    ..Default::default()
                },
                &[f.owner],
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_weekly_template_creates_one_instance_per_day() {
        let f = fixture().await;
        let template = template(&f, "weekly", at(2023, 12, 25), None).await;
        f.tasks.create_instance(&template, at(2024, 1, 1)).await.unwrap();

        let now = at(2024, 1, 7);
        let summary = generate_recurring_task_instances(f.store.as_ref(), &f.tasks, now, false)
            .await
            .unwrap();
        assert_eq!(summary.created, 1);

        let instances: Vec<Task> = f
            .store
            .tasks()
            .await
            .into_iter()
            .filter(|t| t.parent_task_id == Some(template.id))
            .collect();
        assert_eq!(instances.len(), 2);
        let newest = &instances[1];
        assert_eq!(newest.due_date, Some(at(2024, 1, 8)));
        assert_eq!(newest.status, TaskStatus::Pending);
        assert!(!newest.is_recurring);
        assert_eq!(f.store.task_assignees(newest.id).await.unwrap(), vec![f.owner]);

        let rerun = generate_recurring_task_instances(f.store.as_ref(), &f.tasks, now, false)
            .await
            .unwrap();
        assert_eq!(rerun.created, 0);
        assert_eq!(rerun.skipped, 1);
    }

    #[tokio::test]
    async fn test_first_instance_uses_template_due_date() {
        let f = fixture().await;
        template(&f, "daily", at(2024, 3, 1), None).await;

        let summary = generate_recurring_task_instances(f.store.as_ref(), &f.tasks, at(2024, 3, 1), false)
            .await
            .unwrap();
        assert_eq!(summary.created, 1);
        assert!(f
            .store
            .tasks()
            .await
            .iter()
            .any(|t| t.due_date == Some(at(2024, 3, 2)) && t.parent_task_id.is_some()));
    }

    #[tokio::test]
    async fn test_ended_and_future_templates_are_skipped() {
        let f = fixture().await;
        template(&f, "weekly", at(2024, 1, 1), Some(at(2024, 1, 5))).await;
        template(&f, "monthly", at(2024, 1, 6), None).await;

        let summary = generate_recurring_task_instances(f.store.as_ref(), &f.tasks, at(2024, 1, 7), false)
            .await
            .unwrap();
        assert_eq!(
            summary,
            RecurringSummary {
                templates_scanned: 2,
                created: 0,
                skipped: 2
            }
        );
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let f = fixture().await;
        template(&f, "daily", at(2024, 5, 1), None).await;
        let before = f.store.tasks().await.len();

        let summary = generate_recurring_task_instances(f.store.as_ref(), &f.tasks, at(2024, 5, 1), true)
            .await
            .unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(f.store.tasks().await.len(), before);
    }

    #[tokio::test]
    async fn test_unknown_period_defaults_to_daily() {
        let f = fixture().await;
        template(&f, "fortnightly", at(2024, 5, 1), None).await;

        generate_recurring_task_instances(f.store.as_ref(), &f.tasks, at(2024, 5, 1), false)
            .await
            .unwrap();
        assert!(f
            .store
            .tasks()
            .await
            .iter()
            .any(|t| t.parent_task_id.is_some() && t.due_date == Some(at(2024, 5, 2))));
    }
}
