/// Deadline reminders for open tasks due within the next 24 hours
use chrono::{DateTime, Duration, Utc};
use gardenhub_shared::error::DomainResult;
use gardenhub_shared::models::notification::NotificationCategory;
use gardenhub_shared::models::task::Task;
use gardenhub_shared::notify::{NotificationDispatcher, Outgoing};
use gardenhub_shared::store::Store;
use tracing::{info, warn};
use uuid::Uuid;

pub fn reminder_window() -> Duration {
    Duration::hours(24)
}

/// Notifies the assignees of every open task due in `(now, now + 24h]`
///
/// Unassigned tasks remind their creator instead. Returns the number of
/// notifications sent.
pub async fn send_deadline_reminders(
    store: &dyn Store,
    dispatcher: &NotificationDispatcher,
    now: DateTime<Utc>,
) -> DomainResult<usize> {
    let due = store
        .open_tasks_due_between(now, now + reminder_window())
        .await?;
    let mut sent = 0;

    for task in &due {
        for recipient in recipients(store, task).await? {
            match dispatcher.send_notification(Some(recipient), reminder(task)).await {
                Ok(Some(_)) => sent += 1,
                Ok(None) => {}
                Err(e) => warn!(task_id = %task.id, %recipient, error = %e, "Failed to send reminder"),
            }
        }
    }

    info!(tasks = due.len(), sent, "Deadline reminders sent");
    Ok(sent)
}

async fn recipients(store: &dyn Store, task: &Task) -> DomainResult<Vec<Uuid>> {
    let assignees = store.task_assignees(task.id).await?;
    if assignees.is_empty() {
        return Ok(task.created_by.into_iter().collect());
    }
    Ok(assignees)
}

fn reminder(task: &Task) -> Outgoing {
    let when = task
        .due_date
        .map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_default();
    Outgoing::new(
        NotificationCategory::Task,
        "Task due soon",
        format!("\"{}\" is due {}", task.title, when),
    )
    .with_link(format!("/tasks/{}", task.id))
}
