/// Scheduled jobs
///
/// Each job is a plain async function over the store and services so it can
/// be run from tests without the scheduler. [`JobContext::run`] dispatches a
/// [`JobKind`] and returns a one-line summary for the job log.

pub mod cleanup;
pub mod recurring;
pub mod reminders;
pub mod weather_alerts;

use chrono::{DateTime, Utc};
use gardenhub_shared::error::DomainResult;
use gardenhub_shared::services::Services;
use std::sync::Arc;

use weather_alerts::WeatherAlertJob;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    DeadlineReminders,
    RecurringTasks,
    WeatherAlerts,
    JobRunCleanup,
}

impl JobKind {
    pub const ALL: [JobKind; 4] = [
        JobKind::DeadlineReminders,
        JobKind::RecurringTasks,
        JobKind::WeatherAlerts,
        JobKind::JobRunCleanup,
    ];

    /// Name recorded in the job log
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::DeadlineReminders => "deadline_reminders",
            JobKind::RecurringTasks => "recurring_tasks",
            JobKind::WeatherAlerts => "weather_alerts",
            JobKind::JobRunCleanup => "job_run_cleanup",
        }
    }

    /// Cron expression (UTC, seconds first)
    pub fn schedule(&self) -> &'static str {
        match self {
            JobKind::DeadlineReminders => "0 0 8 * * *",
            JobKind::RecurringTasks => "0 5 0 * * *",
            JobKind::WeatherAlerts => "0 0 18 * * *",
            JobKind::JobRunCleanup => "0 0 3 * * Mon",
        }
    }
}

/// Everything a job needs
#[derive(Clone)]
pub struct JobContext {
    pub services: Services,
    pub weather: Arc<WeatherAlertJob>,
    pub recurring_dry_run: bool,
}

impl JobContext {
    pub async fn run(&self, kind: JobKind, now: DateTime<Utc>) -> DomainResult<String> {
        let store = self.services.store.as_ref();
        match kind {
            JobKind::DeadlineReminders => {
                let sent =
                    reminders::send_deadline_reminders(store, &self.services.dispatcher, now).await?;
                Ok(format!("sent {sent} reminders"))
            }
            JobKind::RecurringTasks => {
                let summary = recurring::generate_recurring_task_instances(
                    store,
                    &self.services.tasks,
                    now,
                    self.recurring_dry_run,
                )
                .await?;
                Ok(summary.to_string())
            }
            JobKind::WeatherAlerts => {
                let sent = self.weather.check_weather_and_notify().await?;
                Ok(format!("sent {sent} weather alerts"))
            }
            JobKind::JobRunCleanup => {
                let deleted = cleanup::cleanup_job_runs(store, now).await?;
                Ok(format!("deleted {deleted} job runs"))
            }
        }
    }
}
