//! Scheduler tests over the in-memory store
//!
//! Run with: cargo test -p gardenhub-worker --test scheduler_tests

use async_trait::async_trait;
use chrono::{Duration, Utc};
use gardenhub_shared::notify::NoopPushGateway;
use gardenhub_shared::services::Services;
use gardenhub_shared::store::memory::MemoryStore;
use gardenhub_worker::jobs::weather_alerts::WeatherAlertJob;
use gardenhub_worker::jobs::{JobContext, JobKind};
use gardenhub_worker::scheduler::{run_guarded, RunOutcome, WorkerScheduler};
use gardenhub_worker::weather::{Coordinates, DailyForecast, ForecastProvider, Geocoder, WeatherError};
use std::sync::Arc;
use tokio::sync::Mutex;

struct NoGeocoder;

#[async_trait]
impl Geocoder for NoGeocoder {
    async fn geocode(&self, _location: &str) -> Result<Option<Coordinates>, WeatherError> {
        Ok(None)
    }
}

struct NoForecast;

#[async_trait]
impl ForecastProvider for NoForecast {
    async fn daily(&self, _at: Coordinates) -> Result<Vec<DailyForecast>, WeatherError> {
        Ok(vec![])
    }
}

fn context(store: Arc<MemoryStore>) -> JobContext {
    let services = Services::build(store, Arc::new(NoopPushGateway));
    let weather = WeatherAlertJob::new(
        services.store.clone(),
        services.dispatcher.clone(),
        Arc::new(NoGeocoder),
        Arc::new(NoForecast),
    );
    JobContext {
        services,
        weather: Arc::new(weather),
        recurring_dry_run: false,
    }
}

#[tokio::test]
async fn test_run_is_recorded_in_job_log() {
    let store = Arc::new(MemoryStore::new());
    let scheduler = WorkerScheduler::new(context(store.clone()));

    let outcome = scheduler.trigger(JobKind::DeadlineReminders).await;
    assert_eq!(outcome, RunOutcome::Succeeded("sent 0 reminders".to_string()));

    let runs = store.job_runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].job_name, "deadline_reminders");
    assert_eq!(runs[0].success, Some(true));
    assert_eq!(runs[0].summary.as_deref(), Some("sent 0 reminders"));
    assert!(runs[0].finished_at.is_some());
}

#[tokio::test]
async fn test_held_guard_skips_tick() {
    let store = Arc::new(MemoryStore::new());
    let context = context(store.clone());
    let guard = Mutex::new(());

    let held = guard.lock().await;
    let outcome = run_guarded(&context, JobKind::WeatherAlerts, &guard).await;
    assert_eq!(outcome, RunOutcome::Skipped);
    assert!(store.job_runs().await.is_empty());

    drop(held);
    let outcome = run_guarded(&context, JobKind::WeatherAlerts, &guard).await;
    assert_eq!(outcome, RunOutcome::Succeeded("sent 0 weather alerts".to_string()));
}

#[tokio::test]
async fn test_cleanup_job_keeps_its_own_run() {
    let store = Arc::new(MemoryStore::new());
    store
        .seed_job_run("recurring_tasks", Utc::now() - Duration::days(9))
        .await;
    let scheduler = WorkerScheduler::new(context(store.clone()));

    let outcome = scheduler.trigger(JobKind::JobRunCleanup).await;
    assert_eq!(outcome, RunOutcome::Succeeded("deleted 1 job runs".to_string()));

    let runs = store.job_runs().await;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].job_name, "job_run_cleanup");
}

#[tokio::test]
async fn test_recurring_job_summary() {
    let store = Arc::new(MemoryStore::new());
    let scheduler = WorkerScheduler::new(context(store));

    let outcome = scheduler.trigger(JobKind::RecurringTasks).await;
    assert_eq!(
        outcome,
        RunOutcome::Succeeded("scanned 0 templates, created 0, skipped 0".to_string())
    );
}
