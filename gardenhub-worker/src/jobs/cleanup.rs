/// Job log retention
use chrono::{DateTime, Duration, Utc};
use gardenhub_shared::error::DomainResult;
use gardenhub_shared::store::Store;
use tracing::info;

/// Job runs are kept for this many days
pub const JOB_RUN_RETENTION_DAYS: i64 = 7;

/// Deletes job runs started more than a week before `now`
pub async fn cleanup_job_runs(store: &dyn Store, now: DateTime<Utc>) -> DomainResult<u64> {
    let cutoff = now - Duration::days(JOB_RUN_RETENTION_DAYS);
    let deleted = store.delete_job_runs_before(cutoff).await?;
    info!(deleted, %cutoff, "Old job runs deleted");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardenhub_shared::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_keeps_last_week() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.seed_job_run("weather_alerts", now - Duration::days(10)).await;
        store.seed_job_run("weather_alerts", now - Duration::days(8)).await;
        store.seed_job_run("weather_alerts", now - Duration::days(2)).await;

        assert_eq!(cleanup_job_runs(&store, now).await.unwrap(), 2);
        assert_eq!(store.job_runs().await.len(), 1);
    }
}
