/// Scheduled-job execution log
///
/// The worker opens a row when a job starts and closes it with the outcome.
/// A weekly cleanup job prunes old rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRun {
    pub id: Uuid,
    pub job_name: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// None while the job is still running
    pub success: Option<bool>,
    pub summary: Option<String>,
}

impl JobRun {
    /// Opens a run record
    pub async fn start(pool: &PgPool, job_name: &str) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, JobRun>(
            "INSERT INTO job_runs (job_name) VALUES ($1)
             RETURNING id, job_name, started_at, finished_at, success, summary",
        )
        .bind(job_name)
        .fetch_one(pool)
        .await
    }

    /// Closes a run record with its outcome
    pub async fn finish(
        pool: &PgPool,
        id: Uuid,
        success: bool,
        summary: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE job_runs SET finished_at = NOW(), success = $2, summary = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(success)
        .bind(summary)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Deletes runs started before `cutoff`; returns the number removed
    pub async fn delete_started_before(
        pool: &PgPool,
        cutoff: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM job_runs WHERE started_at < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
