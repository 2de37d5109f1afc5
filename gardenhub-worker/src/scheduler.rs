/// Cron scheduling of the worker jobs
///
/// Every [`JobKind`] is registered on a `tokio-cron-scheduler` instance with
/// its own `tokio::sync::Mutex`. A tick that finds the mutex held is skipped,
/// so a slow run never overlaps the next one.
///
/// # Example
///
/// ```no_run
/// use gardenhub_worker::jobs::JobContext;
/// use gardenhub_worker::scheduler::WorkerScheduler;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(context: JobContext) -> anyhow::Result<()> {
/// let shutdown = CancellationToken::new();
/// let scheduler = WorkerScheduler::new(context);
/// scheduler.run(shutdown).await?;
/// # Ok(())
/// # }
/// ```

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::jobs::{JobContext, JobKind};

/// Result of one scheduled tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The previous run of the same job was still going
    Skipped,
    Succeeded(String),
    Failed(String),
}

pub struct WorkerScheduler {
    context: Arc<JobContext>,
    guards: HashMap<JobKind, Arc<Mutex<()>>>,
}

impl WorkerScheduler {
    pub fn new(context: JobContext) -> Self {
        let guards = JobKind::ALL
            .iter()
            .map(|kind| (*kind, Arc::new(Mutex::new(()))))
            .collect();
        Self {
            context: Arc::new(context),
            guards,
        }
    }

    /// Runs one job now, honouring the overlap guard
    pub async fn trigger(&self, kind: JobKind) -> RunOutcome {
        match self.guards.get(&kind) {
            Some(guard) => run_guarded(&self.context, kind, guard).await,
            None => RunOutcome::Failed(format!("no guard for {}", kind.name())),
        }
    }

    /// Registers all jobs and runs until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let mut scheduler = JobScheduler::new().await?;

        for kind in JobKind::ALL {
            let context = self.context.clone();
            let guard = self
                .guards
                .get(&kind)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no guard for {}", kind.name()))?;

            let job = Job::new_async(kind.schedule(), move |_uuid, _lock| {
                let context = context.clone();
                let guard = guard.clone();
                Box::pin(async move {
                    run_guarded(&context, kind, &guard).await;
                })
            })?;
            scheduler.add(job).await?;
            info!(job = kind.name(), schedule = kind.schedule(), "Job scheduled");
        }

        scheduler.start().await?;
        info!("Scheduler started");

        shutdown.cancelled().await;
        info!("Stopping scheduler");
        scheduler.shutdown().await?;
        Ok(())
    }
}

/// Runs `kind` unless its guard is held, recording the run in the job log
pub async fn run_guarded(context: &JobContext, kind: JobKind, guard: &Mutex<()>) -> RunOutcome {
    let Ok(_running) = guard.try_lock() else {
        warn!(job = kind.name(), "Previous run still in progress, skipping tick");
        return RunOutcome::Skipped;
    };

    let store = context.services.store.as_ref();
    let run = match store.start_job_run(kind.name()).await {
        Ok(run) => Some(run),
        Err(e) => {
            warn!(job = kind.name(), error = %e, "Failed to record job start");
            None
        }
    };

    info!(job = kind.name(), "Job started");
    let outcome = match context.run(kind, Utc::now()).await {
        Ok(summary) => {
            info!(job = kind.name(), %summary, "Job finished");
            RunOutcome::Succeeded(summary)
        }
        Err(e) => {
            error!(job = kind.name(), error = %e, "Job failed");
            RunOutcome::Failed(e.to_string())
        }
    };

    if let Some(run) = run {
        let (success, summary) = match &outcome {
            RunOutcome::Succeeded(summary) => (true, summary.as_str()),
            RunOutcome::Failed(message) => (false, message.as_str()),
            RunOutcome::Skipped => (false, ""),
        };
        if let Err(e) = store.finish_job_run(run.id, success, summary).await {
            warn!(job = kind.name(), error = %e, "Failed to record job finish");
        }
    }

    outcome
}
