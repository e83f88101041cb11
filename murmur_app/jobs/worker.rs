use std::sync::Arc;

use chrono::Utc;
use tokio::time;
use tracing::{error, info, warn};
use uuid::Uuid;

use murmur_types::errors::{AppError, ApplicationError, DbError, ExecutionError};

use crate::{
    config::Config,
    job_registry::JobRegistry,
    jobs::{Job, JobEvent, JobStatus, backoff},
    uow::{UnitOfWork, UnitOfWorkProvider},
};

/// One polling worker. Claims a job, runs its handler outside any store
/// lock, and writes the resulting transition back. Many workers run
/// concurrently with no coordination beyond the claim protocol.
pub struct JobWorker {
    worker_id: String,
    uow_provider: Arc<dyn UnitOfWorkProvider>,
    registry: Arc<JobRegistry>,
    config: Arc<Config>,
}

impl JobWorker {
    pub fn new(
        uow_provider: Arc<dyn UnitOfWorkProvider>,
        registry: Arc<JobRegistry>,
        config: Arc<Config>,
    ) -> Self {
        let worker_id = format!("worker-{}", &Uuid::new_v4().simple().to_string()[..8]);
        Self {
            worker_id,
            uow_provider,
            registry,
            config,
        }
    }

    /// Run worker loop inside a tokio task.
    pub fn run(self: Arc<Self>) {
        tokio::spawn(async move {
            info!(worker_id = %self.worker_id, "Job worker started");

            loop {
                match self.poll_once().await {
                    // Drained one job; look for the next immediately.
                    Ok(Some(_)) => {}
                    Ok(None) => time::sleep(self.config.idle_poll_interval).await,
                    // Store unavailable or similar: nothing committed, no
                    // job state touched. Back off and retry the claim.
                    Err(e) => {
                        error!(worker_id = %self.worker_id, "Poll cycle failed: {e}");
                        time::sleep(self.config.idle_poll_interval).await;
                    }
                }
            }
        });
    }

    /// One full claim/execute/settle cycle. Returns the processed job id,
    /// or `None` when no eligible work exists.
    pub async fn poll_once(&self) -> Result<Option<Uuid>, ApplicationError> {
        // Claim: one short transaction, committed before the handler runs.
        let uow = self.uow_provider.begin().await?;
        let Some(job) = uow.jobs().claim_next(&self.worker_id).await? else {
            uow.rollback().await?;
            return Ok(None);
        };
        uow.events()
            .append(&JobEvent::transition(
                &job,
                JobStatus::Pending,
                JobStatus::Claimed,
                Some(format!("claimed by {}", self.worker_id)),
            ))
            .await?;
        uow.commit().await?;

        let job_id = job.id;

        // Flag it running before dispatch. Same owner, status change only.
        let uow = self.uow_provider.begin().await?;
        let job = match uow.jobs().mark_running(job_id, &self.worker_id).await {
            Ok(job) => {
                uow.events()
                    .append(&JobEvent::transition(
                        &job,
                        JobStatus::Claimed,
                        JobStatus::Running,
                        None,
                    ))
                    .await?;
                uow.commit().await?;
                job
            }
            Err(e) if is_lease_conflict(&e) => {
                warn!(worker_id = %self.worker_id, %job_id, "Lease lost before execution");
                uow.rollback().await?;
                return Ok(Some(job_id));
            }
            Err(e) => return Err(e),
        };

        // The handler runs with no store lock held; the lease reconciler
        // covers us if this worker dies here.
        let outcome = match self.registry.get(job.job_type) {
            Some(handler) => handler.handle(&job).await,
            None => Err(ExecutionError::fatal(
                AppError::NoJobHandler(job.job_type.to_string()).to_string(),
            )),
        };

        self.settle(&job, outcome).await?;
        Ok(Some(job_id))
    }

    /// Applies the handler outcome as a lifecycle transition. A lease
    /// conflict here means the reconciler already took the job back; the
    /// late write loses and is dropped.
    async fn settle(
        &self,
        job: &Job,
        outcome: Result<Option<serde_json::Value>, ExecutionError>,
    ) -> Result<(), ApplicationError> {
        let uow = self.uow_provider.begin().await?;

        let settled = match &outcome {
            Ok(result) => {
                match uow
                    .jobs()
                    .mark_succeeded(job.id, &self.worker_id, result.clone())
                    .await
                {
                    Ok(updated) => {
                        uow.events()
                            .append(&JobEvent::transition(
                                &updated,
                                JobStatus::Running,
                                JobStatus::Succeeded,
                                None,
                            ))
                            .await?;
                        info!(worker_id = %self.worker_id, job_id = %job.id, "Job succeeded");
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            Err(err) if !err.is_fatal() && job.attempts_remaining() => {
                let delay = backoff::retry_delay(
                    job.attempt_count,
                    self.config.backoff_base,
                    self.config.backoff_cap,
                );
                let available_at = Utc::now()
                    + chrono::Duration::from_std(delay)
                        .map_err(|e| ApplicationError::Unknown(e.to_string()))?;

                match uow
                    .jobs()
                    .schedule_retry(job.id, &self.worker_id, available_at, err.detail())
                    .await
                {
                    Ok(updated) => {
                        uow.events()
                            .append(&JobEvent::transition(
                                &updated,
                                JobStatus::Running,
                                JobStatus::Pending,
                                Some(format!("retry in {}s: {}", delay.as_secs(), err.detail())),
                            ))
                            .await?;
                        warn!(
                            worker_id = %self.worker_id,
                            job_id = %job.id,
                            attempt = job.attempt_count,
                            max_attempts = job.max_attempts,
                            "Job failed, retry in {}s: {}",
                            delay.as_secs(),
                            err.detail()
                        );
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
            Err(err) => {
                match uow
                    .jobs()
                    .mark_dead(job.id, &self.worker_id, err.detail())
                    .await
                {
                    Ok(updated) => {
                        uow.events()
                            .append(&JobEvent::transition(
                                &updated,
                                JobStatus::Running,
                                JobStatus::Dead,
                                Some(err.detail().to_string()),
                            ))
                            .await?;
                        error!(
                            worker_id = %self.worker_id,
                            job_id = %job.id,
                            attempt = job.attempt_count,
                            "Job permanently failed: {}",
                            err.detail()
                        );
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        };

        match settled {
            Ok(()) => uow.commit().await,
            Err(e) if is_lease_conflict(&e) => {
                warn!(
                    worker_id = %self.worker_id,
                    job_id = %job.id,
                    "Lease was reclaimed during execution; dropping late result"
                );
                uow.rollback().await
            }
            Err(e) => Err(e),
        }
    }
}

fn is_lease_conflict(err: &ApplicationError) -> bool {
    matches!(err, ApplicationError::Db(DbError::LeaseExpired(_)))
}
