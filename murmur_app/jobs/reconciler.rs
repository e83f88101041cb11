use std::sync::Arc;

use chrono::Utc;
use tokio::time;
use tracing::{error, info, warn};

use murmur_types::errors::ApplicationError;

use crate::{
    config::Config,
    jobs::{JobEvent, JobStatus, backoff},
    uow::{UnitOfWork, UnitOfWorkProvider},
};

/// Upper bound on rows released per sweep so one pass cannot hold its
/// transaction open across an unbounded backlog.
const RECLAIM_BATCH: i64 = 100;

/// Recovers jobs whose claiming worker crashed or hung: rows stuck in
/// claimed/running past the lease timeout go back to pending (attempts
/// remaining) or to dead (budget exhausted). The crashed claim counts as a
/// consumed attempt.
pub struct LeaseReconciler {
    uow_provider: Arc<dyn UnitOfWorkProvider>,
    config: Arc<Config>,
}

impl LeaseReconciler {
    pub fn new(uow_provider: Arc<dyn UnitOfWorkProvider>, config: Arc<Config>) -> Self {
        Self {
            uow_provider,
            config,
        }
    }

    /// Run the reconcile loop inside a tokio task.
    pub fn run(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = time::interval(self.config.reconcile_interval);
            info!(
                lease_timeout_secs = self.config.lease_timeout.as_secs(),
                "Lease reconciler started"
            );

            loop {
                interval.tick().await;
                match self.run_once().await {
                    Ok(0) => {}
                    Ok(reclaimed) => info!(reclaimed, "Reclaimed expired leases"),
                    Err(e) => error!("Lease sweep failed: {e}"),
                }
            }
        });
    }

    /// One sweep. All releases and their events commit in a single
    /// transaction; returns how many leases were reclaimed.
    pub async fn run_once(&self) -> Result<usize, ApplicationError> {
        let lease_secs = self.config.lease_timeout.as_secs();
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.lease_timeout)
                .map_err(|e| ApplicationError::Unknown(e.to_string()))?;

        let uow = self.uow_provider.begin().await?;
        let expired = uow.jobs().find_expired_leases(cutoff, RECLAIM_BATCH).await?;
        if expired.is_empty() {
            uow.rollback().await?;
            return Ok(0);
        }

        for job in &expired {
            let from = job.status;

            if job.attempts_remaining() {
                let delay = backoff::retry_delay(
                    job.attempt_count,
                    self.config.backoff_base,
                    self.config.backoff_cap,
                );
                let available_at = Utc::now()
                    + chrono::Duration::from_std(delay)
                        .map_err(|e| ApplicationError::Unknown(e.to_string()))?;

                let updated = uow
                    .jobs()
                    .release_to_pending(job.id, available_at, "lease expired")
                    .await?;
                uow.events()
                    .append(&JobEvent::transition(
                        &updated,
                        from,
                        JobStatus::Pending,
                        Some(format!("lease expired after {lease_secs}s; requeued")),
                    ))
                    .await?;
                warn!(
                    job_id = %job.id,
                    claimed_by = job.claimed_by.as_deref().unwrap_or("unknown"),
                    attempt = job.attempt_count,
                    "Requeued job with expired lease"
                );
            } else {
                let updated = uow
                    .jobs()
                    .release_to_dead(job.id, "lease expired; retry budget exhausted")
                    .await?;
                uow.events()
                    .append(&JobEvent::transition(
                        &updated,
                        from,
                        JobStatus::Dead,
                        Some(format!(
                            "lease expired after {lease_secs}s; retry budget exhausted"
                        )),
                    ))
                    .await?;
                warn!(
                    job_id = %job.id,
                    claimed_by = job.claimed_by.as_deref().unwrap_or("unknown"),
                    "Buried job with expired lease and no attempts left"
                );
            }
        }

        uow.commit().await?;
        Ok(expired.len())
    }
}
