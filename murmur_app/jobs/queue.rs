use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use murmur_types::errors::{AppError, ApplicationError};

use crate::{
    config::Config,
    jobs::{Job, JobEvent, JobStatus, JobType, tasks},
    uow::{UnitOfWork, UnitOfWorkProvider},
};

/// The surface collaborators use to put work on the queue and read it
/// back. Polling and execution live in `JobWorker`.
pub struct JobQueue {
    uow_provider: Arc<dyn UnitOfWorkProvider>,
    config: Arc<Config>,
}

impl JobQueue {
    pub fn new(uow_provider: Arc<dyn UnitOfWorkProvider>, config: Arc<Config>) -> Self {
        Self {
            uow_provider,
            config,
        }
    }

    /// Validates and inserts a new job. The job row and its enqueue event
    /// commit together. `available_at` defaults to now, `max_attempts` to
    /// the configured default.
    pub async fn enqueue(
        &self,
        job_type: JobType,
        payload: Value,
        available_at: Option<DateTime<Utc>>,
        max_attempts: Option<i32>,
    ) -> Result<Uuid, ApplicationError> {
        tasks::validate_payload(job_type, &payload)?;

        let max_attempts = max_attempts.unwrap_or(self.config.default_max_attempts);
        if max_attempts < 1 {
            return Err(AppError::InvalidMaxAttempts(max_attempts).into());
        }

        let job = Job::new(
            job_type,
            payload,
            available_at.unwrap_or_else(Utc::now),
            max_attempts,
        );

        let uow = self.uow_provider.begin().await?;
        uow.jobs().add(&job).await?;
        uow.events().append(&JobEvent::enqueued(&job)).await?;
        uow.commit().await?;

        info!(job_id = %job.id, job_type = %job.job_type, "Enqueued job");
        Ok(job.id)
    }

    pub async fn job(&self, id: Uuid) -> Result<Job, ApplicationError> {
        let uow = self.uow_provider.begin().await?;
        let job = uow.jobs().get_by_id(id).await?;
        uow.commit().await?;
        Ok(job)
    }

    /// Full transition trail for one job, oldest first. Fails with
    /// `JobNotFound` for ids that were never enqueued.
    pub async fn events(&self, id: Uuid) -> Result<Vec<JobEvent>, ApplicationError> {
        let uow = self.uow_provider.begin().await?;
        uow.jobs().get_by_id(id).await?;
        let events = uow.events().list_for_job(id).await?;
        uow.commit().await?;
        Ok(events)
    }

    /// Recent events across jobs, newest first.
    pub async fn recent_events(
        &self,
        job_type: Option<JobType>,
        to_status: Option<JobStatus>,
        limit: i64,
    ) -> Result<Vec<JobEvent>, ApplicationError> {
        let uow = self.uow_provider.begin().await?;
        let events = uow.events().list_recent(job_type, to_status, limit).await?;
        uow.commit().await?;
        Ok(events)
    }
}
