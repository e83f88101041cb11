use murmur_app::jobs::{Job, JobEvent, JobStatus, JobType};
use murmur_types::errors::DbError;

use crate::models as db_models;

impl From<db_models::JobStatus> for JobStatus {
    fn from(status: db_models::JobStatus) -> Self {
        match status {
            db_models::JobStatus::Pending => JobStatus::Pending,
            db_models::JobStatus::Claimed => JobStatus::Claimed,
            db_models::JobStatus::Running => JobStatus::Running,
            db_models::JobStatus::Succeeded => JobStatus::Succeeded,
            db_models::JobStatus::Failed => JobStatus::Failed,
            db_models::JobStatus::Dead => JobStatus::Dead,
        }
    }
}

impl From<JobStatus> for db_models::JobStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => db_models::JobStatus::Pending,
            JobStatus::Claimed => db_models::JobStatus::Claimed,
            JobStatus::Running => db_models::JobStatus::Running,
            JobStatus::Succeeded => db_models::JobStatus::Succeeded,
            JobStatus::Failed => db_models::JobStatus::Failed,
            JobStatus::Dead => db_models::JobStatus::Dead,
        }
    }
}

fn parse_job_type(raw: &str) -> Result<JobType, DbError> {
    JobType::from_str(raw)
        .ok_or_else(|| DbError::Corrupted(format!("unrecognized job type '{raw}'")))
}

impl TryFrom<db_models::Job> for Job {
    type Error = DbError;

    fn try_from(job: db_models::Job) -> Result<Self, Self::Error> {
        Ok(Job {
            id: job.id,
            job_type: parse_job_type(&job.job_type)?,
            payload: job.payload,
            status: job.status.into(),
            attempt_count: job.attempt_count,
            max_attempts: job.max_attempts,
            available_at: job.available_at,
            claimed_by: job.claimed_by,
            claimed_at: job.claimed_at,
            last_error: job.last_error,
            result: job.result,
            created_at: job.created_at,
            updated_at: job.updated_at,
        })
    }
}

impl TryFrom<db_models::JobEvent> for JobEvent {
    type Error = DbError;

    fn try_from(event: db_models::JobEvent) -> Result<Self, Self::Error> {
        Ok(JobEvent {
            id: event.id,
            job_id: event.job_id,
            job_type: parse_job_type(&event.job_type)?,
            from_status: event.from_status.map(Into::into),
            to_status: event.to_status.into(),
            detail: event.detail,
            occurred_at: event.occurred_at,
        })
    }
}
