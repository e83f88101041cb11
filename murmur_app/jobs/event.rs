use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::jobs::{Job, JobStatus, JobType};

/// Append-only record of a single job status change. Written in the same
/// transaction as the job mutation it describes, never updated or deleted.
#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_type: JobType,
    /// `None` only for the enqueue record that opens a job's trail.
    pub from_status: Option<JobStatus>,
    pub to_status: JobStatus,
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl JobEvent {
    /// The record written when a job is first inserted.
    pub fn enqueued(job: &Job) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id: job.id,
            job_type: job.job_type,
            from_status: None,
            to_status: JobStatus::Pending,
            detail: Some("enqueued".to_string()),
            occurred_at: Utc::now(),
        }
    }

    pub fn transition(job: &Job, from: JobStatus, to: JobStatus, detail: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id: job.id,
            job_type: job.job_type,
            from_status: Some(from),
            to_status: to,
            detail,
            occurred_at: Utc::now(),
        }
    }
}
