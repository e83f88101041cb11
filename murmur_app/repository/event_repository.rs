use uuid::Uuid;

use murmur_types::errors::ApplicationError;

use crate::jobs::{JobEvent, JobStatus, JobType};

/// Append-only sink for job transition events. Insert and read, never
/// update or delete.
#[async_trait::async_trait]
pub trait EventRepository: Send + Sync {
    async fn append(&self, event: &JobEvent) -> Result<(), ApplicationError>;

    /// Full trail for one job, oldest first.
    async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<JobEvent>, ApplicationError>;

    /// Most recent events across jobs, newest first, optionally narrowed
    /// by job type and/or resulting status.
    async fn list_recent(
        &self,
        job_type: Option<JobType>,
        to_status: Option<JobStatus>,
        limit: i64,
    ) -> Result<Vec<JobEvent>, ApplicationError>;
}
