use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use murmur_types::errors::ApplicationError;

use crate::jobs::Job;

/// Durable storage for job rows. The store is the single arbiter of
/// concurrency: every mutation here is atomic, and the worker-guarded
/// operations fail with `DbError::LeaseExpired` when the caller no longer
/// holds the claim they think they hold.
#[async_trait::async_trait]
pub trait JobRepository: Send + Sync {
    /// Inserts a new pending job.
    async fn add(&self, job: &Job) -> Result<(), ApplicationError>;

    /// Find a job by id.
    async fn get_by_id(&self, id: Uuid) -> Result<Job, ApplicationError>;

    /// Atomically claims the next eligible job for `worker_id`: oldest
    /// `available_at` first, id as tie-break, skipping rows locked by
    /// concurrent claimers. Increments the attempt count. Returns `None`
    /// when no work is available (not an error).
    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>, ApplicationError>;

    /// Flags a claimed job as running. Same owner, status flag only.
    async fn mark_running(&self, id: Uuid, worker_id: &str) -> Result<Job, ApplicationError>;

    /// Completes a running job, attaching the handler's result.
    async fn mark_succeeded(
        &self,
        id: Uuid,
        worker_id: &str,
        result: Option<Value>,
    ) -> Result<Job, ApplicationError>;

    /// Returns a failed job to pending, eligible again at `available_at`.
    /// `available_at` must not be earlier than the current value.
    async fn schedule_retry(
        &self,
        id: Uuid,
        worker_id: &str,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<Job, ApplicationError>;

    /// Terminally fails a running job.
    async fn mark_dead(&self, id: Uuid, worker_id: &str, error: &str)
        -> Result<Job, ApplicationError>;

    /// Rows in claimed/running whose `claimed_at` is older than `cutoff`,
    /// locked for the calling transaction, skipping rows other reconcilers
    /// already hold.
    async fn find_expired_leases(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Job>, ApplicationError>;

    /// Reconciler path: releases an expired lease back to pending. No
    /// worker guard; the row is already locked by the calling transaction.
    async fn release_to_pending(
        &self,
        id: Uuid,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<Job, ApplicationError>;

    /// Reconciler path: an expired lease with no retry budget left.
    async fn release_to_dead(&self, id: Uuid, error: &str) -> Result<Job, ApplicationError>;
}
