use async_trait::async_trait;
use serde_json::Value;

use murmur_types::errors::ExecutionError;

use crate::jobs::Job;

/// A handler consumes one claimed job of its registered type.
///
/// `Ok(result)` completes the job; `ExecutionError::Retryable` sends it back
/// to pending with backoff; `ExecutionError::Fatal` kills it. Handlers carry
/// their own dependencies; the worker hands them nothing but the job.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<Option<Value>, ExecutionError>;
}
