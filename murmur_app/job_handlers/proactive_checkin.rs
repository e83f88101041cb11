use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use murmur_types::errors::ExecutionError;

use crate::{
    gateway::PipelineClient,
    jobs::{Job, handler::JobHandler, tasks::ProactiveCheckinTask},
};

/// Composes and delivers a scheduled check-in message for a user. These
/// jobs are typically enqueued with a future `available_at`.
pub struct ProactiveCheckinHandler {
    pipeline: Arc<dyn PipelineClient>,
}

impl ProactiveCheckinHandler {
    pub fn new(pipeline: Arc<dyn PipelineClient>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl JobHandler for ProactiveCheckinHandler {
    #[instrument(skip_all, fields(job_type = "PROACTIVE_CHECKIN", job_id = %job.id))]
    async fn handle(&self, job: &Job) -> Result<Option<Value>, ExecutionError> {
        let task: ProactiveCheckinTask = serde_json::from_value(job.payload.clone())
            .map_err(|e| ExecutionError::fatal(format!("malformed payload: {e}")))?;

        info!(user_id = %task.user_id, "Delivering proactive check-in");

        let result = self.pipeline.proactive_checkin(&task).await?;
        Ok(Some(result))
    }
}
