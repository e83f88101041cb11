use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use murmur_types::errors::ExecutionError;

use crate::{
    gateway::PipelineClient,
    jobs::{Job, handler::JobHandler, tasks::SummarizeProfileTask},
};

/// Asks the pipeline to distill a user's accumulated memories into a
/// profile summary.
pub struct SummarizeProfileHandler {
    pipeline: Arc<dyn PipelineClient>,
}

impl SummarizeProfileHandler {
    pub fn new(pipeline: Arc<dyn PipelineClient>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl JobHandler for SummarizeProfileHandler {
    #[instrument(skip_all, fields(job_type = "SUMMARIZE_PROFILE", job_id = %job.id))]
    async fn handle(&self, job: &Job) -> Result<Option<Value>, ExecutionError> {
        let task: SummarizeProfileTask = serde_json::from_value(job.payload.clone())
            .map_err(|e| ExecutionError::fatal(format!("malformed payload: {e}")))?;

        info!(user_id = %task.user_id, "Summarizing profile");

        let result = self.pipeline.summarize_profile(&task).await?;
        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::jobs::JobType;
    use crate::test_utils::tests::MockPipelineClient;

    #[tokio::test]
    async fn test_delegates_to_pipeline() {
        let pipeline = Arc::new(MockPipelineClient::new());
        let handler = SummarizeProfileHandler::new(pipeline.clone());

        let job = Job::new(
            JobType::SummarizeProfile,
            json!({"user_id": Uuid::new_v4()}),
            Utc::now(),
            3,
        );

        let result = handler.handle(&job).await.unwrap();
        assert!(result.is_some());
        assert_eq!(pipeline.summarize_calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_fatal() {
        let pipeline = Arc::new(MockPipelineClient::new());
        let handler = SummarizeProfileHandler::new(pipeline.clone());

        let job = Job::new(JobType::SummarizeProfile, json!({}), Utc::now(), 3);

        let err = handler.handle(&job).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(pipeline.summarize_calls(), 0);
    }
}
