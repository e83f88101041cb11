use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, instrument};

use murmur_types::errors::ExecutionError;

use crate::{
    gateway::PipelineClient,
    jobs::{Job, handler::JobHandler, tasks::ProcessVoiceInteractionTask},
};

/// Runs an uploaded voice interaction through the pipeline: transcription,
/// reply generation, speech synthesis. The heavy lifting happens behind
/// the gateway; this handler owns payload decoding and outcome mapping.
pub struct ProcessVoiceInteractionHandler {
    pipeline: Arc<dyn PipelineClient>,
}

impl ProcessVoiceInteractionHandler {
    pub fn new(pipeline: Arc<dyn PipelineClient>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl JobHandler for ProcessVoiceInteractionHandler {
    #[instrument(skip_all, fields(job_type = "PROCESS_VOICE_INTERACTION", job_id = %job.id))]
    async fn handle(&self, job: &Job) -> Result<Option<Value>, ExecutionError> {
        let task: ProcessVoiceInteractionTask = serde_json::from_value(job.payload.clone())
            .map_err(|e| ExecutionError::fatal(format!("malformed payload: {e}")))?;

        info!(
            interaction_id = %task.interaction_id,
            user_id = %task.user_id,
            "Processing voice interaction"
        );

        let result = self.pipeline.process_voice_interaction(&task).await?;
        Ok(Some(result))
    }
}
