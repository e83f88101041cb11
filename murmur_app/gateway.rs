use async_trait::async_trait;
use serde_json::Value;

use murmur_types::errors::ExecutionError;

use crate::jobs::tasks::{ProactiveCheckinTask, ProcessVoiceInteractionTask, SummarizeProfileTask};

/// Boundary to the AI pipeline (transcription, reply generation, speech
/// synthesis, profile summarization). The queue only cares that each call
/// eventually yields a result document or a retryable/fatal failure; what
/// happens behind it is the pipeline's business.
#[async_trait]
pub trait PipelineClient: Send + Sync {
    async fn process_voice_interaction(
        &self,
        task: &ProcessVoiceInteractionTask,
    ) -> Result<Value, ExecutionError>;

    async fn summarize_profile(&self, task: &SummarizeProfileTask)
        -> Result<Value, ExecutionError>;

    async fn proactive_checkin(&self, task: &ProactiveCheckinTask)
        -> Result<Value, ExecutionError>;
}
