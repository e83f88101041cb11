use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use murmur_app::{
    gateway::PipelineClient,
    jobs::tasks::{ProactiveCheckinTask, ProcessVoiceInteractionTask, SummarizeProfileTask},
};
use murmur_types::errors::{ApplicationError, ExecutionError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Gateway to the AI pipeline service. Each job type maps to one endpoint;
/// the task payload goes over as-is and the response body comes back as the
/// job result. Connectivity problems and 5xx responses are retryable,
/// 4xx responses mean the request itself is bad and will never succeed.
pub struct HttpPipelineClient {
    base_url: String,
    http: Client,
}

impl HttpPipelineClient {
    pub fn new(base_url: &str) -> Result<Self, ApplicationError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApplicationError::Infrastructure(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Value, ExecutionError> {
        let url = format!("{}/{path}", self.base_url);
        debug!(%url, "Calling pipeline");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ExecutionError::retryable(format!("pipeline unreachable: {e}")))?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<Value>()
                .await
                .map_err(|e| ExecutionError::retryable(format!("malformed pipeline response: {e}")))
        } else if status.is_client_error() {
            Err(ExecutionError::fatal(format!(
                "pipeline rejected request: {status}"
            )))
        } else {
            Err(ExecutionError::retryable(format!(
                "pipeline error: {status}"
            )))
        }
    }
}

#[async_trait]
impl PipelineClient for HttpPipelineClient {
    async fn process_voice_interaction(
        &self,
        task: &ProcessVoiceInteractionTask,
    ) -> Result<Value, ExecutionError> {
        self.post("pipeline/voice-interactions", task).await
    }

    async fn summarize_profile(
        &self,
        task: &SummarizeProfileTask,
    ) -> Result<Value, ExecutionError> {
        self.post("pipeline/profile-summaries", task).await
    }

    async fn proactive_checkin(
        &self,
        task: &ProactiveCheckinTask,
    ) -> Result<Value, ExecutionError> {
        self.post("pipeline/checkins", task).await
    }
}
