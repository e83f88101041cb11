use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use murmur_types::errors::AppError;

use crate::jobs::JobType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessVoiceInteractionTask {
    pub interaction_id: Uuid,
    pub user_id: Uuid,
    pub conversation_id: Uuid,
    /// Set by the dev transcript route; the pipeline may ignore it.
    #[serde(default)]
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeProfileTask {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProactiveCheckinTask {
    pub user_id: Uuid,
}

/// Checks that `payload` deserializes into the task type for `job_type`.
/// Runs at enqueue time so malformed work is rejected at the door instead
/// of burning retry attempts.
pub fn validate_payload(job_type: JobType, payload: &Value) -> Result<(), AppError> {
    let outcome = match job_type {
        JobType::ProcessVoiceInteraction => {
            serde_json::from_value::<ProcessVoiceInteractionTask>(payload.clone()).map(drop)
        }
        JobType::SummarizeProfile => {
            serde_json::from_value::<SummarizeProfileTask>(payload.clone()).map(drop)
        }
        JobType::ProactiveCheckin => {
            serde_json::from_value::<ProactiveCheckinTask>(payload.clone()).map(drop)
        }
    };

    outcome.map_err(|e| AppError::InvalidPayload {
        job_type: job_type.as_str(),
        reason: e.to_string(),
    })
}
