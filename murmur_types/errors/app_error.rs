use thiserror::Error;

/// Errors for app logic. These surface to enqueuers directly instead of
/// being absorbed into the retry cycle.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unknown job type '{0}'")]
    UnknownJobType(String),

    #[error("Invalid payload for {job_type}: {reason}")]
    InvalidPayload {
        job_type: &'static str,
        reason: String,
    },

    #[error("max_attempts must be at least 1, got {0}")]
    InvalidMaxAttempts(i32),

    #[error("No job handler for {0}")]
    NoJobHandler(String),
}
