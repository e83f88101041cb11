use thiserror::Error;

/// Failure modes a job handler can report. These never escape the worker
/// loop: the worker converts them into a lifecycle transition.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Transient failure (network, timeout, dependency unavailable).
    /// The job goes back to pending with a backoff delay.
    #[error("retryable failure: {0}")]
    Retryable(String),

    /// Unrecoverable failure. The job goes straight to dead.
    #[error("fatal failure: {0}")]
    Fatal(String),
}

impl ExecutionError {
    pub fn retryable(detail: impl Into<String>) -> Self {
        Self::Retryable(detail.into())
    }

    pub fn fatal(detail: impl Into<String>) -> Self {
        Self::Fatal(detail.into())
    }

    pub fn detail(&self) -> &str {
        match self {
            Self::Retryable(detail) | Self::Fatal(detail) => detail,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
