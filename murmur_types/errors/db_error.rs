use thiserror::Error;
use uuid::Uuid;

/// Errors for db stuff.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Job with ID {0} not found")]
    JobNotFound(Uuid),

    #[error("Lease on job {0} is no longer held by this worker")]
    LeaseExpired(Uuid),

    #[error("Corrupted row: {0}")]
    Corrupted(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("Transaction error: {0}")]
    Transaction(String),
}
