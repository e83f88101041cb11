use thiserror::Error;

mod app_error;
mod db_error;
mod execution_error;

pub use app_error::AppError;
pub use db_error::DbError;
pub use execution_error::ExecutionError;

pub type Result<T, E = ApplicationError> = std::result::Result<T, E>;

/// Top level error wrapper used across crate boundaries.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("An unknown error occurred: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for ApplicationError {
    fn from(err: anyhow::Error) -> Self {
        ApplicationError::Unknown(err.to_string())
    }
}
