use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use murmur_app::jobs::{Job, JobEvent, JobType, queue::JobQueue};
use murmur_types::errors::{AppError, ApplicationError, DbError};

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<JobQueue>,
}

pub struct ApiRouter {}

impl ApiRouter {
    pub async fn serve(state: AppState, port: u16) -> Result<(), ApplicationError> {
        let router = Router::new()
            .route("/healthz", get(healthz))
            .route("/jobs", post(enqueue_job))
            .route("/jobs/{id}", get(get_job))
            .route("/jobs/{id}/events", get(list_job_events))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            let err = format!("{:#?}", e);
            ApplicationError::Infrastructure(err)
        })?;

        tracing::info!(
            "HTTP Server started, listening on http://{}",
            addr.to_string()
        );
        axum::serve(listener, router).await.map_err(infra_error)?;

        Ok(())
    }
}

fn infra_error(e: std::io::Error) -> ApplicationError {
    let err = format!("{:#?}", e);
    ApplicationError::Infrastructure(err)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct EnqueueRequest {
    job_type: String,
    payload: Value,
    available_at: Option<DateTime<Utc>>,
    max_attempts: Option<i32>,
}

async fn enqueue_job(
    State(state): State<AppState>,
    Json(body): Json<EnqueueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let job_type = JobType::from_str(&body.job_type)
        .ok_or_else(|| ApplicationError::from(AppError::UnknownJobType(body.job_type.clone())))?;

    let id = state
        .queue
        .enqueue(job_type, body.payload, body.available_at, body.max_attempts)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    Ok(Json(state.queue.job(id).await?))
}

async fn list_job_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<JobEvent>>, ApiError> {
    Ok(Json(state.queue.events(id).await?))
}

/// Maps the error taxonomy onto HTTP: validation errors are the caller's
/// fault, a missing job is 404, everything else is a 500.
struct ApiError(ApplicationError);

impl<E: Into<ApplicationError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ApplicationError::App(_) => StatusCode::BAD_REQUEST,
            ApplicationError::Db(DbError::JobNotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self.0);
        }

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
