use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use murmur_app::{
    jobs::{JobEvent, JobStatus, JobType},
    repository::EventRepository,
};
use murmur_types::{
    Result,
    errors::{ApplicationError, DbError},
};

use crate::models as db_models;

const EVENT_COLUMNS: &str = "id, job_id, job_type, from_status, to_status, detail, occurred_at";

#[derive(Clone)]
pub struct PostgresEventRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresEventRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl<'a> EventRepository for PostgresEventRepository<'a> {
    async fn append(&self, event: &JobEvent) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        sqlx::query(
            r#"
            INSERT INTO job_events (id, job_id, job_type, from_status, to_status, detail, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(event.id)
        .bind(event.job_id)
        .bind(event.job_type.as_str())
        .bind(event.from_status.map(db_models::JobStatus::from))
        .bind(db_models::JobStatus::from(event.to_status))
        .bind(&event.detail)
        .bind(event.occurred_at)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(())
    }

    async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<JobEvent>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM job_events
            WHERE job_id = $1
            ORDER BY occurred_at ASC, seq ASC
            "#
        );
        let events = sqlx::query_as::<_, db_models::JobEvent>(&sql)
            .bind(job_id)
            .fetch_all(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        events
            .into_iter()
            .map(|event| JobEvent::try_from(event).map_err(ApplicationError::Db))
            .collect()
    }

    async fn list_recent(
        &self,
        job_type: Option<JobType>,
        to_status: Option<JobStatus>,
        limit: i64,
    ) -> Result<Vec<JobEvent>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM job_events
            WHERE ($1::text IS NULL OR job_type = $1)
              AND ($2::job_status IS NULL OR to_status = $2)
            ORDER BY occurred_at DESC, seq DESC
            LIMIT $3
            "#
        );
        let events = sqlx::query_as::<_, db_models::JobEvent>(&sql)
            .bind(job_type.map(|t| t.as_str()))
            .bind(to_status.map(db_models::JobStatus::from))
            .bind(limit)
            .fetch_all(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        events
            .into_iter()
            .map(|event| JobEvent::try_from(event).map_err(ApplicationError::Db))
            .collect()
    }
}
