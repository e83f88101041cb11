use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use chrono::{DateTime, Utc};
use serde_json::Value;

use murmur_app::{jobs::Job, repository::JobRepository};
use murmur_types::{
    Result,
    errors::{ApplicationError, DbError},
};

use crate::models as db_models;

const JOB_COLUMNS: &str = "id, job_type, payload, status, attempt_count, max_attempts, \
     available_at, claimed_by, claimed_at, last_error, result, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresJobRepository<'a> {
    tx: Arc<Mutex<Transaction<'a, Postgres>>>,
}

impl<'a> PostgresJobRepository<'a> {
    pub fn new(tx: Arc<Mutex<Transaction<'a, Postgres>>>) -> Self {
        Self { tx }
    }
}

#[async_trait::async_trait]
impl<'a> JobRepository for PostgresJobRepository<'a> {
    async fn add(&self, job: &Job) -> Result<(), ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        sqlx::query(
            r#"
            INSERT INTO jobs (id, job_type, payload, status, attempt_count, max_attempts,
                              available_at, created_at, updated_at)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8)
            "#,
        )
        .bind(job.id)
        .bind(job.job_type.as_str())
        .bind(&job.payload)
        .bind(job.attempt_count)
        .bind(job.max_attempts)
        .bind(job.available_at)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&mut *tx_guard.as_mut())
        .await
        .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Job, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        let job = sqlx::query_as::<_, db_models::Job>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?
            .ok_or(ApplicationError::Db(DbError::JobNotFound(id)))?;

        Ok(job.try_into().map_err(ApplicationError::Db)?)
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'claimed', claimed_by = $1, claimed_at = NOW(),
                attempt_count = attempt_count + 1, updated_at = NOW()
            WHERE id = (
                SELECT id
                FROM jobs
                WHERE status = 'pending' AND available_at <= NOW()
                ORDER BY available_at ASC, id ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        );
        let claimed = sqlx::query_as::<_, db_models::Job>(&sql)
            .bind(worker_id)
            .fetch_optional(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        match claimed {
            Some(job) => Ok(Some(job.try_into().map_err(ApplicationError::Db)?)),
            None => Ok(None),
        }
    }

    async fn mark_running(&self, id: Uuid, worker_id: &str) -> Result<Job, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'running', updated_at = NOW()
            WHERE id = $1 AND claimed_by = $2 AND status = 'claimed'
            RETURNING {JOB_COLUMNS}
            "#
        );
        let job = sqlx::query_as::<_, db_models::Job>(&sql)
            .bind(id)
            .bind(worker_id)
            .fetch_optional(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?
            .ok_or(ApplicationError::Db(DbError::LeaseExpired(id)))?;

        Ok(job.try_into().map_err(ApplicationError::Db)?)
    }

    async fn mark_succeeded(
        &self,
        id: Uuid,
        worker_id: &str,
        result: Option<Value>,
    ) -> Result<Job, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'succeeded', result = $3, updated_at = NOW()
            WHERE id = $1 AND claimed_by = $2 AND status = 'running'
            RETURNING {JOB_COLUMNS}
            "#
        );
        let job = sqlx::query_as::<_, db_models::Job>(&sql)
            .bind(id)
            .bind(worker_id)
            .bind(result)
            .fetch_optional(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?
            .ok_or(ApplicationError::Db(DbError::LeaseExpired(id)))?;

        Ok(job.try_into().map_err(ApplicationError::Db)?)
    }

    async fn schedule_retry(
        &self,
        id: Uuid,
        worker_id: &str,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<Job, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        // GREATEST keeps available_at monotonically non-decreasing.
        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'pending', available_at = GREATEST($3, available_at),
                claimed_by = NULL, claimed_at = NULL, last_error = $4, updated_at = NOW()
            WHERE id = $1 AND claimed_by = $2 AND status = 'running'
            RETURNING {JOB_COLUMNS}
            "#
        );
        let job = sqlx::query_as::<_, db_models::Job>(&sql)
            .bind(id)
            .bind(worker_id)
            .bind(available_at)
            .bind(error)
            .fetch_optional(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?
            .ok_or(ApplicationError::Db(DbError::LeaseExpired(id)))?;

        Ok(job.try_into().map_err(ApplicationError::Db)?)
    }

    async fn mark_dead(
        &self,
        id: Uuid,
        worker_id: &str,
        error: &str,
    ) -> Result<Job, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'dead', last_error = $3, updated_at = NOW()
            WHERE id = $1 AND claimed_by = $2 AND status = 'running'
            RETURNING {JOB_COLUMNS}
            "#
        );
        let job = sqlx::query_as::<_, db_models::Job>(&sql)
            .bind(id)
            .bind(worker_id)
            .bind(error)
            .fetch_optional(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?
            .ok_or(ApplicationError::Db(DbError::LeaseExpired(id)))?;

        Ok(job.try_into().map_err(ApplicationError::Db)?)
    }

    async fn find_expired_leases(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Job>, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let sql = format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE status IN ('claimed', 'running') AND claimed_at < $1
            ORDER BY claimed_at ASC, id ASC
            LIMIT $2
            FOR UPDATE SKIP LOCKED
            "#
        );
        let expired = sqlx::query_as::<_, db_models::Job>(&sql)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?;

        expired
            .into_iter()
            .map(|job| job.try_into().map_err(ApplicationError::Db))
            .collect()
    }

    async fn release_to_pending(
        &self,
        id: Uuid,
        available_at: DateTime<Utc>,
        error: &str,
    ) -> Result<Job, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'pending', available_at = GREATEST($2, available_at),
                claimed_by = NULL, claimed_at = NULL, last_error = $3, updated_at = NOW()
            WHERE id = $1 AND status IN ('claimed', 'running')
            RETURNING {JOB_COLUMNS}
            "#
        );
        let job = sqlx::query_as::<_, db_models::Job>(&sql)
            .bind(id)
            .bind(available_at)
            .bind(error)
            .fetch_optional(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?
            .ok_or(ApplicationError::Db(DbError::LeaseExpired(id)))?;

        Ok(job.try_into().map_err(ApplicationError::Db)?)
    }

    async fn release_to_dead(&self, id: Uuid, error: &str) -> Result<Job, ApplicationError> {
        let mut tx_guard = self.tx.lock().await;
        let sql = format!(
            r#"
            UPDATE jobs
            SET status = 'dead', claimed_by = NULL, claimed_at = NULL,
                last_error = $2, updated_at = NOW()
            WHERE id = $1 AND status IN ('claimed', 'running')
            RETURNING {JOB_COLUMNS}
            "#
        );
        let job = sqlx::query_as::<_, db_models::Job>(&sql)
            .bind(id)
            .bind(error)
            .fetch_optional(&mut *tx_guard.as_mut())
            .await
            .map_err(|e| ApplicationError::Db(DbError::Database(e)))?
            .ok_or(ApplicationError::Db(DbError::LeaseExpired(id)))?;

        Ok(job.try_into().map_err(ApplicationError::Db)?)
    }
}
