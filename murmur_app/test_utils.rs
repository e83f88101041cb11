#[cfg(not(tarpaulin_include))]
pub mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use serde_json::{Value, json};
    use std::{
        collections::HashMap,
        sync::{
            Arc, Mutex,
            atomic::{AtomicUsize, Ordering},
        },
    };
    use uuid::Uuid;

    use murmur_types::errors::{ApplicationError, DbError, ExecutionError};

    use crate::{
        gateway::PipelineClient,
        jobs::{
            Job, JobEvent, JobStatus, JobType,
            handler::JobHandler,
            tasks::{ProactiveCheckinTask, ProcessVoiceInteractionTask, SummarizeProfileTask},
        },
        repository::{EventRepository, JobRepository},
        uow::{UnitOfWork, UnitOfWorkProvider},
    };

    #[derive(Default)]
    struct MemState {
        jobs: HashMap<Uuid, Job>,
        events: Vec<JobEvent>,
    }

    /// In-memory rendition of the job store. One mutex guards the whole
    /// state, so each repository call is as atomic as a single-statement
    /// transaction against Postgres.
    #[derive(Clone, Default)]
    pub struct MemUnitOfWorkProvider {
        state: Arc<Mutex<MemState>>,
    }

    impl MemUnitOfWorkProvider {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl UnitOfWorkProvider for MemUnitOfWorkProvider {
        async fn begin<'p>(&'p self) -> Result<Box<dyn UnitOfWork<'p> + 'p>, ApplicationError> {
            Ok(Box::new(MemUnitOfWork {
                state: self.state.clone(),
            }))
        }
    }

    pub struct MemUnitOfWork {
        state: Arc<Mutex<MemState>>,
    }

    #[async_trait]
    impl<'p> UnitOfWork<'p> for MemUnitOfWork {
        fn jobs(&self) -> Arc<dyn JobRepository + 'p> {
            Arc::new(MemJobRepository {
                state: self.state.clone(),
            })
        }

        fn events(&self) -> Arc<dyn EventRepository + 'p> {
            Arc::new(MemEventRepository {
                state: self.state.clone(),
            })
        }

        async fn commit(self: Box<Self>) -> Result<(), ApplicationError> {
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<(), ApplicationError> {
            Ok(())
        }
    }

    pub struct MemJobRepository {
        state: Arc<Mutex<MemState>>,
    }

    #[async_trait]
    impl JobRepository for MemJobRepository {
        async fn add(&self, job: &Job) -> Result<(), ApplicationError> {
            let mut state = self.state.lock().unwrap();
            state.jobs.insert(job.id, job.clone());
            Ok(())
        }

        async fn get_by_id(&self, id: Uuid) -> Result<Job, ApplicationError> {
            let state = self.state.lock().unwrap();
            state
                .jobs
                .get(&id)
                .cloned()
                .ok_or_else(|| DbError::JobNotFound(id).into())
        }

        async fn claim_next(&self, worker_id: &str) -> Result<Option<Job>, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let now = Utc::now();

            let mut eligible: Vec<(DateTime<Utc>, Uuid)> = state
                .jobs
                .values()
                .filter(|j| j.is_eligible(now))
                .map(|j| (j.available_at, j.id))
                .collect();
            eligible.sort();

            let Some((_, id)) = eligible.first().copied() else {
                return Ok(None);
            };

            let job = state.jobs.get_mut(&id).expect("eligible job exists");
            job.status = JobStatus::Claimed;
            job.claimed_by = Some(worker_id.to_string());
            job.claimed_at = Some(now);
            job.attempt_count += 1;
            job.updated_at = now;
            Ok(Some(job.clone()))
        }

        async fn mark_running(&self, id: Uuid, worker_id: &str) -> Result<Job, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let job = state
                .jobs
                .get_mut(&id)
                .ok_or(DbError::JobNotFound(id))?;

            if job.status != JobStatus::Claimed || job.claimed_by.as_deref() != Some(worker_id) {
                return Err(DbError::LeaseExpired(id).into());
            }

            job.status = JobStatus::Running;
            job.updated_at = Utc::now();
            Ok(job.clone())
        }

        async fn mark_succeeded(
            &self,
            id: Uuid,
            worker_id: &str,
            result: Option<Value>,
        ) -> Result<Job, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let job = state
                .jobs
                .get_mut(&id)
                .ok_or(DbError::JobNotFound(id))?;

            if job.status != JobStatus::Running || job.claimed_by.as_deref() != Some(worker_id) {
                return Err(DbError::LeaseExpired(id).into());
            }

            job.status = JobStatus::Succeeded;
            job.result = result;
            job.updated_at = Utc::now();
            Ok(job.clone())
        }

        async fn schedule_retry(
            &self,
            id: Uuid,
            worker_id: &str,
            available_at: DateTime<Utc>,
            error: &str,
        ) -> Result<Job, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let job = state
                .jobs
                .get_mut(&id)
                .ok_or(DbError::JobNotFound(id))?;

            if job.status != JobStatus::Running || job.claimed_by.as_deref() != Some(worker_id) {
                return Err(DbError::LeaseExpired(id).into());
            }

            job.status = JobStatus::Pending;
            job.available_at = available_at.max(job.available_at);
            job.claimed_by = None;
            job.claimed_at = None;
            job.last_error = Some(error.to_string());
            job.updated_at = Utc::now();
            Ok(job.clone())
        }

        async fn mark_dead(
            &self,
            id: Uuid,
            worker_id: &str,
            error: &str,
        ) -> Result<Job, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let job = state
                .jobs
                .get_mut(&id)
                .ok_or(DbError::JobNotFound(id))?;

            if job.status != JobStatus::Running || job.claimed_by.as_deref() != Some(worker_id) {
                return Err(DbError::LeaseExpired(id).into());
            }

            job.status = JobStatus::Dead;
            job.last_error = Some(error.to_string());
            job.updated_at = Utc::now();
            Ok(job.clone())
        }

        async fn find_expired_leases(
            &self,
            cutoff: DateTime<Utc>,
            limit: i64,
        ) -> Result<Vec<Job>, ApplicationError> {
            let state = self.state.lock().unwrap();
            let mut expired: Vec<Job> = state
                .jobs
                .values()
                .filter(|j| {
                    j.status.is_leased() && j.claimed_at.is_some_and(|claimed| claimed < cutoff)
                })
                .cloned()
                .collect();
            expired.sort_by_key(|j| (j.claimed_at, j.id));
            expired.truncate(limit as usize);
            Ok(expired)
        }

        async fn release_to_pending(
            &self,
            id: Uuid,
            available_at: DateTime<Utc>,
            error: &str,
        ) -> Result<Job, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let job = state
                .jobs
                .get_mut(&id)
                .ok_or(DbError::JobNotFound(id))?;

            if !job.status.is_leased() {
                return Err(DbError::LeaseExpired(id).into());
            }

            job.status = JobStatus::Pending;
            job.available_at = available_at.max(job.available_at);
            job.claimed_by = None;
            job.claimed_at = None;
            job.last_error = Some(error.to_string());
            job.updated_at = Utc::now();
            Ok(job.clone())
        }

        async fn release_to_dead(&self, id: Uuid, error: &str) -> Result<Job, ApplicationError> {
            let mut state = self.state.lock().unwrap();
            let job = state
                .jobs
                .get_mut(&id)
                .ok_or(DbError::JobNotFound(id))?;

            if !job.status.is_leased() {
                return Err(DbError::LeaseExpired(id).into());
            }

            job.status = JobStatus::Dead;
            job.claimed_by = None;
            job.claimed_at = None;
            job.last_error = Some(error.to_string());
            job.updated_at = Utc::now();
            Ok(job.clone())
        }
    }

    pub struct MemEventRepository {
        state: Arc<Mutex<MemState>>,
    }

    #[async_trait]
    impl EventRepository for MemEventRepository {
        async fn append(&self, event: &JobEvent) -> Result<(), ApplicationError> {
            let mut state = self.state.lock().unwrap();
            state.events.push(event.clone());
            Ok(())
        }

        async fn list_for_job(&self, job_id: Uuid) -> Result<Vec<JobEvent>, ApplicationError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .events
                .iter()
                .filter(|e| e.job_id == job_id)
                .cloned()
                .collect())
        }

        async fn list_recent(
            &self,
            job_type: Option<JobType>,
            to_status: Option<JobStatus>,
            limit: i64,
        ) -> Result<Vec<JobEvent>, ApplicationError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .events
                .iter()
                .rev()
                .filter(|e| job_type.is_none_or(|t| e.job_type == t))
                .filter(|e| to_status.is_none_or(|s| e.to_status == s))
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    /// Pipeline fake: counts calls per method, optionally failing the next
    /// call with a canned error.
    #[derive(Default)]
    pub struct MockPipelineClient {
        voice_calls: AtomicUsize,
        summarize_calls: AtomicUsize,
        checkin_calls: AtomicUsize,
        fail_next: Mutex<Option<ExecutionError>>,
    }

    impl MockPipelineClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_next_with(&self, err: ExecutionError) {
            *self.fail_next.lock().unwrap() = Some(err);
        }

        pub fn voice_calls(&self) -> usize {
            self.voice_calls.load(Ordering::SeqCst)
        }

        pub fn summarize_calls(&self) -> usize {
            self.summarize_calls.load(Ordering::SeqCst)
        }

        pub fn checkin_calls(&self) -> usize {
            self.checkin_calls.load(Ordering::SeqCst)
        }

        fn take_failure(&self) -> Option<ExecutionError> {
            self.fail_next.lock().unwrap().take()
        }
    }

    #[async_trait]
    impl PipelineClient for MockPipelineClient {
        async fn process_voice_interaction(
            &self,
            _task: &ProcessVoiceInteractionTask,
        ) -> Result<Value, ExecutionError> {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            self.voice_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"ok": true}))
        }

        async fn summarize_profile(
            &self,
            _task: &SummarizeProfileTask,
        ) -> Result<Value, ExecutionError> {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            self.summarize_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"summary": "a curious kid who loves dinosaurs"}))
        }

        async fn proactive_checkin(
            &self,
            _task: &ProactiveCheckinTask,
        ) -> Result<Value, ExecutionError> {
            if let Some(err) = self.take_failure() {
                return Err(err);
            }
            self.checkin_calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"delivered": true}))
        }
    }

    /// Handler that always completes, echoing a fixed result.
    pub struct AlwaysSucceeds {
        result: Option<Value>,
        calls: AtomicUsize,
    }

    impl AlwaysSucceeds {
        pub fn new() -> Self {
            Self::with_result(Some(json!({"ok": true})))
        }

        pub fn with_result(result: Option<Value>) -> Self {
            Self {
                result,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobHandler for AlwaysSucceeds {
        async fn handle(&self, _job: &Job) -> Result<Option<Value>, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    /// Handler that always reports a transient failure.
    pub struct AlwaysRetryable {
        detail: String,
        calls: AtomicUsize,
    }

    impl AlwaysRetryable {
        pub fn new(detail: impl Into<String>) -> Self {
            Self {
                detail: detail.into(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobHandler for AlwaysRetryable {
        async fn handle(&self, _job: &Job) -> Result<Option<Value>, ExecutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ExecutionError::retryable(self.detail.clone()))
        }
    }

    /// Handler that always reports an unrecoverable failure.
    pub struct AlwaysFatal {
        detail: String,
    }

    impl AlwaysFatal {
        pub fn new(detail: impl Into<String>) -> Self {
            Self {
                detail: detail.into(),
            }
        }
    }

    #[async_trait]
    impl JobHandler for AlwaysFatal {
        async fn handle(&self, _job: &Job) -> Result<Option<Value>, ExecutionError> {
            Err(ExecutionError::fatal(self.detail.clone()))
        }
    }

    /// Handler that fails transiently `failures` times, then succeeds.
    pub struct FailsNTimes {
        failures: usize,
        calls: AtomicUsize,
    }

    impl FailsNTimes {
        pub fn new(failures: usize) -> Self {
            Self {
                failures,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JobHandler for FailsNTimes {
        async fn handle(&self, _job: &Job) -> Result<Option<Value>, ExecutionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(ExecutionError::retryable(format!(
                    "transient failure {}",
                    call + 1
                )))
            } else {
                Ok(Some(json!({"recovered": true})))
            }
        }
    }
}
