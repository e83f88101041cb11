use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use uuid::Uuid;

use murmur_app::{
    config::Config,
    job_registry::JobRegistry,
    jobs::{JobStatus, JobType, queue::JobQueue, worker::JobWorker},
    test_utils::tests::{AlwaysRetryable, AlwaysSucceeds, MemUnitOfWorkProvider},
};
use murmur_types::{
    Result,
    errors::{AppError, ApplicationError, DbError},
};

fn test_config() -> Arc<Config> {
    Arc::new(Config {
        default_max_attempts: 3,
        lease_timeout: Duration::from_secs(60),
        idle_poll_interval: Duration::from_millis(10),
        backoff_base: Duration::from_millis(40),
        backoff_cap: Duration::from_millis(400),
        reconcile_interval: Duration::from_secs(60),
        worker_count: 1,
        http_port: 0,
        pipeline_url: "http://localhost:9090".to_string(),
    })
}

fn voice_payload() -> serde_json::Value {
    json!({
        "interaction_id": Uuid::new_v4(),
        "user_id": Uuid::new_v4(),
        "conversation_id": Uuid::new_v4(),
    })
}

#[tokio::test]
async fn test_enqueue_rejects_malformed_payloads() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let queue = JobQueue::new(provider, test_config());

    let outcome = queue
        .enqueue(
            JobType::ProcessVoiceInteraction,
            json!({"interaction_id": "not-a-uuid"}),
            None,
            None,
        )
        .await;

    assert!(matches!(
        outcome,
        Err(ApplicationError::App(AppError::InvalidPayload { .. }))
    ));
    Ok(())
}

#[tokio::test]
async fn test_enqueue_rejects_nonpositive_max_attempts() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let queue = JobQueue::new(provider, test_config());

    let outcome = queue
        .enqueue(
            JobType::SummarizeProfile,
            json!({"user_id": Uuid::new_v4()}),
            None,
            Some(0),
        )
        .await;

    assert!(matches!(
        outcome,
        Err(ApplicationError::App(AppError::InvalidMaxAttempts(0)))
    ));
    Ok(())
}

#[tokio::test]
async fn test_enqueue_applies_defaults_and_records_the_enqueue_event() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let config = test_config();
    let queue = JobQueue::new(provider, config.clone());

    let before = Utc::now();
    let id = queue
        .enqueue(
            JobType::SummarizeProfile,
            json!({"user_id": Uuid::new_v4()}),
            None,
            None,
        )
        .await?;

    let job = queue.job(id).await?;
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempt_count, 0);
    assert_eq!(job.max_attempts, config.default_max_attempts);
    assert!(job.available_at >= before && job.available_at <= Utc::now());

    let events = queue.events(id).await?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].from_status, None);
    assert_eq!(events[0].to_status, JobStatus::Pending);
    Ok(())
}

#[tokio::test]
async fn test_scheduled_work_keeps_its_future_available_at() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let queue = JobQueue::new(provider, test_config());

    let tonight = Utc::now() + ChronoDuration::hours(3);
    let id = queue
        .enqueue(
            JobType::ProactiveCheckin,
            json!({"user_id": Uuid::new_v4()}),
            Some(tonight),
            None,
        )
        .await?;

    assert_eq!(queue.job(id).await?.available_at, tonight);
    Ok(())
}

#[tokio::test]
async fn test_unknown_job_id_is_not_found() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let queue = JobQueue::new(provider, test_config());

    let missing = Uuid::new_v4();
    assert!(matches!(
        queue.job(missing).await,
        Err(ApplicationError::Db(DbError::JobNotFound(id))) if id == missing
    ));
    assert!(matches!(
        queue.events(missing).await,
        Err(ApplicationError::Db(DbError::JobNotFound(_)))
    ));
    Ok(())
}

/// End-to-end failure path: a voice interaction job with three attempts
/// against a handler that never recovers.
#[tokio::test]
async fn test_voice_interaction_retries_to_dead_with_full_event_trail() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let config = test_config();
    let queue = JobQueue::new(provider.clone(), config.clone());

    let handler = Arc::new(AlwaysRetryable::new("transcription service down"));
    let mut registry = JobRegistry::new();
    registry.register(JobType::ProcessVoiceInteraction, handler.clone());
    let worker = JobWorker::new(provider, Arc::new(registry), config);

    let id = queue
        .enqueue(JobType::ProcessVoiceInteraction, voice_payload(), None, Some(3))
        .await?;

    for _ in 0..3 {
        assert_eq!(worker.poll_once().await?, Some(id));
        tokio::time::sleep(Duration::from_millis(600)).await;
    }

    let job = queue.job(id).await?;
    assert_eq!(job.status, JobStatus::Dead);
    assert_eq!(job.attempt_count, 3);
    assert_eq!(handler.calls(), 3);

    // No further claims are possible.
    assert_eq!(worker.poll_once().await?, None);

    use JobStatus::*;
    let trail: Vec<_> = queue
        .events(id)
        .await?
        .iter()
        .map(|e| (e.from_status, e.to_status))
        .collect();
    assert_eq!(
        trail,
        vec![
            (None, Pending),
            (Some(Pending), Claimed),
            (Some(Claimed), Running),
            (Some(Running), Pending),
            (Some(Pending), Claimed),
            (Some(Claimed), Running),
            (Some(Running), Pending),
            (Some(Pending), Claimed),
            (Some(Claimed), Running),
            (Some(Running), Dead),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_replaying_events_reconstructs_the_final_status() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let config = test_config();
    let queue = JobQueue::new(provider.clone(), config.clone());

    let mut registry = JobRegistry::new();
    registry.register(JobType::SummarizeProfile, Arc::new(AlwaysSucceeds::new()));
    let worker = JobWorker::new(provider, Arc::new(registry), config);

    let id = queue
        .enqueue(
            JobType::SummarizeProfile,
            json!({"user_id": Uuid::new_v4()}),
            None,
            None,
        )
        .await?;
    worker.poll_once().await?;

    let job = queue.job(id).await?;
    let events = queue.events(id).await?;

    // Each event chains onto the previous one...
    for pair in events.windows(2) {
        assert_eq!(pair[1].from_status, Some(pair[0].to_status));
    }
    // ...and folding the trail lands on the job's current status.
    let replayed = events.last().map(|e| e.to_status);
    assert_eq!(replayed, Some(job.status));
    Ok(())
}

#[tokio::test]
async fn test_recent_events_filter_by_type_and_status() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let config = test_config();
    let queue = JobQueue::new(provider.clone(), config.clone());

    let mut registry = JobRegistry::new();
    registry.register(JobType::SummarizeProfile, Arc::new(AlwaysSucceeds::new()));
    let worker = JobWorker::new(provider, Arc::new(registry), config);

    let summarize_id = queue
        .enqueue(
            JobType::SummarizeProfile,
            json!({"user_id": Uuid::new_v4()}),
            None,
            None,
        )
        .await?;
    // Scheduled far out so the poll below can only pick up the summary job.
    queue
        .enqueue(
            JobType::ProcessVoiceInteraction,
            voice_payload(),
            Some(Utc::now() + ChronoDuration::hours(1)),
            None,
        )
        .await?;
    worker.poll_once().await?;

    let voice_only = queue
        .recent_events(Some(JobType::ProcessVoiceInteraction), None, 50)
        .await?;
    assert_eq!(voice_only.len(), 1);
    assert!(voice_only.iter().all(|e| e.job_type == JobType::ProcessVoiceInteraction));

    let succeeded = queue
        .recent_events(None, Some(JobStatus::Succeeded), 50)
        .await?;
    assert_eq!(succeeded.len(), 1);
    assert_eq!(succeeded[0].job_id, summarize_id);

    // Newest first, bounded by the limit.
    let limited = queue.recent_events(None, None, 2).await?;
    assert_eq!(limited.len(), 2);
    assert!(limited[0].occurred_at >= limited[1].occurred_at);
    Ok(())
}
