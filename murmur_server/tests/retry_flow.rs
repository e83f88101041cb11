use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use murmur_app::{
    config::Config,
    job_registry::JobRegistry,
    jobs::{JobStatus, JobType, handler::JobHandler, queue::JobQueue, worker::JobWorker},
    test_utils::tests::{
        AlwaysFatal, AlwaysRetryable, AlwaysSucceeds, FailsNTimes, MemUnitOfWorkProvider,
    },
};
use murmur_types::Result;

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

struct Harness {
    queue: JobQueue,
    worker: JobWorker,
}

fn harness(job_type: JobType, handler: Arc<dyn JobHandler>) -> Harness {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let config = test_config();

    let mut registry = JobRegistry::new();
    registry.register(job_type, handler);

    Harness {
        queue: JobQueue::new(provider.clone(), config.clone()),
        worker: JobWorker::new(provider, Arc::new(registry), config),
    }
}

fn summarize_payload() -> serde_json::Value {
    json!({"user_id": Uuid::new_v4()})
}

/// Generous margin over backoff_cap plus jitter so a pending retry is
/// always claimable again by the time we poll.
async fn wait_for_backoff() {
    tokio::time::sleep(Duration::from_millis(600)).await;
}

#[tokio::test]
async fn test_success_attaches_result_and_records_every_transition() -> Result<()> {
    let handler = Arc::new(AlwaysSucceeds::with_result(Some(json!({"summary": "ok"}))));
    let h = harness(JobType::SummarizeProfile, handler.clone());

    let id = h
        .queue
        .enqueue(JobType::SummarizeProfile, summarize_payload(), None, None)
        .await?;

    assert_eq!(h.worker.poll_once().await?, Some(id));

    let job = h.queue.job(id).await?;
    assert_eq!(job.status, JobStatus::Succeeded);
    assert_eq!(job.attempt_count, 1);
    assert_eq!(job.result, Some(json!({"summary": "ok"})));
    assert_eq!(handler.calls(), 1);

    let events = h.queue.events(id).await?;
    let trail: Vec<_> = events.iter().map(|e| (e.from_status, e.to_status)).collect();
    assert_eq!(
        trail,
        vec![
            (None, JobStatus::Pending),
            (Some(JobStatus::Pending), JobStatus::Claimed),
            (Some(JobStatus::Claimed), JobStatus::Running),
            (Some(JobStatus::Running), JobStatus::Succeeded),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_retryable_failure_requeues_with_backoff() -> Result<()> {
    let handler = Arc::new(AlwaysRetryable::new("upstream timeout"));
    let h = harness(JobType::SummarizeProfile, handler.clone());

    let id = h
        .queue
        .enqueue(JobType::SummarizeProfile, summarize_payload(), None, Some(3))
        .await?;

    let before = Utc::now();
    assert_eq!(h.worker.poll_once().await?, Some(id));

    let job = h.queue.job(id).await?;
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempt_count, 1);
    assert!(job.claimed_by.is_none());
    assert!(job.available_at > before, "retry must be delayed");
    assert_eq!(job.last_error.as_deref(), Some("upstream timeout"));
    assert_eq!(handler.calls(), 1);

    // Not yet eligible: the backoff delay is still running.
    assert_eq!(h.worker.poll_once().await?, None);
    Ok(())
}

#[tokio::test]
async fn test_available_at_strictly_grows_across_retries() -> Result<()> {
    let handler = Arc::new(AlwaysRetryable::new("still down"));
    let h = harness(JobType::SummarizeProfile, handler);

    let id = h
        .queue
        .enqueue(JobType::SummarizeProfile, summarize_payload(), None, Some(3))
        .await?;

    assert_eq!(h.worker.poll_once().await?, Some(id));
    let first_retry_at = h.queue.job(id).await?.available_at;

    wait_for_backoff().await;
    assert_eq!(h.worker.poll_once().await?, Some(id));
    let second_retry_at = h.queue.job(id).await?.available_at;

    assert!(second_retry_at > first_retry_at);
    Ok(())
}

#[tokio::test]
async fn test_job_dies_after_exactly_max_attempts() -> Result<()> {
    let handler = Arc::new(AlwaysRetryable::new("upstream timeout"));
    let h = harness(JobType::SummarizeProfile, handler.clone());

    let id = h
        .queue
        .enqueue(JobType::SummarizeProfile, summarize_payload(), None, Some(3))
        .await?;

    for attempt in 1..=3 {
        assert_eq!(h.worker.poll_once().await?, Some(id), "attempt {attempt}");
        wait_for_backoff().await;
    }

    let job = h.queue.job(id).await?;
    assert_eq!(job.status, JobStatus::Dead);
    assert_eq!(job.attempt_count, 3, "never a fourth attempt");
    assert_eq!(handler.calls(), 3);

    // Dead jobs are out of the pool for good.
    assert_eq!(h.worker.poll_once().await?, None);
    assert_eq!(handler.calls(), 3);
    Ok(())
}

#[tokio::test]
async fn test_fatal_failure_kills_the_job_immediately() -> Result<()> {
    let handler = Arc::new(AlwaysFatal::new("malformed audio artifact"));
    let h = harness(JobType::SummarizeProfile, handler);

    let id = h
        .queue
        .enqueue(JobType::SummarizeProfile, summarize_payload(), None, Some(5))
        .await?;

    assert_eq!(h.worker.poll_once().await?, Some(id));

    let job = h.queue.job(id).await?;
    assert_eq!(job.status, JobStatus::Dead);
    assert_eq!(job.attempt_count, 1, "fatal errors burn no further attempts");
    assert_eq!(job.last_error.as_deref(), Some("malformed audio artifact"));

    assert_eq!(h.worker.poll_once().await?, None);
    Ok(())
}

#[tokio::test]
async fn test_unregistered_job_type_is_fatal() -> Result<()> {
    // Registry only knows about summaries; check-ins have no handler.
    let h = harness(JobType::SummarizeProfile, Arc::new(AlwaysSucceeds::new()));

    let id = h
        .queue
        .enqueue(
            JobType::ProactiveCheckin,
            json!({"user_id": Uuid::new_v4()}),
            None,
            None,
        )
        .await?;

    assert_eq!(h.worker.poll_once().await?, Some(id));

    let job = h.queue.job(id).await?;
    assert_eq!(job.status, JobStatus::Dead);
    assert!(
        job.last_error.as_deref().unwrap_or_default().contains("No job handler"),
        "unexpected error: {:?}",
        job.last_error
    );
    Ok(())
}

#[tokio::test]
async fn test_job_recovers_after_transient_failures() -> Result<()> {
    let handler = Arc::new(FailsNTimes::new(1));
    let h = harness(JobType::SummarizeProfile, handler.clone());

    let id = h
        .queue
        .enqueue(JobType::SummarizeProfile, summarize_payload(), None, Some(3))
        .await?;

    assert_eq!(h.worker.poll_once().await?, Some(id));
    assert_eq!(h.queue.job(id).await?.status, JobStatus::Pending);

    wait_for_backoff().await;
    assert_eq!(h.worker.poll_once().await?, Some(id));

    let job = h.queue.job(id).await?;
    assert_eq!(job.status, JobStatus::Succeeded);
    assert_eq!(job.attempt_count, 2);
    assert_eq!(job.result, Some(json!({"recovered": true})));
    assert_eq!(handler.calls(), 2);
    Ok(())
}
