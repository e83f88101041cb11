use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use uuid::Uuid;

use murmur_app::{
    jobs::{Job, JobStatus, JobType},
    test_utils::tests::MemUnitOfWorkProvider,
    uow::{UnitOfWork, UnitOfWorkProvider},
};
use murmur_types::Result;

fn summarize_job(available_at: chrono::DateTime<Utc>) -> Job {
    Job::new(
        JobType::SummarizeProfile,
        json!({"user_id": Uuid::new_v4()}),
        available_at,
        3,
    )
}

async fn add_job(provider: &MemUnitOfWorkProvider, job: &Job) -> Result<()> {
    let uow = provider.begin().await?;
    uow.jobs().add(job).await?;
    uow.commit().await?;
    Ok(())
}

#[tokio::test]
async fn test_exactly_one_claimer_wins_a_single_job() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let job = summarize_job(Utc::now());
    add_job(&provider, &job).await?;

    let mut handles = Vec::new();
    for i in 0..8 {
        let provider = provider.clone();
        handles.push(tokio::spawn(async move {
            let uow = provider.begin().await.unwrap();
            let claimed = uow
                .jobs()
                .claim_next(&format!("worker-{i}"))
                .await
                .unwrap();
            uow.commit().await.unwrap();
            claimed
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "expected exactly one winning claim");

    let uow = provider.begin().await?;
    let stored = uow.jobs().get_by_id(job.id).await?;
    uow.commit().await?;

    assert_eq!(stored.status, JobStatus::Claimed);
    assert_eq!(stored.attempt_count, 1);
    assert!(stored.claimed_by.is_some());
    assert!(stored.claimed_at.is_some());
    Ok(())
}

#[tokio::test]
async fn test_losing_poller_sees_no_work_not_an_error() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let job = summarize_job(Utc::now());
    add_job(&provider, &job).await?;

    let first = {
        let uow = provider.begin().await?;
        let claimed = uow.jobs().claim_next("poller-a").await?;
        uow.commit().await?;
        claimed
    };
    let second = {
        let uow = provider.begin().await?;
        let claimed = uow.jobs().claim_next("poller-b").await?;
        uow.commit().await?;
        claimed
    };

    assert!(first.is_some());
    assert!(second.is_none(), "second poller should simply find no work");
    Ok(())
}

#[tokio::test]
async fn test_claims_follow_available_at_order() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let now = Utc::now();

    let third = summarize_job(now - ChronoDuration::seconds(1));
    let first = summarize_job(now - ChronoDuration::seconds(30));
    let second = summarize_job(now - ChronoDuration::seconds(10));
    for job in [&first, &second, &third] {
        add_job(&provider, job).await?;
    }

    let mut claimed_order = Vec::new();
    for _ in 0..3 {
        let uow = provider.begin().await?;
        let claimed = uow.jobs().claim_next("poller").await?.expect("job available");
        uow.commit().await?;
        claimed_order.push(claimed.id);
    }

    assert_eq!(claimed_order, vec![first.id, second.id, third.id]);
    Ok(())
}

#[tokio::test]
async fn test_future_jobs_are_invisible_until_available() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let job = summarize_job(Utc::now() + ChronoDuration::milliseconds(300));
    add_job(&provider, &job).await?;

    let uow = provider.begin().await?;
    assert!(uow.jobs().claim_next("poller").await?.is_none());
    uow.commit().await?;

    tokio::time::sleep(Duration::from_millis(400)).await;

    let uow = provider.begin().await?;
    let claimed = uow.jobs().claim_next("poller").await?;
    uow.commit().await?;
    assert_eq!(claimed.map(|j| j.id), Some(job.id));
    Ok(())
}

#[tokio::test]
async fn test_claimed_jobs_are_not_claimable_again() -> Result<()> {
    let provider = Arc::new(MemUnitOfWorkProvider::new());
    let job = summarize_job(Utc::now());
    add_job(&provider, &job).await?;

    let uow = provider.begin().await?;
    assert!(uow.jobs().claim_next("poller-a").await?.is_some());
    assert!(uow.jobs().claim_next("poller-b").await?.is_none());
    uow.commit().await?;
    Ok(())
}
