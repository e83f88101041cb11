use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A unit of background work. All state lives in the job store; workers
/// hold nothing beyond the claim lease.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub job_type: JobType,
    pub payload: Value,
    pub status: JobStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    /// The job is invisible to pollers until this instant. Never decreases
    /// across retries of the same job.
    pub available_at: DateTime<Utc>,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub result: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(job_type: JobType, payload: Value, available_at: DateTime<Utc>, max_attempts: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            job_type,
            payload,
            status: JobStatus::Pending,
            attempt_count: 0,
            max_attempts,
            available_at,
            claimed_by: None,
            claimed_at: None,
            last_error: None,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a poller may claim this job at `now`.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.available_at <= now
    }

    /// Whether the retry budget allows another attempt after a failure.
    pub fn attempts_remaining(&self) -> bool {
        self.attempt_count < self.max_attempts
    }
}

/// The kinds of background work the companion backend enqueues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    ProcessVoiceInteraction,
    SummarizeProfile,
    ProactiveCheckin,
}

impl JobType {
    pub fn from_str(job_type: &str) -> Option<Self> {
        match job_type {
            "PROCESS_VOICE_INTERACTION" => Some(Self::ProcessVoiceInteraction),
            "SUMMARIZE_PROFILE" => Some(Self::SummarizeProfile),
            "PROACTIVE_CHECKIN" => Some(Self::ProactiveCheckin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProcessVoiceInteraction => "PROCESS_VOICE_INTERACTION",
            Self::SummarizeProfile => "SUMMARIZE_PROFILE",
            Self::ProactiveCheckin => "PROACTIVE_CHECKIN",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Claimed,
    Running,
    Succeeded,
    /// No lifecycle edge produces this; kept so operators can park a job
    /// manually. The claim query never selects it.
    Failed,
    Dead,
}

impl JobStatus {
    /// Statuses that represent an active claim lease.
    pub fn is_leased(&self) -> bool {
        matches!(self, Self::Claimed | Self::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_job_new() {
        let payload = json!({"user_id": Uuid::new_v4()});
        let available_at = Utc::now();

        let before_creation = Utc::now();
        let job = Job::new(JobType::SummarizeProfile, payload.clone(), available_at, 3);
        let after_creation = Utc::now();

        assert_eq!(job.job_type, JobType::SummarizeProfile);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempt_count, 0);
        assert_eq!(job.max_attempts, 3);
        assert_eq!(job.payload, payload);
        assert!(job.claimed_by.is_none());
        assert!(job.claimed_at.is_none());
        assert!(job.last_error.is_none());
        assert!(job.result.is_none());

        assert!(job.created_at >= before_creation && job.created_at <= after_creation);
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn test_eligibility_respects_available_at() {
        let now = Utc::now();
        let mut job = Job::new(JobType::ProactiveCheckin, json!({}), now + Duration::seconds(10), 3);

        assert!(!job.is_eligible(now));
        assert!(job.is_eligible(now + Duration::seconds(10)));

        job.status = JobStatus::Dead;
        assert!(!job.is_eligible(now + Duration::seconds(10)));
    }

    #[test]
    fn test_job_type_wire_format_round_trip() {
        for job_type in [
            JobType::ProcessVoiceInteraction,
            JobType::SummarizeProfile,
            JobType::ProactiveCheckin,
        ] {
            assert_eq!(JobType::from_str(job_type.as_str()), Some(job_type));
        }
        assert_eq!(JobType::from_str("MAKE_COFFEE"), None);
    }
}
