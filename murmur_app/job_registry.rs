use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    gateway::PipelineClient,
    job_handlers::{
        proactive_checkin::ProactiveCheckinHandler,
        process_voice_interaction::ProcessVoiceInteractionHandler,
        summarize_profile::SummarizeProfileHandler,
    },
    jobs::{JobType, handler::JobHandler},
};

/// Maps a job type to the handler that consumes it. New job types register
/// independently; the worker loop never changes.
#[derive(Default)]
pub struct JobRegistry {
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler` for `job_type`, replacing any previous entry.
    pub fn register(&mut self, job_type: JobType, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(job_type, handler);
    }

    pub fn get(&self, job_type: JobType) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(&job_type).cloned()
    }
}

/// The production registry: every known job type wired to its pipeline
/// handler. Called at worker startup.
pub fn default_registry(pipeline: Arc<dyn PipelineClient>) -> JobRegistry {
    let mut registry = JobRegistry::new();
    registry.register(
        JobType::ProcessVoiceInteraction,
        Arc::new(ProcessVoiceInteractionHandler::new(pipeline.clone())),
    );
    registry.register(
        JobType::SummarizeProfile,
        Arc::new(SummarizeProfileHandler::new(pipeline.clone())),
    );
    registry.register(
        JobType::ProactiveCheckin,
        Arc::new(ProactiveCheckinHandler::new(pipeline)),
    );
    registry
}
