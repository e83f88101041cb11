pub mod config;
pub mod gateway;
pub mod job_handlers;
pub mod job_registry;
pub mod jobs;
pub mod repository;
pub mod uow;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
