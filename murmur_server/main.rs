use std::sync::Arc;

use murmur_app::{
    config::Config,
    job_registry::default_registry,
    jobs::{queue::JobQueue, reconciler::LeaseReconciler, worker::JobWorker},
};
use murmur_db::{establish_connection_pool, uow::PostgresUnitOfWorkProvider};
use murmur_types::{Result, errors::ApplicationError};

mod http;
mod logs;
mod pipeline;

use http::{ApiRouter, AppState};
use logs::setup_logging;
use pipeline::HttpPipelineClient;

#[tokio::main]
#[cfg(not(tarpaulin_include))]
async fn main() -> Result<(), ApplicationError> {
    setup_logging();

    let config = Arc::new(Config::from_env());
    let db_pool = establish_connection_pool().await?;

    sqlx::migrate!("../migrations")
        .run(&db_pool)
        .await
        .map_err(|e| ApplicationError::Unknown(e.to_string()))?;

    let uow_provider = Arc::new(PostgresUnitOfWorkProvider::new(db_pool));
    let pipeline = Arc::new(HttpPipelineClient::new(&config.pipeline_url)?);
    let registry = Arc::new(default_registry(pipeline));

    for _ in 0..config.worker_count {
        let worker = Arc::new(JobWorker::new(
            uow_provider.clone(),
            registry.clone(),
            config.clone(),
        ));
        worker.run();
    }

    let reconciler = Arc::new(LeaseReconciler::new(uow_provider.clone(), config.clone()));
    reconciler.run();

    let queue = Arc::new(JobQueue::new(uow_provider, config.clone()));
    ApiRouter::serve(AppState { queue }, config.http_port).await
}
