use std::sync::Arc;

use murmur_types::errors::ApplicationError;

use crate::repository::{EventRepository, JobRepository};

/// A Unit of Work (UoW) works as a provider for repositories that all
/// operate within a single transaction. A lifecycle transition and its
/// event record go through one UoW so they commit atomically or not at all.
#[async_trait::async_trait]
pub trait UnitOfWork<'a>: Send + Sync {
    fn jobs(&self) -> Arc<dyn JobRepository + 'a>;
    fn events(&self) -> Arc<dyn EventRepository + 'a>;

    // Transaction control methods
    // Consume self to ensure the UoW is not used after commit/rollback
    async fn commit(self: Box<Self>) -> Result<(), ApplicationError>;
    async fn rollback(self: Box<Self>) -> Result<(), ApplicationError>;
}

/// A factory for creating Unit of Work instances.
#[async_trait::async_trait]
pub trait UnitOfWorkProvider: Send + Sync {
    /// Begin a new Unit of Work (transaction).
    async fn begin<'p>(&'p self) -> Result<Box<dyn UnitOfWork<'p> + 'p>, ApplicationError>;
}
