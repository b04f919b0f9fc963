//! Batch storage boundary.
//!
//! This module defines a storage-facing abstraction for loading and saving
//! batches without making any storage assumptions. Two adapters implement it:
//! [`InMemoryBatchRepository`] for tests and development, and
//! [`PostgresBatchRepository`] for durable storage.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryBatchRepository;
pub use postgres::PostgresBatchRepository;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use stocklot_allocation::Batch;
use stocklot_core::BatchRef;

/// Batch storage operation error.
///
/// These are **infrastructure errors** (missing rows, key conflicts, I/O)
/// as opposed to the domain's allocation errors.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No batch with this reference exists.
    #[error("batch {0} not found")]
    NotFound(BatchRef),

    /// A batch with this reference already exists.
    #[error("batch {0} already exists")]
    Duplicate(BatchRef),

    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Storage boundary for batches.
///
/// `add` is insert-only and `update` requires the batch to exist; the split
/// keeps accidental overwrites loud. `list` returns every stored batch
/// ordered by reference, so allocation always runs against a deterministic
/// candidate set.
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// Insert a new batch.
    ///
    /// Fails with [`RepositoryError::Duplicate`] if the reference is taken.
    async fn add(&self, batch: &Batch) -> Result<(), RepositoryError>;

    /// Load one batch by reference.
    async fn get(&self, reference: &BatchRef) -> Result<Batch, RepositoryError>;

    /// Persist the current state of an existing batch, allocations included.
    async fn update(&self, batch: &Batch) -> Result<(), RepositoryError>;

    /// Load every stored batch, ordered by reference.
    async fn list(&self) -> Result<Vec<Batch>, RepositoryError>;
}

#[async_trait]
impl<R> BatchRepository for Arc<R>
where
    R: BatchRepository + ?Sized,
{
    async fn add(&self, batch: &Batch) -> Result<(), RepositoryError> {
        (**self).add(batch).await
    }

    async fn get(&self, reference: &BatchRef) -> Result<Batch, RepositoryError> {
        (**self).get(reference).await
    }

    async fn update(&self, batch: &Batch) -> Result<(), RepositoryError> {
        (**self).update(batch).await
    }

    async fn list(&self) -> Result<Vec<Batch>, RepositoryError> {
        (**self).list().await
    }
}
