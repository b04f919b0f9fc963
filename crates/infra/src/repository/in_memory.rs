use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stocklot_allocation::Batch;
use stocklot_core::BatchRef;

use super::{BatchRepository, RepositoryError};

/// In-memory batch repository.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryBatchRepository {
    batches: RwLock<HashMap<BatchRef, Batch>>,
}

impl InMemoryBatchRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BatchRepository for InMemoryBatchRepository {
    async fn add(&self, batch: &Batch) -> Result<(), RepositoryError> {
        let mut batches = self
            .batches
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;

        if batches.contains_key(batch.reference()) {
            return Err(RepositoryError::Duplicate(batch.reference().clone()));
        }
        batches.insert(batch.reference().clone(), batch.clone());
        Ok(())
    }

    async fn get(&self, reference: &BatchRef) -> Result<Batch, RepositoryError> {
        let batches = self
            .batches
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;

        batches
            .get(reference)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(reference.clone()))
    }

    async fn update(&self, batch: &Batch) -> Result<(), RepositoryError> {
        let mut batches = self
            .batches
            .write()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;

        match batches.get_mut(batch.reference()) {
            Some(stored) => {
                *stored = batch.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(batch.reference().clone())),
        }
    }

    async fn list(&self) -> Result<Vec<Batch>, RepositoryError> {
        let batches = self
            .batches
            .read()
            .map_err(|_| RepositoryError::Storage("lock poisoned".to_string()))?;

        let mut all: Vec<Batch> = batches.values().cloned().collect();
        all.sort_by(|a, b| a.reference().cmp(b.reference()));
        Ok(all)
    }
}
