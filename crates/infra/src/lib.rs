//! Infrastructure layer: storage adapters for the allocation domain.

pub mod repository;


pub use repository::{
    BatchRepository, InMemoryBatchRepository, PostgresBatchRepository, RepositoryError,
};
