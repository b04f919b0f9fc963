//! Domain error model.

use thiserror::Error;

use crate::id::{BatchRef, Sku};

/// Result type used across the domain layer.
pub type AllocationResult<T> = Result<T, AllocationError>;

/// Allocation failure.
///
/// Keep this focused on deterministic, business/domain failures. Storage
/// concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// No candidate batch can satisfy the order line.
    #[error("out of stock for sku {sku}")]
    OutOfStock { sku: Sku },

    /// The order line names a different product than the batch holds.
    #[error("batch {batch} holds sku {batch_sku}, not {line_sku}")]
    SkuMismatch {
        batch: BatchRef,
        batch_sku: Sku,
        line_sku: Sku,
    },

    /// The order line quantity is zero or negative.
    #[error("order line quantity must be positive, got {quantity}")]
    QuantityNotPositive { quantity: i64 },

    /// The batch has too little uncommitted stock for the line.
    #[error("batch {batch} has {available} available, requested {requested}")]
    InsufficientStock {
        batch: BatchRef,
        requested: i64,
        available: i64,
    },
}

impl AllocationError {
    pub fn out_of_stock(sku: impl Into<Sku>) -> Self {
        Self::OutOfStock { sku: sku.into() }
    }

    pub fn sku_mismatch(
        batch: impl Into<BatchRef>,
        batch_sku: impl Into<Sku>,
        line_sku: impl Into<Sku>,
    ) -> Self {
        Self::SkuMismatch {
            batch: batch.into(),
            batch_sku: batch_sku.into(),
            line_sku: line_sku.into(),
        }
    }

    pub fn quantity_not_positive(quantity: i64) -> Self {
        Self::QuantityNotPositive { quantity }
    }

    pub fn insufficient_stock(batch: impl Into<BatchRef>, requested: i64, available: i64) -> Self {
        Self::InsufficientStock {
            batch: batch.into(),
            requested,
            available,
        }
    }
}
