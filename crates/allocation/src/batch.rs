//! Purchase batch entity.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stocklot_core::{AllocationError, AllocationResult, BatchRef, Entity, OrderRef, Sku};

use crate::order_line::OrderLine;

/// A quantity of one product purchased in a single consignment.
///
/// A batch with `eta: None` is warehouse stock; a batch with an ETA is still
/// inbound on a shipment. The batch records which order lines it has
/// committed stock to, and derives its free stock from the purchased total
/// minus those commitments. The free quantity is never stored, so the books
/// cannot drift.
///
/// Batches are entities: two batches with the same reference are the same
/// batch no matter how their stock levels differ. `PartialEq` and `Hash`
/// are written by hand to enforce that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    reference: BatchRef,
    sku: Sku,
    purchased_quantity: i64,
    eta: Option<NaiveDate>,
    allocations: HashSet<OrderLine>,
}

impl Batch {
    /// Create a fresh batch with no allocations.
    pub fn new(
        reference: impl Into<BatchRef>,
        sku: impl Into<Sku>,
        purchased_quantity: i64,
        eta: Option<NaiveDate>,
    ) -> Self {
        Self {
            reference: reference.into(),
            sku: sku.into(),
            purchased_quantity,
            eta,
            allocations: HashSet::new(),
        }
    }

    /// Rebuild a batch from stored state, allocations included.
    ///
    /// This path skips the allocation gates: the lines were checked when
    /// first allocated, and a stored batch must round-trip unchanged.
    pub fn rehydrate(
        reference: impl Into<BatchRef>,
        sku: impl Into<Sku>,
        purchased_quantity: i64,
        eta: Option<NaiveDate>,
        allocations: impl IntoIterator<Item = OrderLine>,
    ) -> Self {
        Self {
            reference: reference.into(),
            sku: sku.into(),
            purchased_quantity,
            eta,
            allocations: allocations.into_iter().collect(),
        }
    }

    pub fn reference(&self) -> &BatchRef {
        &self.reference
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn purchased_quantity(&self) -> i64 {
        self.purchased_quantity
    }

    /// Estimated arrival date. `None` means the stock is already in the
    /// warehouse, which sorts ahead of every dated shipment.
    pub fn eta(&self) -> Option<NaiveDate> {
        self.eta
    }

    /// Order lines this batch has committed stock to.
    pub fn allocations(&self) -> &HashSet<OrderLine> {
        &self.allocations
    }

    /// Quantity committed to order lines.
    pub fn allocated_quantity(&self) -> i64 {
        self.allocations.iter().map(OrderLine::quantity).sum()
    }

    /// Quantity still free to promise.
    pub fn available_quantity(&self) -> i64 {
        self.purchased_quantity - self.allocated_quantity()
    }

    /// Whether a fresh allocation of `line` would be accepted.
    pub fn can_allocate(&self, line: &OrderLine) -> bool {
        self.sku == *line.sku()
            && line.quantity() > 0
            && self.available_quantity() >= line.quantity()
    }

    /// Commit stock to an order line.
    ///
    /// A line for an order this batch already holds stock for is accepted
    /// and ignored, whatever its quantity: re-running a command must not
    /// consume more stock. Every rejection leaves the batch untouched.
    pub fn allocate(&mut self, line: OrderLine) -> AllocationResult<()> {
        self.ensure_sku(&line)?;
        if self.holds_allocation_for(line.order_ref()) {
            return Ok(());
        }
        if line.quantity() <= 0 {
            return Err(AllocationError::quantity_not_positive(line.quantity()));
        }
        let available = self.available_quantity();
        if available < line.quantity() {
            return Err(AllocationError::insufficient_stock(
                self.reference.clone(),
                line.quantity(),
                available,
            ));
        }
        self.allocations.insert(line);
        Ok(())
    }

    /// Release the stock committed to `line`.
    ///
    /// Removing a line that is not allocated here does nothing; releasing
    /// must be safe to replay.
    pub fn deallocate(&mut self, line: &OrderLine) {
        self.allocations.remove(line);
    }

    fn ensure_sku(&self, line: &OrderLine) -> AllocationResult<()> {
        if self.sku != *line.sku() {
            return Err(AllocationError::sku_mismatch(
                self.reference.clone(),
                self.sku.clone(),
                line.sku().clone(),
            ));
        }
        Ok(())
    }

    fn holds_allocation_for(&self, order_ref: &OrderRef) -> bool {
        self.allocations.iter().any(|l| l.order_ref() == order_ref)
    }
}

impl Entity for Batch {
    type Id = BatchRef;

    fn id(&self) -> &Self::Id {
        &self.reference
    }
}

// Identity equality: a batch is its reference.
impl PartialEq for Batch {
    fn eq(&self, other: &Self) -> bool {
        self.reference == other.reference
    }
}

impl Eq for Batch {}

impl Hash for Batch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.reference.hash(state);
    }
}
