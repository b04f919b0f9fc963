//! Order line value object.

use serde::{Deserialize, Serialize};

use stocklot_core::{OrderRef, Sku, ValueObject};

/// One order's demand for a quantity of a single product.
///
/// Lines are immutable values: two lines with the same order reference, sku
/// and quantity state the same fact, wherever they came from. [`Batch`]
/// relies on that to keep allocations in a `HashSet` and to drop a repeated
/// allocation of an identical line.
///
/// [`Batch`]: crate::batch::Batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderLine {
    order_ref: OrderRef,
    sku: Sku,
    quantity: i64,
}

impl OrderLine {
    /// Build a line.
    ///
    /// The quantity is not validated here. A line is a record of what a
    /// customer asked for; whether it can be honoured is decided at
    /// allocation time.
    pub fn new(order_ref: impl Into<OrderRef>, sku: impl Into<Sku>, quantity: i64) -> Self {
        Self {
            order_ref: order_ref.into(),
            sku: sku.into(),
            quantity,
        }
    }

    pub fn order_ref(&self) -> &OrderRef {
        &self.order_ref
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }
}

impl ValueObject for OrderLine {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn lines_with_equal_fields_are_equal() {
        let a = OrderLine::new("order-001", "SMALL-TABLE", 10);
        let b = OrderLine::new("order-001", "SMALL-TABLE", 10);
        assert_eq!(a, b);
    }

    #[test]
    fn lines_with_different_quantities_are_not_equal() {
        let a = OrderLine::new("order-001", "SMALL-TABLE", 10);
        let b = OrderLine::new("order-001", "SMALL-TABLE", 11);
        assert_ne!(a, b);
    }

    #[test]
    fn equal_lines_collapse_in_a_set() {
        let mut set = HashSet::new();
        set.insert(OrderLine::new("order-001", "SMALL-TABLE", 10));
        set.insert(OrderLine::new("order-001", "SMALL-TABLE", 10));
        set.insert(OrderLine::new("order-002", "SMALL-TABLE", 10));

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn serializes_as_flat_fields() {
        let line = OrderLine::new("order-001", "SMALL-TABLE", 10);

        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "order_ref": "order-001",
                "sku": "SMALL-TABLE",
                "quantity": 10
            })
        );
    }
}
