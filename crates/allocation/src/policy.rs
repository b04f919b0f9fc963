//! Allocation policy: which batch serves an order line.

use stocklot_core::{AllocationError, AllocationResult, BatchRef};

use crate::batch::Batch;
use crate::order_line::OrderLine;

/// Allocate `line` to the most preferable batch that can take it.
///
/// Warehouse stock (`eta: None`) is preferred over any shipment, and
/// shipments are tried by earliest arrival. Ties keep the caller's order:
/// the sort is stable and runs over indices, so `batches` itself is never
/// reordered. Batches that cannot take the line, wrong sku or too little
/// free stock, are skipped rather than treated as errors; only when no
/// batch qualifies is the sku out of stock.
///
/// Exactly one batch is mutated, and only on success. A line is never
/// split across batches.
pub fn allocate(line: &OrderLine, batches: &mut [Batch]) -> AllocationResult<BatchRef> {
    let mut preference: Vec<usize> = (0..batches.len()).collect();
    preference.sort_by_key(|&idx| batches[idx].eta());

    for idx in preference {
        if batches[idx].can_allocate(line) {
            batches[idx].allocate(line.clone())?;
            return Ok(batches[idx].reference().clone());
        }
    }

    Err(AllocationError::out_of_stock(line.sku().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use proptest::prelude::*;

    const SKU: &str = "RETRO-CLOCK";

    fn day(offset: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap() + Days::new(u64::from(offset))
    }

    #[test]
    fn prefers_warehouse_stock_to_shipments() {
        let mut batches = vec![
            Batch::new("shipment-001", SKU, 100, Some(day(10))),
            Batch::new("in-stock-001", SKU, 100, None),
        ];
        let line = OrderLine::new("order-001", SKU, 10);

        let reference = allocate(&line, &mut batches).unwrap();

        assert_eq!(reference.as_str(), "in-stock-001");
        assert_eq!(batches[0].available_quantity(), 100);
        assert_eq!(batches[1].available_quantity(), 90);
    }

    #[test]
    fn prefers_earlier_shipments() {
        let mut batches = vec![
            Batch::new("normal-001", SKU, 100, Some(day(5))),
            Batch::new("slow-001", SKU, 100, Some(day(10))),
            Batch::new("speedy-001", SKU, 100, Some(day(1))),
        ];
        let line = OrderLine::new("order-001", SKU, 10);

        let reference = allocate(&line, &mut batches).unwrap();

        assert_eq!(reference.as_str(), "speedy-001");
        assert_eq!(batches[2].available_quantity(), 90);
        assert_eq!(batches[0].available_quantity(), 100);
        assert_eq!(batches[1].available_quantity(), 100);
    }

    #[test]
    fn ties_keep_the_callers_order() {
        let mut batches = vec![
            Batch::new("batch-001", SKU, 100, Some(day(3))),
            Batch::new("batch-002", SKU, 100, Some(day(3))),
        ];
        let line = OrderLine::new("order-001", SKU, 10);

        let reference = allocate(&line, &mut batches).unwrap();

        assert_eq!(reference.as_str(), "batch-001");
    }

    #[test]
    fn skips_batches_that_are_too_small() {
        let mut batches = vec![
            Batch::new("in-stock-001", SKU, 5, None),
            Batch::new("shipment-001", SKU, 100, Some(day(10))),
        ];
        let line = OrderLine::new("order-001", SKU, 10);

        let reference = allocate(&line, &mut batches).unwrap();

        assert_eq!(reference.as_str(), "shipment-001");
        assert_eq!(batches[0].available_quantity(), 5);
    }

    #[test]
    fn skips_batches_of_other_skus() {
        let mut batches = vec![
            Batch::new("in-stock-001", "DOG-BED", 100, None),
            Batch::new("shipment-001", SKU, 100, Some(day(10))),
        ];
        let line = OrderLine::new("order-001", SKU, 10);

        let reference = allocate(&line, &mut batches).unwrap();

        assert_eq!(reference.as_str(), "shipment-001");
        assert_eq!(batches[0].available_quantity(), 100);
    }

    #[test]
    fn out_of_stock_when_no_batch_can_take_the_line() {
        let mut batches = vec![Batch::new("batch-001", SKU, 10, Some(day(1)))];
        allocate(&OrderLine::new("order-001", SKU, 10), &mut batches).unwrap();

        let err = allocate(&OrderLine::new("order-002", SKU, 1), &mut batches).unwrap_err();

        match err {
            AllocationError::OutOfStock { sku } => assert_eq!(sku.as_str(), SKU),
            _ => panic!("Expected OutOfStock, got {err:?}"),
        }
    }

    #[test]
    fn out_of_stock_message_names_the_sku() {
        let err = allocate(&OrderLine::new("order-001", SKU, 1), &mut []).unwrap_err();

        assert!(err.to_string().contains("RETRO-CLOCK"));
    }

    #[test]
    fn a_line_is_never_split_across_batches() {
        let mut batches = vec![
            Batch::new("batch-001", SKU, 6, None),
            Batch::new("batch-002", SKU, 6, None),
        ];
        let line = OrderLine::new("order-001", SKU, 10);

        let err = allocate(&line, &mut batches).unwrap_err();

        match err {
            AllocationError::OutOfStock { .. } => {}
            _ => panic!("Expected OutOfStock, got {err:?}"),
        }
        assert_eq!(batches[0].available_quantity(), 6);
        assert_eq!(batches[1].available_quantity(), 6);
    }

    #[test]
    fn only_the_chosen_batch_changes() {
        let mut batches = vec![
            Batch::new("slow-001", SKU, 100, Some(day(10))),
            Batch::new("in-stock-001", SKU, 100, None),
            Batch::new("speedy-001", SKU, 100, Some(day(1))),
        ];
        let line = OrderLine::new("order-001", SKU, 10);

        allocate(&line, &mut batches).unwrap();

        assert!(batches[0].allocations().is_empty());
        assert_eq!(batches[1].allocations().len(), 1);
        assert!(batches[2].allocations().is_empty());
    }

    #[test]
    fn the_callers_slice_order_is_preserved() {
        let mut batches = vec![
            Batch::new("shipment-001", SKU, 100, Some(day(10))),
            Batch::new("in-stock-001", SKU, 100, None),
        ];
        let line = OrderLine::new("order-001", SKU, 10);

        allocate(&line, &mut batches).unwrap();

        assert_eq!(batches[0].reference().as_str(), "shipment-001");
        assert_eq!(batches[1].reference().as_str(), "in-stock-001");
    }

    #[test]
    fn reallocating_the_same_line_returns_the_same_batch() {
        let mut batches = vec![
            Batch::new("in-stock-001", SKU, 100, None),
            Batch::new("shipment-001", SKU, 100, Some(day(10))),
        ];
        let line = OrderLine::new("order-001", SKU, 10);

        let first = allocate(&line, &mut batches).unwrap();
        let second = allocate(&line, &mut batches).unwrap();

        assert_eq!(first, second);
        assert_eq!(batches[0].available_quantity(), 90);
        assert_eq!(batches[1].available_quantity(), 100);
    }

    #[test]
    fn empty_candidate_set_is_out_of_stock() {
        let err = allocate(&OrderLine::new("order-001", SKU, 1), &mut []).unwrap_err();

        match err {
            AllocationError::OutOfStock { sku } => assert_eq!(sku.as_str(), SKU),
            _ => panic!("Expected OutOfStock, got {err:?}"),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: The chosen batch always carries the earliest preference
        /// key (warehouse stock ahead of any shipment, then by ETA) among the
        /// batches that could take the line.
        #[test]
        fn chooses_the_most_preferable_candidate(
            pool in prop::collection::vec(
                (0i64..40, proptest::option::of(0u32..60)),
                1..12
            ),
            qty in 1i64..25
        ) {
            let mut batches: Vec<Batch> = pool
                .iter()
                .enumerate()
                .map(|(i, (size, eta_offset))| {
                    Batch::new(format!("batch-{i:03}"), SKU, *size, eta_offset.map(day))
                })
                .collect();
            let line = OrderLine::new("order-001", SKU, qty);

            let best_key = batches
                .iter()
                .filter(|b| b.can_allocate(&line))
                .map(|b| b.eta())
                .min();

            let result = allocate(&line, &mut batches);

            match best_key {
                Some(key) => {
                    let reference = result.unwrap();
                    let chosen = batches
                        .iter()
                        .find(|b| b.reference() == &reference)
                        .unwrap();
                    prop_assert_eq!(chosen.eta(), key);
                    prop_assert!(chosen.allocations().contains(&line));
                }
                None => {
                    prop_assert!(
                        matches!(result, Err(AllocationError::OutOfStock { .. })),
                        "Expected OutOfStock, got {result:?}"
                    );
                }
            }
        }

        /// Property: Allocation conserves stock. On success the pool's total
        /// available quantity drops by exactly the line quantity; on failure
        /// nothing moves.
        #[test]
        fn allocation_conserves_total_stock(
            pool in prop::collection::vec(
                (0i64..40, proptest::option::of(0u32..60)),
                0..12
            ),
            qty in 1i64..25
        ) {
            let mut batches: Vec<Batch> = pool
                .iter()
                .enumerate()
                .map(|(i, (size, eta_offset))| {
                    Batch::new(format!("batch-{i:03}"), SKU, *size, eta_offset.map(day))
                })
                .collect();
            let line = OrderLine::new("order-001", SKU, qty);

            let before: i64 = batches.iter().map(Batch::available_quantity).sum();
            let result = allocate(&line, &mut batches);
            let after: i64 = batches.iter().map(Batch::available_quantity).sum();

            match result {
                Ok(_) => prop_assert_eq!(after, before - qty),
                Err(_) => prop_assert_eq!(after, before),
            }
        }
    }
}
