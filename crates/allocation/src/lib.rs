//! `stocklot-allocation` — inventory allocation domain model.
//!
//! Customer order lines are allocated against purchase batches: quantities
//! of stock either sitting in the warehouse or inbound on a shipment. The
//! model is deliberately small:
//!
//! - [`OrderLine`]: an immutable value describing one order's demand
//! - [`Batch`]: a mutable entity that commits stock to order lines
//! - [`allocate`]: the policy that picks which batch serves a line
//!
//! Everything here is pure and synchronous; persistence lives in
//! `stocklot-infra`.

pub mod batch;
pub mod order_line;
pub mod policy;

pub use batch::Batch;
pub use order_line::OrderLine;
pub use policy::allocate;
