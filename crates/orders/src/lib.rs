//! Orders domain module.
//!
//! Placed orders and the pure assembler that prices a checked cart against the
//! catalog. An order only ever exists in the `PAID` state: failed checkout
//! attempts leave no record.

pub mod assembler;
pub mod order;

pub use assembler::{OrderAssembler, Quote};
pub use order::{Order, OrderStatus, PricedLineItem};
