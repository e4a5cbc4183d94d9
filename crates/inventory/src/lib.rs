//! Inventory guard.
//!
//! Checks requested quantities against current stock before any money moves.
//! The check is read-only; the authoritative decrement happens inside the
//! checkout commit as a conditional update per product.

pub mod guard;

pub use guard::{CheckedLine, InventoryGuard, StockError, StockRequest, aggregate_demand};
