//! Product catalog domain module.
//!
//! Catalog records as the checkout path sees them: authoritative price and
//! current stock. No IO, no HTTP, no storage.

pub mod product;

pub use product::{NewProduct, Product};
