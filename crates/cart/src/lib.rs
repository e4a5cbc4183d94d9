//! Shopping cart domain module.
//!
//! Pure cart mutations (add/merge, set quantity, remove, clear). Persistence is
//! handled by the store layer, which applies these rules.

pub mod cart;

pub use cart::{Cart, CartChange, CartItem};
