//! `storefront-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the shared error model, and the `Money` value type.

pub mod error;
pub mod id;
pub mod input;
pub mod money;
pub mod validation;

pub use error::{DomainError, DomainResult};
pub use id::{CartItemId, OrderId, ProductId, UserId};
pub use input::Lenient;
pub use money::Money;
pub use validation::FieldErrors;
