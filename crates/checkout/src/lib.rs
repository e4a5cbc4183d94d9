//! `storefront-checkout`: the order-placement workflow.
//!
//! A checkout attempt moves through
//! `Validating -> Pricing -> Authorizing -> Committing -> Succeeded`, or stops
//! at the first failure with a [`CheckoutError`]. Nothing is written before
//! `Committing`, and the commit itself is all or nothing.

pub mod error;
pub mod orchestrator;
pub mod request;

pub use error::CheckoutError;
pub use orchestrator::{CheckoutOrchestrator, CheckoutStage, PlacedOrder};
pub use request::{CartLineInput, CheckoutRequest};
