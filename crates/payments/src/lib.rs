//! `storefront-payments`: card details and payment authorization.
//!
//! - `details`: raw card input, field-level validation, masking
//! - `gateway`: the `PaymentGateway` seam and its authorization outcome
//! - `simulated`: a latency-and-chance gateway used when no processor is wired in

pub mod details;
pub mod gateway;
pub mod simulated;

pub use details::{ExpiryMonth, PaymentDetails, PaymentField, RawPaymentDetails};
pub use gateway::{Authorization, GatewayError, PaymentGateway};
pub use simulated::SimulatedGateway;
