use thiserror::Error;

use storefront_core::{FieldErrors, ProductId};
use storefront_inventory::StockError;

/// Why a checkout attempt failed. Every variant is terminal for the attempt,
/// and none of them leaves partial state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Malformed request or payment fields, keyed by field.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// A product is missing or short on stock.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// The gateway refused the payment. `reason` stays in logs.
    #[error("payment declined")]
    PaymentDeclined { reason: String },

    /// Stock changed between pricing and commit. Safe to retry.
    #[error("stock for product {product_id} changed before the order was committed")]
    CommitConflict { product_id: ProductId },

    #[error("no authenticated user")]
    Unauthenticated,

    /// The caller gave up before the attempt committed.
    #[error("checkout cancelled")]
    Cancelled,

    /// A collaborator failed unexpectedly. Detail is for logs only.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CheckoutError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Machine-readable classification.
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::Validation(_) => "validation_error",
            CheckoutError::Stock(_) => "stock_error",
            CheckoutError::PaymentDeclined { .. } => "payment_declined",
            CheckoutError::CommitConflict { .. } => "commit_conflict",
            CheckoutError::Unauthenticated => "unauthenticated",
            CheckoutError::Cancelled => "cancelled",
            CheckoutError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to show the shopper.
    pub fn user_message(&self) -> String {
        match self {
            CheckoutError::Validation(_) => "Invalid checkout request".to_string(),
            CheckoutError::Stock(err) => err.to_string(),
            CheckoutError::PaymentDeclined { .. } => "Payment failed. Please try again.".to_string(),
            CheckoutError::CommitConflict { .. } => {
                "Stock changed while your order was being placed. Please review your cart and try again."
                    .to_string()
            }
            CheckoutError::Unauthenticated => "Authentication required".to_string(),
            CheckoutError::Cancelled => "Checkout was cancelled".to_string(),
            CheckoutError::Internal(_) => "Internal server error during checkout".to_string(),
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            CheckoutError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// The same request may succeed on a later attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CheckoutError::PaymentDeclined { .. }
                | CheckoutError::CommitConflict { .. }
                | CheckoutError::Cancelled
        )
    }
}

impl From<FieldErrors> for CheckoutError {
    fn from(errors: FieldErrors) -> Self {
        CheckoutError::Validation(errors)
    }
}
