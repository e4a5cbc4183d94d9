use thiserror::Error;

use storefront_core::{DomainError, ProductId};

/// Storage-layer failure.
///
/// `NotFound` and `Invalid` are caller errors surfaced by a store operation;
/// `Corrupt` and `Backend` are faults of the store itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("stored data is inconsistent: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn poisoned() -> Self {
        Self::Backend("in-memory store lock poisoned".to_string())
    }
}

impl From<DomainError> for StoreError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(what) => StoreError::NotFound(what),
            DomainError::Validation(msg) | DomainError::Conflict(msg) => StoreError::Invalid(msg),
            DomainError::InvalidId(msg) => StoreError::Invalid(msg),
            DomainError::InvariantViolation(msg) => StoreError::Corrupt(msg),
        }
    }
}

/// Failure of a conditional stock change or of the checkout commit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitError {
    /// A conditional decrement found less stock than required. Nothing was applied.
    #[error("stock for product {product_id} changed before commit")]
    Conflict { product_id: ProductId },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<DomainError> for CommitError {
    fn from(err: DomainError) -> Self {
        CommitError::Store(err.into())
    }
}
