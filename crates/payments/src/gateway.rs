use async_trait::async_trait;
use thiserror::Error;

use storefront_core::Money;

use crate::details::{ExpiryMonth, PaymentDetails};

/// Outcome of an authorization request that reached the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Funds authorized. The reference is unique per attempt.
    Approved { payment_reference: String },
    /// Issuer refused. `reason` is for logs, not for the shopper.
    Declined { reason: String },
}

impl Authorization {
    pub fn is_approved(&self) -> bool {
        matches!(self, Authorization::Approved { .. })
    }
}

/// The call could not be completed. Distinct from a decline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Payment authorization seam.
///
/// `authorize` is atomic from the caller's side: it either resolves to an
/// outcome or fails, with nothing observable in between.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn authorize(
        &self,
        amount: Money,
        details: &PaymentDetails,
    ) -> Result<Authorization, GatewayError>;

    /// The gateway's notion of "this month", used for card expiry checks.
    fn current_month(&self) -> ExpiryMonth {
        ExpiryMonth::current()
    }
}

#[async_trait]
impl<G> PaymentGateway for std::sync::Arc<G>
where
    G: PaymentGateway + ?Sized,
{
    async fn authorize(
        &self,
        amount: Money,
        details: &PaymentDetails,
    ) -> Result<Authorization, GatewayError> {
        (**self).authorize(amount, details).await
    }

    fn current_month(&self) -> ExpiryMonth {
        (**self).current_month()
    }
}
