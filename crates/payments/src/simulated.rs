use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use storefront_core::Money;

use crate::details::{ExpiryMonth, PaymentDetails};
use crate::gateway::{Authorization, GatewayError, PaymentGateway};

/// Stand-in for a card processor: waits a random latency, then approves with a
/// fixed probability.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    approval_rate: f64,
    latency_min: Duration,
    latency_max: Duration,
    fixed_month: Option<ExpiryMonth>,
}

impl Default for SimulatedGateway {
    /// 80% approval after 1-3 seconds.
    fn default() -> Self {
        Self::new(0.8, Duration::from_millis(1000), Duration::from_millis(3000))
    }
}

impl SimulatedGateway {
    /// `approval_rate` is clamped into `0.0..=1.0`; the latency bounds are
    /// swapped if given in the wrong order.
    pub fn new(approval_rate: f64, latency_min: Duration, latency_max: Duration) -> Self {
        let approval_rate = if approval_rate.is_nan() {
            0.0
        } else {
            approval_rate.clamp(0.0, 1.0)
        };
        let (latency_min, latency_max) = if latency_min <= latency_max {
            (latency_min, latency_max)
        } else {
            (latency_max, latency_min)
        };

        Self {
            approval_rate,
            latency_min,
            latency_max,
            fixed_month: None,
        }
    }

    pub fn always_approve() -> Self {
        Self::new(1.0, Duration::ZERO, Duration::ZERO)
    }

    pub fn always_decline() -> Self {
        Self::new(0.0, Duration::ZERO, Duration::ZERO)
    }

    /// Pin the gateway clock to a given month.
    pub fn with_current_month(mut self, month: ExpiryMonth) -> Self {
        self.fixed_month = Some(month);
        self
    }

    pub fn approval_rate(&self) -> f64 {
        self.approval_rate
    }

    fn draw_latency(&self) -> Duration {
        if self.latency_max.is_zero() {
            return Duration::ZERO;
        }
        let min = self.latency_min.as_millis() as u64;
        let max = self.latency_max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

fn payment_reference() -> String {
    format!(
        "mock_payment_{}_{}",
        Utc::now().timestamp_millis(),
        Uuid::now_v7().simple()
    )
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn authorize(
        &self,
        amount: Money,
        details: &PaymentDetails,
    ) -> Result<Authorization, GatewayError> {
        let latency = self.draw_latency();
        debug!(
            amount = %amount,
            card = %details.masked_card(),
            latency_ms = latency.as_millis() as u64,
            "simulating payment authorization"
        );

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let approved = rand::thread_rng().gen_bool(self.approval_rate);
        if approved {
            Ok(Authorization::Approved {
                payment_reference: payment_reference(),
            })
        } else {
            Ok(Authorization::Declined {
                reason: "simulated issuer decline".to_string(),
            })
        }
    }

    fn current_month(&self) -> ExpiryMonth {
        self.fixed_month.unwrap_or_else(ExpiryMonth::current)
    }
}
