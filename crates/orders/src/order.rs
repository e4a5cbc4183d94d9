use chrono::{DateTime, Utc};
use serde::Serialize;

use storefront_core::{DomainError, DomainResult, Money, OrderId, ProductId, UserId};

use crate::assembler::Quote;

/// Order status. Only successful checkouts are persisted, so `Paid` is the
/// single state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Paid,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Paid => "PAID",
        }
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAID" => Ok(OrderStatus::Paid),
            other => Err(DomainError::validation(format!("unknown order status '{other}'"))),
        }
    }
}

/// Order line: product, quantity, and the unit price captured when the order
/// was priced. Later catalog price changes do not touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl PricedLineItem {
    pub fn line_total(&self) -> DomainResult<Money> {
        self.unit_price.multiply(self.quantity)
    }
}

/// A placed order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    lines: Vec<PricedLineItem>,
    total_amount: Money,
    status: OrderStatus,
    payment_reference: String,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Create a paid order from an authorized quote.
    pub fn paid(
        id: OrderId,
        user_id: UserId,
        quote: Quote,
        payment_reference: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let (lines, total_amount) = quote.into_parts();
        Self {
            id,
            user_id,
            lines,
            total_amount,
            status: OrderStatus::Paid,
            payment_reference: payment_reference.into(),
            created_at,
        }
    }

    /// Rebuild an order loaded from storage, re-checking the total.
    pub fn restore(
        id: OrderId,
        user_id: UserId,
        lines: Vec<PricedLineItem>,
        total_amount: Money,
        status: OrderStatus,
        payment_reference: String,
        created_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let quote = Quote::from_lines(lines)?;
        if quote.total() != total_amount {
            return Err(DomainError::invariant(format!(
                "order {id} total {total_amount} does not match its lines ({})",
                quote.total()
            )));
        }
        let (lines, total_amount) = quote.into_parts();

        Ok(Self {
            id,
            user_id,
            lines,
            total_amount,
            status,
            payment_reference,
            created_at,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn lines(&self) -> &[PricedLineItem] {
        &self.lines
    }

    pub fn total_amount(&self) -> Money {
        self.total_amount
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payment_reference(&self) -> &str {
        &self.payment_reference
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
