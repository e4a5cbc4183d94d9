use serde::Deserialize;

use storefront_core::Lenient;
use storefront_payments::RawPaymentDetails;

/// One cart line as submitted. Every field is [`Lenient`] so that gaps and
/// mistyped values are reported per field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartLineInput {
    pub product_id: Lenient<String>,
    /// Advisory label, never used for pricing.
    pub product_name: Lenient<String>,
    pub quantity: Lenient<i64>,
}

impl CartLineInput {
    pub fn new(product_id: impl ToString, quantity: i64) -> Self {
        Self {
            product_id: Lenient::Value(product_id.to_string()),
            product_name: Lenient::Missing,
            quantity: Lenient::Value(quantity),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.product_name = Lenient::Value(name.into());
        self
    }
}

/// Cart snapshot plus card details for a single checkout attempt.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutRequest {
    pub cart_items: Lenient<Vec<CartLineInput>>,
    pub payment_details: Lenient<RawPaymentDetails>,
}

impl CheckoutRequest {
    pub fn new(cart_items: Vec<CartLineInput>, payment_details: RawPaymentDetails) -> Self {
        Self {
            cart_items: Lenient::Value(cart_items),
            payment_details: Lenient::Value(payment_details),
        }
    }

    pub fn line_count(&self) -> usize {
        self.cart_items.value().map_or(0, Vec::len)
    }
}
