use std::collections::HashMap;

use axum::body::Bytes;
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use storefront_cart::{Cart, CartItem};
use storefront_checkout::PlacedOrder;
use storefront_core::{
    CartItemId, DomainResult, FieldErrors, Lenient, Money, OrderId, ProductId, UserId,
};
use storefront_products::Product;

use crate::app::errors;

/// Parse a JSON body, answering with a `body` field error when it is not JSON
/// of the expected shape.
pub fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        errors::validation_error(
            "Invalid request body",
            &FieldErrors::single("body", format!("Request body must be valid JSON: {e}")),
        )
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddCartItemRequest {
    pub product_id: Lenient<String>,
    pub quantity: Lenient<i64>,
}

impl AddCartItemRequest {
    pub fn validate(&self) -> Result<(ProductId, i64), FieldErrors> {
        let mut errors = FieldErrors::new();

        let product_id = match &self.product_id {
            Lenient::Value(raw) if !raw.trim().is_empty() => match raw.parse::<ProductId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("productId", "Invalid product id");
                    None
                }
            },
            Lenient::Invalid => {
                errors.add("productId", "Invalid product id");
                None
            }
            _ => {
                errors.add("productId", "Product id is required");
                None
            }
        };

        let quantity = match self.quantity {
            Lenient::Missing => {
                errors.add("quantity", "Quantity is required");
                None
            }
            Lenient::Value(q) if q >= 1 => Some(q),
            _ => {
                errors.add("quantity", "Quantity must be a positive integer");
                None
            }
        };

        match (product_id, quantity) {
            (Some(product_id), Some(quantity)) => Ok((product_id, quantity)),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateCartItemRequest {
    pub quantity: Lenient<i64>,
}

impl UpdateCartItemRequest {
    /// Zero is allowed and removes the line.
    pub fn validate(&self) -> Result<i64, FieldErrors> {
        match self.quantity {
            Lenient::Missing => Err(FieldErrors::single("quantity", "Quantity is required")),
            Lenient::Invalid => Err(FieldErrors::single("quantity", "Quantity must be an integer")),
            Lenient::Value(q) if q < 0 => {
                Err(FieldErrors::single("quantity", "Quantity cannot be negative"))
            }
            Lenient::Value(q) => Ok(q),
        }
    }
}

/// Cart line joined with its product, if the product still exists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product: Option<Product>,
    pub line_total: Option<Money>,
}

impl CartItemView {
    pub fn new(item: &CartItem, product: Option<&Product>) -> DomainResult<Self> {
        let line_total = product
            .map(|p| p.price().multiply(item.quantity))
            .transpose()?;
        Ok(Self {
            id: item.id,
            product_id: item.product_id,
            quantity: item.quantity,
            product: product.cloned(),
            line_total,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub user_id: UserId,
    pub items: Vec<CartItemView>,
    /// Current catalog prices; checkout re-prices anyway.
    pub subtotal: Money,
}

impl CartView {
    pub fn new(cart: &Cart, products: &HashMap<ProductId, Product>) -> DomainResult<Self> {
        let items = cart
            .items()
            .iter()
            .map(|item| CartItemView::new(item, products.get(&item.product_id)))
            .collect::<DomainResult<Vec<_>>>()?;

        let subtotal = items
            .iter()
            .filter_map(|item| item.line_total)
            .try_fold(Money::zero(), |acc, line| acc.add(&line))?;

        Ok(Self {
            user_id: cart.user_id(),
            items,
            subtotal,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub message: &'static str,
    pub order_id: OrderId,
    pub total_amount: Money,
    pub status: &'static str,
}

impl From<&PlacedOrder> for CheckoutResponse {
    fn from(placed: &PlacedOrder) -> Self {
        Self {
            message: "Payment successful and order placed!",
            order_id: placed.order_id(),
            total_amount: placed.total_amount(),
            status: "success",
        }
    }
}
