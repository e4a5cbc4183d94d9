use serde::{Deserialize, Serialize};

use storefront_core::{DomainError, Money, ProductId};

/// Catalog product.
///
/// Stock is unsigned; the only path that lowers it is the conditional decrement in
/// the checkout commit, which refuses to go below zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    image_url: Option<String>,
    price: Money,
    stock: u32,
}

/// Input for creating (or seeding) a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub price: Money,
    pub stock: u32,
}

impl Product {
    pub fn new(id: ProductId, input: NewProduct) -> Result<Self, DomainError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        Ok(Self {
            id,
            name: name.to_string(),
            description: input.description,
            image_url: input.image_url,
            price: input.price,
            stock: input.stock,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock(&self) -> u32 {
        self.stock
    }

    pub fn can_supply(&self, quantity: u32) -> bool {
        self.stock >= quantity
    }

    /// Conditional decrement: lowers stock only if enough is on hand.
    pub fn take_stock(&mut self, quantity: u32) -> Result<(), DomainError> {
        match self.stock.checked_sub(quantity) {
            Some(remaining) => {
                self.stock = remaining;
                Ok(())
            }
            None => Err(DomainError::conflict(format!(
                "product {} has {} in stock, {} requested",
                self.id, self.stock, quantity
            ))),
        }
    }
}
