use serde::Serialize;

use storefront_core::{CartItemId, DomainError, DomainResult, ProductId, UserId};

/// One pending line in a shopper's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Outcome of a cart mutation, so callers can pick the right response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartChange {
    Added(CartItem),
    Updated(CartItem),
    Removed(CartItemId),
}

/// A shopper's cart. At most one line per product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    user_id: UserId,
    items: Vec<CartItem>,
}

impl Cart {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            items: Vec::new(),
        }
    }

    pub fn from_items(user_id: UserId, items: Vec<CartItem>) -> Self {
        Self { user_id, items }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a product; an existing line for the same product absorbs the quantity.
    pub fn add_item(&mut self, product_id: ProductId, quantity: i64) -> DomainResult<CartChange> {
        let quantity = positive_quantity(quantity)?;

        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            existing.quantity = existing
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| DomainError::validation("quantity is too large"))?;
            return Ok(CartChange::Updated(existing.clone()));
        }

        let item = CartItem {
            id: CartItemId::new(),
            product_id,
            quantity,
        };
        self.items.push(item.clone());
        Ok(CartChange::Added(item))
    }

    /// Replace a line's quantity. Zero removes the line.
    pub fn set_quantity(&mut self, item_id: CartItemId, quantity: i64) -> DomainResult<CartChange> {
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        if quantity == 0 {
            self.remove_item(item_id)?;
            return Ok(CartChange::Removed(item_id));
        }

        let quantity = positive_quantity(quantity)?;
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| DomainError::not_found("cart item"))?;
        item.quantity = quantity;
        Ok(CartChange::Updated(item.clone()))
    }

    pub fn remove_item(&mut self, item_id: CartItemId) -> DomainResult<CartItem> {
        let idx = self
            .items
            .iter()
            .position(|i| i.id == item_id)
            .ok_or_else(|| DomainError::not_found("cart item"))?;
        Ok(self.items.remove(idx))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

fn positive_quantity(quantity: i64) -> DomainResult<u32> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    u32::try_from(quantity).map_err(|_| DomainError::validation("quantity is too large"))
}
