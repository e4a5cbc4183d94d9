//! Collaborator contracts for the checkout path, plus their backends.
//!
//! Every trait is object-safe and implemented for `Arc<S>`, so services can hold
//! either a concrete store or a `dyn` handle.

mod memory;
mod postgres;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use storefront_cart::{Cart, CartChange, CartItem};
use storefront_core::{CartItemId, OrderId, ProductId, UserId};
use storefront_orders::{Order, Quote};
use storefront_products::Product;

use crate::error::{CommitError, StoreError};

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Read and maintain the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Batch lookup. Unknown ids are simply absent from the result.
    async fn get_products(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, StoreError> {
        let mut found = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = self.get_product(*id).await? {
                found.insert(*id, product);
            }
        }
        Ok(found)
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn upsert_product(&self, product: Product) -> Result<(), StoreError>;

    /// Atomic conditional decrement: applies only if `stock >= quantity`,
    /// otherwise `CommitError::Conflict`.
    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<(), CommitError>;
}

/// Per-user cart persistence.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart; empty if they never had one.
    async fn get_cart(&self, user_id: UserId) -> Result<Cart, StoreError>;

    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartChange, StoreError>;

    async fn set_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartChange, StoreError>;

    async fn remove_item(&self, user_id: UserId, item_id: CartItemId)
    -> Result<CartItem, StoreError>;

    async fn clear_cart(&self, user_id: UserId) -> Result<(), StoreError>;
}

/// Placed orders, scoped to their owner.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, user_id: UserId, order_id: OrderId)
    -> Result<Option<Order>, StoreError>;

    /// Newest first.
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, StoreError>;
}

/// An authorized order waiting to be committed.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: OrderId,
    pub user_id: UserId,
    pub quote: Quote,
    pub payment_reference: String,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(user_id: UserId, quote: Quote, payment_reference: impl Into<String>) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            quote,
            payment_reference: payment_reference.into(),
            created_at: Utc::now(),
        }
    }

    pub(crate) fn into_order(self) -> Order {
        Order::paid(
            self.id,
            self.user_id,
            self.quote,
            self.payment_reference,
            self.created_at,
        )
    }
}

/// The checkout transaction boundary.
///
/// `commit_order` applies, all or nothing: a conditional stock decrement per
/// product (repeated lines summed, ascending product id), the order insert, and
/// clearing the user's cart. A decrement that cannot be applied aborts the whole
/// commit with `CommitError::Conflict` and leaves every table untouched.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    async fn commit_order(&self, order: NewOrder) -> Result<Order, CommitError>;
}

#[async_trait]
impl<S> ProductCatalog for Arc<S>
where
    S: ProductCatalog + ?Sized,
{
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get_product(id).await
    }

    async fn get_products(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, StoreError> {
        (**self).get_products(ids).await
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        (**self).list_products().await
    }

    async fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        (**self).upsert_product(product).await
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<(), CommitError> {
        (**self).decrement_stock(id, quantity).await
    }
}

#[async_trait]
impl<S> CartStore for Arc<S>
where
    S: CartStore + ?Sized,
{
    async fn get_cart(&self, user_id: UserId) -> Result<Cart, StoreError> {
        (**self).get_cart(user_id).await
    }

    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartChange, StoreError> {
        (**self).add_item(user_id, product_id, quantity).await
    }

    async fn set_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartChange, StoreError> {
        (**self).set_quantity(user_id, item_id, quantity).await
    }

    async fn remove_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<CartItem, StoreError> {
        (**self).remove_item(user_id, item_id).await
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), StoreError> {
        (**self).clear_cart(user_id).await
    }
}

#[async_trait]
impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    async fn get_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, StoreError> {
        (**self).get_order(user_id, order_id).await
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        (**self).list_orders(user_id).await
    }
}

#[async_trait]
impl<S> CheckoutStore for Arc<S>
where
    S: CheckoutStore + ?Sized,
{
    async fn commit_order(&self, order: NewOrder) -> Result<Order, CommitError> {
        (**self).commit_order(order).await
    }
}
