use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use storefront_cart::{Cart, CartChange, CartItem};
use storefront_core::{CartItemId, DomainError, OrderId, ProductId, UserId};
use storefront_orders::Order;
use storefront_products::Product;

use super::{CartStore, CheckoutStore, NewOrder, OrderStore, ProductCatalog};
use crate::error::{CommitError, StoreError};

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    /// Insertion order is commit order.
    orders: Vec<Order>,
}

/// Process-local store for tests and single-node dev runs.
///
/// All tables sit behind one lock, so `commit_order` is a single critical
/// section: every decrement is checked before any is applied.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with the given products.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let state = State {
            products: products.into_iter().map(|p| (p.id_typed(), p)).collect(),
            ..State::default()
        };
        Self {
            state: RwLock::new(state),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::poisoned())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::poisoned())
    }
}

#[async_trait]
impl ProductCatalog for InMemoryStore {
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn get_products(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, StoreError> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).map(|p| (*id, p.clone())))
            .collect())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let mut products: Vec<Product> = self.read()?.products.values().cloned().collect();
        products.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(products)
    }

    async fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        self.write()?.products.insert(product.id_typed(), product);
        Ok(())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<(), CommitError> {
        let mut state = self.write()?;
        let product = state
            .products
            .get_mut(&id)
            .ok_or(CommitError::Conflict { product_id: id })?;
        product
            .take_stock(quantity)
            .map_err(|_| CommitError::Conflict { product_id: id })
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn get_cart(&self, user_id: UserId) -> Result<Cart, StoreError> {
        Ok(self
            .read()?
            .carts
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Cart::empty(user_id)))
    }

    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartChange, StoreError> {
        let mut state = self.write()?;
        if !state.products.contains_key(&product_id) {
            return Err(DomainError::not_found("product").into());
        }
        let cart = state
            .carts
            .entry(user_id)
            .or_insert_with(|| Cart::empty(user_id));
        Ok(cart.add_item(product_id, quantity)?)
    }

    async fn set_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartChange, StoreError> {
        let mut state = self.write()?;
        let cart = state
            .carts
            .get_mut(&user_id)
            .ok_or_else(|| DomainError::not_found("cart item"))?;
        Ok(cart.set_quantity(item_id, quantity)?)
    }

    async fn remove_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<CartItem, StoreError> {
        let mut state = self.write()?;
        let cart = state
            .carts
            .get_mut(&user_id)
            .ok_or_else(|| DomainError::not_found("cart item"))?;
        Ok(cart.remove_item(item_id)?)
    }

    async fn clear_cart(&self, user_id: UserId) -> Result<(), StoreError> {
        if let Some(cart) = self.write()?.carts.get_mut(&user_id) {
            cart.clear();
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn get_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .read()?
            .orders
            .iter()
            .find(|o| o.id_typed() == order_id && o.user_id() == user_id)
            .cloned())
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .read()?
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(orders)
    }
}

#[async_trait]
impl CheckoutStore for InMemoryStore {
    async fn commit_order(&self, order: NewOrder) -> Result<Order, CommitError> {
        let demand = order.quote.demand()?;
        let mut state = self.write()?;

        for (product_id, quantity) in &demand {
            let enough = state
                .products
                .get(product_id)
                .is_some_and(|p| p.can_supply(*quantity));
            if !enough {
                return Err(CommitError::Conflict {
                    product_id: *product_id,
                });
            }
        }

        for (product_id, quantity) in &demand {
            if let Some(product) = state.products.get_mut(product_id) {
                product.take_stock(*quantity)?;
            }
        }

        let user_id = order.user_id;
        let order = order.into_order();
        state.orders.push(order.clone());
        if let Some(cart) = state.carts.get_mut(&user_id) {
            cart.clear();
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use storefront_core::Money;
    use storefront_orders::OrderAssembler;
    use storefront_products::NewProduct;

    fn product(name: &str, price: rust_decimal::Decimal, stock: u32) -> Product {
        Product::new(
            ProductId::new(),
            NewProduct {
                name: name.to_string(),
                description: String::new(),
                image_url: None,
                price: Money::new(price).unwrap(),
                stock,
            },
        )
        .unwrap()
    }

    fn new_order(user_id: UserId, lines: &[(&Product, u32)]) -> NewOrder {
        let quote = OrderAssembler.assemble(lines.iter().copied()).unwrap();
        NewOrder::new(user_id, quote, format!("ref-{}", OrderId::new()))
    }

    #[tokio::test]
    async fn commit_decrements_stock_records_order_and_clears_cart() {
        let shirt = product("Shirt", dec!(10.00), 5);
        let mug = product("Mug", dec!(20.00), 3);
        let store = InMemoryStore::with_products([shirt.clone(), mug.clone()]);
        let user = UserId::new();
        store.add_item(user, shirt.id_typed(), 2).await.unwrap();
        store.add_item(user, mug.id_typed(), 1).await.unwrap();

        let order = store
            .commit_order(new_order(user, &[(&shirt, 2), (&mug, 1)]))
            .await
            .unwrap();

        assert_eq!(order.total_amount().to_string(), "40.00");
        assert_eq!(store.get_product(shirt.id_typed()).await.unwrap().unwrap().stock(), 3);
        assert_eq!(store.get_product(mug.id_typed()).await.unwrap().unwrap().stock(), 2);
        assert!(store.get_cart(user).await.unwrap().is_empty());
        assert_eq!(
            store.get_order(user, order.id_typed()).await.unwrap(),
            Some(order.clone())
        );
    }

    #[tokio::test]
    async fn conflicting_commit_changes_nothing() {
        let plenty = product("Plenty", dec!(1.00), 10);
        let scarce = product("Scarce", dec!(1.00), 1);
        let store = InMemoryStore::with_products([plenty.clone(), scarce.clone()]);
        let user = UserId::new();
        store.add_item(user, plenty.id_typed(), 1).await.unwrap();

        let err = store
            .commit_order(new_order(user, &[(&plenty, 4), (&scarce, 2)]))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CommitError::Conflict {
                product_id: scarce.id_typed()
            }
        );
        assert_eq!(store.get_product(plenty.id_typed()).await.unwrap().unwrap().stock(), 10);
        assert_eq!(store.get_cart(user).await.unwrap().items().len(), 1);
        assert!(store.list_orders(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_lines_are_decremented_by_their_sum() {
        let sticker = product("Sticker", dec!(0.50), 3);
        let store = InMemoryStore::with_products([sticker.clone()]);
        let user = UserId::new();

        let err = store
            .commit_order(new_order(user, &[(&sticker, 2), (&sticker, 2)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CommitError::Conflict { .. }));

        store
            .commit_order(new_order(user, &[(&sticker, 2), (&sticker, 1)]))
            .await
            .unwrap();
        assert_eq!(store.get_product(sticker.id_typed()).await.unwrap().unwrap().stock(), 0);
    }

    #[tokio::test]
    async fn decrement_stock_is_conditional() {
        let mug = product("Mug", dec!(15.50), 1);
        let store = InMemoryStore::with_products([mug.clone()]);

        assert!(matches!(
            store.decrement_stock(mug.id_typed(), 2).await,
            Err(CommitError::Conflict { .. })
        ));
        store.decrement_stock(mug.id_typed(), 1).await.unwrap();
        assert_eq!(store.get_product(mug.id_typed()).await.unwrap().unwrap().stock(), 0);
        assert!(store.decrement_stock(ProductId::new(), 1).await.is_err());
    }

    #[tokio::test]
    async fn cart_operations_are_scoped_to_the_user() {
        let mug = product("Mug", dec!(15.50), 10);
        let store = InMemoryStore::with_products([mug.clone()]);
        let alice = UserId::new();
        let bob = UserId::new();

        let CartChange::Added(item) = store.add_item(alice, mug.id_typed(), 1).await.unwrap() else {
            panic!("expected Added");
        };
        assert!(matches!(
            store.add_item(alice, mug.id_typed(), 2).await.unwrap(),
            CartChange::Updated(CartItem { quantity: 3, .. })
        ));

        assert_eq!(
            store.remove_item(bob, item.id).await.unwrap_err(),
            StoreError::NotFound("cart item".to_string())
        );
        assert_eq!(
            store.add_item(alice, ProductId::new(), 1).await.unwrap_err(),
            StoreError::NotFound("product".to_string())
        );
        assert!(matches!(
            store.set_quantity(alice, item.id, -1).await,
            Err(StoreError::Invalid(_))
        ));

        store.set_quantity(alice, item.id, 0).await.unwrap();
        assert!(store.get_cart(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn orders_are_private_and_newest_first() {
        let mug = product("Mug", dec!(1.00), 10);
        let store = InMemoryStore::with_products([mug.clone()]);
        let alice = UserId::new();
        let bob = UserId::new();

        let first = store.commit_order(new_order(alice, &[(&mug, 1)])).await.unwrap();
        let second = store.commit_order(new_order(alice, &[(&mug, 2)])).await.unwrap();

        let listed = store.list_orders(alice).await.unwrap();
        assert_eq!(listed, vec![second, first.clone()]);
        assert!(store.list_orders(bob).await.unwrap().is_empty());
        assert_eq!(store.get_order(bob, first.id_typed()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_products_is_sorted_by_name() {
        let store = InMemoryStore::with_products([
            product("Zeta", dec!(1.00), 1),
            product("Alpha", dec!(1.00), 1),
        ]);
        let names: Vec<String> = store
            .list_products()
            .await
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }
}
