//! Postgres-backed store.
//!
//! One pool serves every table. The checkout commit runs in a single transaction
//! whose stock decrements are conditional updates:
//!
//! ```sql
//! UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2
//! ```
//!
//! A decrement that touches no row rolls the transaction back and surfaces as
//! `CommitError::Conflict`. Row locks taken by the updates serialize concurrent
//! commits on the same product only; unrelated products never contend.
//!
//! ## Error Mapping
//!
//! | SQLx error | `StoreError` |
//! |------------|--------------|
//! | Database `23503` (foreign key) | `NotFound` |
//! | Database `23514` (check) | `Invalid` |
//! | anything else | `Backend` |

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use storefront_cart::{Cart, CartChange, CartItem};
use storefront_core::{CartItemId, DomainError, Money, OrderId, ProductId, UserId};
use storefront_orders::{Order, OrderStatus, PricedLineItem};
use storefront_products::{NewProduct, Product};

use super::{CartStore, CheckoutStore, NewOrder, OrderStore, ProductCatalog};
use crate::error::{CommitError, StoreError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        image_url   TEXT NULL,
        price       NUMERIC NOT NULL CHECK (price >= 0),
        stock       BIGINT NOT NULL CHECK (stock >= 0),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cart_items (
        id         UUID PRIMARY KEY,
        user_id    UUID NOT NULL,
        product_id UUID NOT NULL REFERENCES products (id),
        quantity   BIGINT NOT NULL CHECK (quantity > 0),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        UNIQUE (user_id, product_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id                UUID PRIMARY KEY,
        user_id           UUID NOT NULL,
        total_amount      NUMERIC NOT NULL CHECK (total_amount >= 0),
        status            TEXT NOT NULL,
        payment_reference TEXT NOT NULL UNIQUE,
        created_at        TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_items (
        order_id   UUID NOT NULL REFERENCES orders (id) ON DELETE CASCADE,
        position   INTEGER NOT NULL,
        product_id UUID NOT NULL REFERENCES products (id),
        quantity   BIGINT NOT NULL CHECK (quantity > 0),
        unit_price NUMERIC NOT NULL CHECK (unit_price >= 0),
        PRIMARY KEY (order_id, position)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS orders_user_created_idx ON orders (user_id, created_at DESC)",
];

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }

    async fn load_cart(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
    ) -> Result<Cart, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, quantity
            FROM cart_items
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            FOR UPDATE
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("load_cart", e))?;

        let items = rows
            .iter()
            .map(cart_item_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Cart::from_items(user_id, items))
    }

    /// Persist a cart mutation and return what was actually stored.
    ///
    /// A new line can race a concurrent insert of the same product (there is no
    /// row to lock yet); the upsert folds it into the existing line, which then
    /// reports as `Updated`.
    async fn write_cart_change(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        change: CartChange,
    ) -> Result<CartChange, StoreError> {
        match change {
            CartChange::Added(item) => {
                let row = sqlx::query(
                    r#"
                    INSERT INTO cart_items (id, user_id, product_id, quantity)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (user_id, product_id)
                    DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
                    RETURNING id, product_id, quantity
                    "#,
                )
                .bind(item.id.as_uuid())
                .bind(user_id.as_uuid())
                .bind(item.product_id.as_uuid())
                .bind(i64::from(item.quantity))
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("insert_cart_item", e))?;

                Ok(stored_addition(&item, cart_item_from_row(&row)?))
            }
            CartChange::Updated(item) => {
                sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $1 AND user_id = $2")
                    .bind(item.id.as_uuid())
                    .bind(user_id.as_uuid())
                    .bind(i64::from(item.quantity))
                    .execute(&mut **tx)
                    .await
                    .map_err(|e| map_sqlx_error("update_cart_item", e))?;
                Ok(CartChange::Updated(item))
            }
            CartChange::Removed(item_id) => {
                delete_cart_item(tx, user_id, item_id).await?;
                Ok(CartChange::Removed(item_id))
            }
        }
    }

    async fn load_lines(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<PricedLineItem>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_order_items", e))?;

        let mut lines: HashMap<Uuid, Vec<PricedLineItem>> = HashMap::new();
        for row in rows {
            let order_id: Uuid = get(&row, "order_id")?;
            let unit_price: Decimal = get(&row, "unit_price")?;
            lines.entry(order_id).or_default().push(PricedLineItem {
                product_id: ProductId::from_uuid(get(&row, "product_id")?),
                quantity: to_u32(get(&row, "quantity")?, "order_items.quantity")?,
                unit_price: Money::new(unit_price).map_err(corrupt)?,
            });
        }
        Ok(lines)
    }

    fn restore_order(
        row: &sqlx::postgres::PgRow,
        lines: &mut HashMap<Uuid, Vec<PricedLineItem>>,
    ) -> Result<Order, StoreError> {
        let id: Uuid = get(row, "id")?;
        let total: Decimal = get(row, "total_amount")?;
        let status: String = get(row, "status")?;
        let created_at: DateTime<Utc> = get(row, "created_at")?;

        Order::restore(
            OrderId::from_uuid(id),
            UserId::from_uuid(get(row, "user_id")?),
            lines.remove(&id).unwrap_or_default(),
            Money::new(total).map_err(corrupt)?,
            status.parse::<OrderStatus>().map_err(corrupt)?,
            get(row, "payment_reference")?,
            created_at,
        )
        .map_err(corrupt)
    }
}

#[async_trait]
impl ProductCatalog for PostgresStore {
    #[instrument(skip(self), err)]
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, description, image_url, price, stock FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn get_products(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, StoreError> {
        let ids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT id, name, description, image_url, price, stock FROM products WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_products", e))?;

        rows.iter()
            .map(|row| product_from_row(row).map(|p| (p.id_typed(), p)))
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, description, image_url, price, stock FROM products ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn upsert_product(&self, product: Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, image_url, price, stock)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                image_url = EXCLUDED.image_url,
                price = EXCLUDED.price,
                stock = EXCLUDED.stock,
                updated_at = NOW()
            "#,
        )
        .bind(product.id_typed().as_uuid())
        .bind(product.name())
        .bind(product.description())
        .bind(product.image_url())
        .bind(product.price().amount())
        .bind(i64::from(product.stock()))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<(), CommitError> {
        let result = sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
            .bind(id.as_uuid())
            .bind(i64::from(quantity))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("decrement_stock", e))?;

        if result.rows_affected() == 0 {
            return Err(CommitError::Conflict { product_id: id });
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn get_cart(&self, user_id: UserId) -> Result<Cart, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, quantity
            FROM cart_items
            WHERE user_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_cart", e))?;

        let items = rows
            .iter()
            .map(cart_item_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Cart::from_items(user_id, items))
    }

    #[instrument(skip(self), err)]
    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartChange, StoreError> {
        if self.get_product(product_id).await?.is_none() {
            return Err(DomainError::not_found("product").into());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut cart = Self::load_cart(&mut tx, user_id).await?;
        let change = match cart.add_item(product_id, quantity) {
            Ok(change) => change,
            Err(e) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(e.into());
            }
        };
        let change = Self::write_cart_change(&mut tx, user_id, change).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(change)
    }

    #[instrument(skip(self), err)]
    async fn set_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i64,
    ) -> Result<CartChange, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let mut cart = Self::load_cart(&mut tx, user_id).await?;
        let change = match cart.set_quantity(item_id, quantity) {
            Ok(change) => change,
            Err(e) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(e.into());
            }
        };
        let change = Self::write_cart_change(&mut tx, user_id, change).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(change)
    }

    #[instrument(skip(self), err)]
    async fn remove_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<CartItem, StoreError> {
        let row = sqlx::query(
            "DELETE FROM cart_items WHERE id = $1 AND user_id = $2 RETURNING id, product_id, quantity",
        )
        .bind(item_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_item", e))?;

        match row {
            Some(row) => cart_item_from_row(&row),
            None => Err(DomainError::not_found("cart item").into()),
        }
    }

    #[instrument(skip(self), err)]
    async fn clear_cart(&self, user_id: UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    #[instrument(skip(self), err)]
    async fn get_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, total_amount, status, payment_reference, created_at
            FROM orders
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut lines = self.load_lines(&[*order_id.as_uuid()]).await?;
        Self::restore_order(&row, &mut lines).map(Some)
    }

    #[instrument(skip(self), err)]
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, total_amount, status, payment_reference, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_orders", e))?;

        let ids = rows
            .iter()
            .map(|row| get::<Uuid>(row, "id"))
            .collect::<Result<Vec<_>, _>>()?;
        let mut lines = self.load_lines(&ids).await?;

        rows.iter()
            .map(|row| Self::restore_order(row, &mut lines))
            .collect()
    }
}

#[async_trait]
impl CheckoutStore for PostgresStore {
    #[instrument(
        skip(self, order),
        fields(
            order_id = %order.id,
            user_id = %order.user_id,
            line_count = order.quote.lines().len()
        ),
        err
    )]
    async fn commit_order(&self, order: NewOrder) -> Result<Order, CommitError> {
        let demand = order.quote.demand()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for (product_id, quantity) in &demand {
            let result =
                sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
                    .bind(product_id.as_uuid())
                    .bind(i64::from(*quantity))
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| map_sqlx_error("decrement_stock", e))?;

            if result.rows_affected() == 0 {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                debug!(product_id = %product_id, "conditional decrement matched no row");
                return Err(CommitError::Conflict {
                    product_id: *product_id,
                });
            }
        }

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, total_amount, status, payment_reference, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.quote.total().amount())
        .bind(OrderStatus::Paid.as_str())
        .bind(&order.payment_reference)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for (position, line) in order.quote.lines().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, position, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(position as i32)
            .bind(line.product_id.as_uuid())
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.amount())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(order.user_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("clear_cart", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(order.into_order())
    }
}

async fn delete_cart_item(
    tx: &mut Transaction<'_, Postgres>,
    user_id: UserId,
    item_id: CartItemId,
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
        .bind(item_id.as_uuid())
        .bind(user_id.as_uuid())
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("delete_cart_item", e))?;
    Ok(())
}

fn get<'r, T>(row: &'r sqlx::postgres::PgRow, column: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::corrupt(format!("failed to read column {column}: {e}")))
}

fn to_u32(value: i64, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::corrupt(format!("{column} out of range: {value}")))
}

fn corrupt(err: DomainError) -> StoreError {
    StoreError::corrupt(err.to_string())
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> Result<Product, StoreError> {
    let price: Decimal = get(row, "price")?;
    Product::new(
        ProductId::from_uuid(get(row, "id")?),
        NewProduct {
            name: get(row, "name")?,
            description: get(row, "description")?,
            image_url: get(row, "image_url")?,
            price: Money::new(price).map_err(corrupt)?,
            stock: to_u32(get(row, "stock")?, "products.stock")?,
        },
    )
    .map_err(corrupt)
}

/// `Added` if the row we inserted is the one stored, `Updated` if the insert
/// merged into a line another transaction created first.
fn stored_addition(requested: &CartItem, stored: CartItem) -> CartChange {
    if stored.id == requested.id {
        CartChange::Added(stored)
    } else {
        CartChange::Updated(stored)
    }
}

fn cart_item_from_row(row: &sqlx::postgres::PgRow) -> Result<CartItem, StoreError> {
    Ok(CartItem {
        id: CartItemId::from_uuid(get(row, "id")?),
        product_id: ProductId::from_uuid(get(row, "product_id")?),
        quantity: to_u32(get(row, "quantity")?, "cart_items.quantity")?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") => StoreError::NotFound(format!("referenced row ({msg})")),
                Some("23514") => StoreError::Invalid(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
