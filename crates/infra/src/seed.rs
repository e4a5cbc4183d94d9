//! Demo catalog loaded at startup when `SEED_CATALOG` is on.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::info;
use uuid::Uuid;

use storefront_core::{Money, ProductId};
use storefront_products::{NewProduct, Product};

use crate::error::StoreError;
use crate::store::ProductCatalog;

const IMAGE_URL: &str = "https://picsum.photos/300/400";

// Fixed ids keep re-seeding a persistent store idempotent.
const CATALOG: &[(u128, &str, &str, Decimal, u32)] = &[
    (
        0x0190_0000_0000_7000_8000_0000_0000_0001,
        "Next.js T-Shirt",
        "A stylish t-shirt for Next.js enthusiasts.",
        dec!(29.99),
        50,
    ),
    (
        0x0190_0000_0000_7000_8000_0000_0000_0002,
        "Prisma Mug",
        "Keep your coffee warm with this Prisma branded mug.",
        dec!(15.50),
        75,
    ),
    (
        0x0190_0000_0000_7000_8000_0000_0000_0003,
        "Tailwind CSS Hoodie",
        "Comfortable hoodie for Tailwind CSS developers.",
        dec!(49.00),
        30,
    ),
    (
        0x0190_0000_0000_7000_8000_0000_0000_0004,
        "Zustand Sticker Pack",
        "Decorate your laptop with Zustand stickers.",
        dec!(9.99),
        100,
    ),
    (
        0x0190_0000_0000_7000_8000_0000_0000_0005,
        "PostgreSQL Database Guide",
        "A comprehensive guide to PostgreSQL for beginners.",
        dec!(35.00),
        20,
    ),
];

pub fn demo_catalog() -> Result<Vec<Product>, StoreError> {
    CATALOG
        .iter()
        .map(|(id, name, description, price, stock)| {
            Ok(Product::new(
                ProductId::from_uuid(Uuid::from_u128(*id)),
                NewProduct {
                    name: (*name).to_string(),
                    description: (*description).to_string(),
                    image_url: Some(IMAGE_URL.to_string()),
                    price: Money::new(*price)?,
                    stock: *stock,
                },
            )?)
        })
        .collect()
}

/// Upsert the demo catalog. Returns the number of products written.
pub async fn seed_catalog<C>(catalog: &C) -> Result<usize, StoreError>
where
    C: ProductCatalog + ?Sized,
{
    let products = demo_catalog()?;
    let count = products.len();
    for product in products {
        catalog.upsert_product(product).await?;
    }
    info!(count, "seeded demo catalog");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn seeding_twice_keeps_one_copy_per_product() {
        let store = InMemoryStore::new();
        assert_eq!(seed_catalog(&store).await.unwrap(), 5);
        seed_catalog(&store).await.unwrap();

        let products = store.list_products().await.unwrap();
        assert_eq!(products.len(), 5);

        let mug = products.iter().find(|p| p.name() == "Prisma Mug").unwrap();
        assert_eq!(mug.price().to_string(), "15.50");
        assert_eq!(mug.stock(), 75);
    }
}
