use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use thiserror::Error;

use storefront_core::{DomainError, ProductId};
use storefront_products::Product;

/// One requested line, as the guard sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Client-supplied label. Only used to name a product that no longer exists.
    pub display_name: Option<String>,
}

/// A request line paired with the catalog record it was checked against.
#[derive(Debug, Clone, Copy)]
pub struct CheckedLine<'a> {
    pub product: &'a Product,
    pub quantity: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StockError {
    #[error("Product {name} is no longer available.")]
    ProductNotFound { product_id: ProductId, name: String },

    #[error("Product {name} is out of stock or quantity exceeds available stock.")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },
}

impl StockError {
    pub fn product_id(&self) -> ProductId {
        match self {
            StockError::ProductNotFound { product_id, .. } => *product_id,
            StockError::InsufficientStock { product_id, .. } => *product_id,
        }
    }
}

/// Total requested quantity per product, in ascending product id order.
///
/// Repeated lines for the same product are summed: stock must cover the whole
/// cart, not each line on its own.
pub fn aggregate_demand(lines: &[StockRequest]) -> Result<Vec<(ProductId, u32)>, DomainError> {
    let mut demand: BTreeMap<ProductId, u32> = BTreeMap::new();
    for line in lines {
        let entry = demand.entry(line.product_id).or_insert(0);
        *entry = entry
            .checked_add(line.quantity)
            .ok_or_else(|| DomainError::validation("requested quantity is too large"))?;
    }
    Ok(demand.into_iter().collect())
}

/// Read-only stock check against a catalog snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct InventoryGuard;

impl InventoryGuard {
    /// Verify every line resolves to a product and the summed demand per product
    /// fits its current stock. Lines are checked in order, so the first offending
    /// line is the one reported.
    pub fn check<'a>(
        &self,
        lines: &[StockRequest],
        catalog: &'a HashMap<ProductId, Product>,
    ) -> Result<Vec<CheckedLine<'a>>, StockError> {
        let demand: HashMap<ProductId, u64> =
            lines.iter().fold(HashMap::new(), |mut acc, line| {
                *acc.entry(line.product_id).or_insert(0) += u64::from(line.quantity);
                acc
            });

        let mut checked = Vec::with_capacity(lines.len());
        for line in lines {
            let Some(product) = catalog.get(&line.product_id) else {
                return Err(StockError::ProductNotFound {
                    product_id: line.product_id,
                    name: line
                        .display_name
                        .clone()
                        .filter(|n| !n.trim().is_empty())
                        .unwrap_or_else(|| line.product_id.to_string()),
                });
            };

            let wanted = demand.get(&line.product_id).copied().unwrap_or(0);
            if u64::from(product.stock()) < wanted {
                return Err(StockError::InsufficientStock {
                    product_id: line.product_id,
                    name: product.name().to_string(),
                    requested: u32::try_from(wanted).unwrap_or(u32::MAX),
                    available: product.stock(),
                });
            }

            checked.push(CheckedLine {
                product,
                quantity: line.quantity,
            });
        }

        Ok(checked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use storefront_core::Money;
    use storefront_products::NewProduct;

    fn product(name: &str, stock: u32) -> Product {
        Product::new(
            ProductId::new(),
            NewProduct {
                name: name.to_string(),
                description: String::new(),
                image_url: None,
                price: Money::new(dec!(10.00)).unwrap(),
                stock,
            },
        )
        .unwrap()
    }

    fn catalog(products: &[Product]) -> HashMap<ProductId, Product> {
        products.iter().map(|p| (p.id_typed(), p.clone())).collect()
    }

    fn line(product_id: ProductId, quantity: u32) -> StockRequest {
        StockRequest {
            product_id,
            quantity,
            display_name: None,
        }
    }

    #[test]
    fn satisfiable_lines_are_paired_with_products() {
        let a = product("Shirt", 5);
        let b = product("Mug", 10);
        let catalog = catalog(&[a.clone(), b.clone()]);

        let checked = InventoryGuard
            .check(&[line(a.id_typed(), 2), line(b.id_typed(), 1)], &catalog)
            .unwrap();

        assert_eq!(checked.len(), 2);
        assert_eq!(checked[0].product.name(), "Shirt");
        assert_eq!(checked[0].quantity, 2);
        assert_eq!(checked[1].product.name(), "Mug");
    }

    #[test]
    fn quantity_above_stock_names_the_product() {
        let a = product("Mug", 1);
        let catalog = catalog(&[a.clone()]);

        let err = InventoryGuard
            .check(&[line(a.id_typed(), 2)], &catalog)
            .unwrap_err();

        assert_eq!(
            err,
            StockError::InsufficientStock {
                product_id: a.id_typed(),
                name: "Mug".to_string(),
                requested: 2,
                available: 1,
            }
        );
        assert!(err.to_string().contains("Mug"));
    }

    #[test]
    fn repeated_product_lines_are_checked_against_their_sum() {
        let a = product("Hoodie", 3);
        let catalog = catalog(&[a.clone()]);

        assert!(
            InventoryGuard
                .check(&[line(a.id_typed(), 2), line(a.id_typed(), 1)], &catalog)
                .is_ok()
        );

        let err = InventoryGuard
            .check(&[line(a.id_typed(), 2), line(a.id_typed(), 2)], &catalog)
            .unwrap_err();
        assert!(matches!(
            err,
            StockError::InsufficientStock { requested: 4, available: 3, .. }
        ));
    }

    #[test]
    fn unknown_product_uses_client_label() {
        let missing = ProductId::new();
        let request = StockRequest {
            product_id: missing,
            quantity: 1,
            display_name: Some("Old Poster".to_string()),
        };

        let err = InventoryGuard
            .check(&[request], &HashMap::new())
            .unwrap_err();

        assert_eq!(
            err,
            StockError::ProductNotFound {
                product_id: missing,
                name: "Old Poster".to_string(),
            }
        );
    }

    #[test]
    fn demand_is_summed_and_sorted() {
        let a = ProductId::new();
        let b = ProductId::new();
        let demand = aggregate_demand(&[line(b, 1), line(a, 2), line(b, 4)]).unwrap();

        let mut expected = vec![(a, 2), (b, 5)];
        expected.sort();
        assert_eq!(demand, expected);
    }

    #[test]
    fn demand_overflow_is_a_validation_error() {
        let a = ProductId::new();
        let err = aggregate_demand(&[line(a, u32::MAX), line(a, 1)]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the guard accepts exactly when stock covers the summed demand.
        #[test]
        fn guard_accepts_iff_stock_covers_total(
            stock in 0u32..50,
            quantities in prop::collection::vec(1u32..20, 1..6)
        ) {
            let p = product("Sticker", stock);
            let catalog = catalog(&[p.clone()]);
            let lines: Vec<StockRequest> =
                quantities.iter().map(|q| line(p.id_typed(), *q)).collect();

            let total: u32 = quantities.iter().sum();
            let result = InventoryGuard.check(&lines, &catalog);

            prop_assert_eq!(result.is_ok(), total <= stock);

            let demand = aggregate_demand(&lines).unwrap();
            prop_assert_eq!(demand, vec![(p.id_typed(), total)]);
        }
    }
}
