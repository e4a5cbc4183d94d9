//! Order assembler: turns checked cart lines into priced lines and a total.

use std::collections::BTreeMap;

use serde::Serialize;

use storefront_core::{DomainError, DomainResult, Money, ProductId};
use storefront_products::Product;

use crate::order::PricedLineItem;

/// Priced lines plus their exact total.
///
/// Only constructible through [`Quote::from_lines`] (or the assembler), so
/// `total == Σ(unit_price × quantity)` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    lines: Vec<PricedLineItem>,
    total: Money,
}

impl Quote {
    pub fn from_lines(lines: Vec<PricedLineItem>) -> DomainResult<Self> {
        let total = lines.iter().try_fold(Money::zero(), |acc, line| {
            acc.add(&line.line_total()?)
        })?;
        Ok(Self { lines, total })
    }

    pub fn lines(&self) -> &[PricedLineItem] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    /// Quantity per product across all lines, ascending by product id. This is
    /// the order stock decrements are applied in.
    pub fn demand(&self) -> DomainResult<Vec<(ProductId, u32)>> {
        let mut demand: BTreeMap<ProductId, u32> = BTreeMap::new();
        for line in &self.lines {
            let entry = demand.entry(line.product_id).or_insert(0);
            *entry = entry
                .checked_add(line.quantity)
                .ok_or_else(|| DomainError::validation("ordered quantity is too large"))?;
        }
        Ok(demand.into_iter().collect())
    }

    pub(crate) fn into_parts(self) -> (Vec<PricedLineItem>, Money) {
        (self.lines, self.total)
    }
}

/// Prices lines with the catalog's current unit price. Client-supplied prices
/// never reach this point.
#[derive(Debug, Default, Clone, Copy)]
pub struct OrderAssembler;

impl OrderAssembler {
    pub fn assemble<'a, I>(&self, lines: I) -> DomainResult<Quote>
    where
        I: IntoIterator<Item = (&'a Product, u32)>,
    {
        let priced = lines
            .into_iter()
            .map(|(product, quantity)| PricedLineItem {
                product_id: product.id_typed(),
                quantity,
                unit_price: product.price(),
            })
            .collect();
        Quote::from_lines(priced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use storefront_core::ProductId;
    use storefront_products::NewProduct;

    fn product(price: Decimal) -> Product {
        Product::new(
            ProductId::new(),
            NewProduct {
                name: "Item".to_string(),
                description: String::new(),
                image_url: None,
                price: Money::new(price).unwrap(),
                stock: 100,
            },
        )
        .unwrap()
    }

    #[test]
    fn two_lines_total_forty() {
        let p1 = product(dec!(10.00));
        let p2 = product(dec!(20.00));

        let quote = OrderAssembler.assemble([(&p1, 2), (&p2, 1)]).unwrap();

        assert_eq!(quote.total(), Money::new(dec!(40.00)).unwrap());
        assert_eq!(quote.total().to_display_string(), "40.00");
        assert_eq!(quote.lines()[0].unit_price, p1.price());
        assert_eq!(quote.lines()[0].quantity, 2);
        assert_eq!(quote.lines()[1].product_id, p2.id_typed());
    }

    #[test]
    fn cents_that_drift_in_binary_float_stay_exact() {
        let p = product(dec!(0.10));
        let quote = OrderAssembler.assemble([(&p, 3)]).unwrap();
        assert_eq!(quote.total(), Money::new(dec!(0.30)).unwrap());
    }

    #[test]
    fn demand_merges_repeated_products_in_id_order() {
        let a = product(dec!(1.00));
        let b = product(dec!(2.00));
        let quote = OrderAssembler.assemble([(&b, 1), (&a, 2), (&b, 3)]).unwrap();

        let mut expected = vec![(a.id_typed(), 2), (b.id_typed(), 4)];
        expected.sort();
        assert_eq!(quote.demand().unwrap(), expected);
        assert_eq!(quote.total(), Money::new(dec!(10.00)).unwrap());
    }

    #[test]
    fn empty_quote_is_zero() {
        let quote = Quote::from_lines(Vec::new()).unwrap();
        assert!(quote.total().is_zero());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: the decimal total equals the integer sum of cents × quantity.
        #[test]
        fn total_matches_integer_cents(
            lines in prop::collection::vec((0u64..1_000_000u64, 1u32..100u32), 1..10)
        ) {
            let products: Vec<(Product, u32)> = lines
                .iter()
                .map(|(cents, qty)| (product(Money::from_minor(*cents).amount()), *qty))
                .collect();

            let quote = OrderAssembler
                .assemble(products.iter().map(|(p, q)| (p, *q)))
                .unwrap();

            let expected_cents: u64 = lines.iter().map(|(c, q)| c * u64::from(*q)).sum();
            prop_assert_eq!(quote.total(), Money::from_minor(expected_cents));
        }
    }
}
