//! Checkout orchestration.
//!
//! ```text
//! CheckoutRequest
//!   ↓
//! 1. Validating   request shape + card fields (gateway clock for expiry)
//!   ↓
//! 2. Pricing      catalog read, stock sufficiency (summed per product), totals
//!   ↓
//! 3. Authorizing  payment gateway; the only suspension point that can be cancelled
//!   ↓
//! 4. Committing   conditional stock decrements + order insert + cart clear, one transaction
//!   ↓
//! 5. Succeeded    order id and total
//! ```
//!
//! Steps 1-3 are read-only. A failure at any step ends the attempt with a
//! [`CheckoutError`] and no state change. The orchestrator holds no per-attempt
//! state, so one instance serves concurrent attempts.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use storefront_core::{FieldErrors, Lenient, Money, OrderId, ProductId, UserId};
use storefront_infra::{CheckoutStore, CommitError, NewOrder, ProductCatalog};
use storefront_inventory::{InventoryGuard, StockRequest, aggregate_demand};
use storefront_orders::{Order, OrderAssembler, Quote};
use storefront_payments::{Authorization, PaymentDetails, PaymentGateway};

use crate::error::CheckoutError;
use crate::request::{CartLineInput, CheckoutRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Validating,
    Pricing,
    Authorizing,
    Committing,
    Succeeded,
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutStage::Validating => "validating",
            CheckoutStage::Pricing => "pricing",
            CheckoutStage::Authorizing => "authorizing",
            CheckoutStage::Committing => "committing",
            CheckoutStage::Succeeded => "succeeded",
        };
        f.write_str(name)
    }
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
}

impl PlacedOrder {
    pub fn order_id(&self) -> OrderId {
        self.order.id_typed()
    }

    pub fn total_amount(&self) -> Money {
        self.order.total_amount()
    }
}

/// Output of the validating stage.
struct ValidRequest {
    lines: Vec<StockRequest>,
    demand: Vec<(ProductId, u32)>,
    payment: PaymentDetails,
}

pub struct CheckoutOrchestrator {
    catalog: Arc<dyn ProductCatalog>,
    store: Arc<dyn CheckoutStore>,
    gateway: Arc<dyn PaymentGateway>,
    guard: InventoryGuard,
    assembler: OrderAssembler,
}

impl fmt::Debug for CheckoutOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckoutOrchestrator").finish_non_exhaustive()
    }
}

impl CheckoutOrchestrator {
    pub fn new(
        catalog: Arc<dyn ProductCatalog>,
        store: Arc<dyn CheckoutStore>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            catalog,
            store,
            gateway,
            guard: InventoryGuard,
            assembler: OrderAssembler,
        }
    }

    /// Run one checkout attempt to completion.
    ///
    /// Dropping the returned future before it resolves abandons the attempt;
    /// no work continues in the background.
    pub async fn place_order(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<PlacedOrder, CheckoutError> {
        self.place_order_cancellable(user_id, request, CancellationToken::new())
            .await
    }

    /// Like [`place_order`](Self::place_order), but ends with
    /// `CheckoutError::Cancelled` if `cancel` fires before the commit starts.
    #[instrument(
        name = "checkout",
        skip(self, request, cancel),
        fields(user_id = %user_id, line_count = request.line_count())
    )]
    pub async fn place_order_cancellable(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
        cancel: CancellationToken,
    ) -> Result<PlacedOrder, CheckoutError> {
        let outcome = self.run(user_id, request, &cancel).await;

        match &outcome {
            Ok(placed) => info!(
                order_id = %placed.order_id(),
                total = %placed.total_amount(),
                "order placed"
            ),
            Err(CheckoutError::Internal(detail)) => {
                error!(error = %detail, "checkout failed")
            }
            Err(err) => warn!(kind = err.code(), error = %err, "checkout rejected"),
        }
        outcome
    }

    async fn run(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
        cancel: &CancellationToken,
    ) -> Result<PlacedOrder, CheckoutError> {
        enter(CheckoutStage::Validating);
        let valid = self.validate(request)?;

        enter(CheckoutStage::Pricing);
        let quote = self.price(&valid).await?;

        enter(CheckoutStage::Authorizing);
        if cancel.is_cancelled() {
            return Err(CheckoutError::Cancelled);
        }
        let authorized = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CheckoutError::Cancelled),
            result = self.gateway.authorize(quote.total(), &valid.payment) => result,
        };
        let authorization = authorized.map_err(|e| CheckoutError::internal(e.to_string()))?;

        let payment_reference = match authorization {
            Authorization::Approved { payment_reference } => payment_reference,
            Authorization::Declined { reason } => {
                return Err(CheckoutError::PaymentDeclined { reason });
            }
        };

        if cancel.is_cancelled() {
            return Err(CheckoutError::Cancelled);
        }

        enter(CheckoutStage::Committing);
        let order = self
            .store
            .commit_order(NewOrder::new(user_id, quote, payment_reference))
            .await
            .map_err(|e| match e {
                CommitError::Conflict { product_id } => CheckoutError::CommitConflict { product_id },
                CommitError::Store(e) => CheckoutError::internal(e.to_string()),
            })?;

        enter(CheckoutStage::Succeeded);
        Ok(PlacedOrder { order })
    }

    fn validate(&self, request: CheckoutRequest) -> Result<ValidRequest, CheckoutError> {
        let mut errors = FieldErrors::new();

        let items = match request.cart_items {
            Lenient::Invalid => {
                errors.add("cartItems", "Cart items must be a list");
                Vec::new()
            }
            other => {
                let items = other.into_value().unwrap_or_default();
                if items.is_empty() {
                    errors.add("cartItems", "Cart is empty");
                }
                items
            }
        };
        let lines: Vec<StockRequest> = items
            .iter()
            .enumerate()
            .filter_map(|(idx, item)| validate_line(idx, item, &mut errors))
            .collect();

        let payment = match request.payment_details {
            Lenient::Invalid => {
                errors.add("paymentDetails", "Invalid payment details");
                None
            }
            other => match other
                .into_value()
                .unwrap_or_default()
                .validate(self.gateway.current_month())
            {
                Ok(details) => Some(details),
                Err(field_errors) => {
                    errors.merge_prefixed("paymentDetails", field_errors);
                    None
                }
            },
        };

        let demand = match aggregate_demand(&lines) {
            Ok(demand) => Some(demand),
            Err(_) => {
                errors.add("cartItems", "Requested quantity is too large");
                None
            }
        };

        match (payment, demand) {
            (Some(payment), Some(demand)) if errors.is_empty() => Ok(ValidRequest {
                lines,
                demand,
                payment,
            }),
            _ => Err(CheckoutError::Validation(errors)),
        }
    }

    async fn price(&self, valid: &ValidRequest) -> Result<Quote, CheckoutError> {
        let ids: Vec<ProductId> = valid.demand.iter().map(|(id, _)| *id).collect();
        let products = self
            .catalog
            .get_products(&ids)
            .await
            .map_err(|e| CheckoutError::internal(e.to_string()))?;

        let checked = self.guard.check(&valid.lines, &products)?;
        let quote = self
            .assembler
            .assemble(checked.iter().map(|line| (line.product, line.quantity)))
            .map_err(|e| CheckoutError::internal(e.to_string()))?;

        debug!(total = %quote.total(), "priced cart");
        Ok(quote)
    }
}

fn enter(stage: CheckoutStage) {
    debug!(%stage, "checkout stage");
}

fn validate_line(idx: usize, item: &CartLineInput, errors: &mut FieldErrors) -> Option<StockRequest> {
    let field = |name: &str| format!("cartItems[{idx}].{name}");

    let product_id = match &item.product_id {
        Lenient::Value(raw) if !raw.trim().is_empty() => match raw.parse::<ProductId>() {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add(field("productId"), "Invalid product id");
                None
            }
        },
        Lenient::Invalid => {
            errors.add(field("productId"), "Invalid product id");
            None
        }
        _ => {
            errors.add(field("productId"), "Product id is required");
            None
        }
    };

    let quantity = match item.quantity {
        Lenient::Invalid => {
            errors.add(field("quantity"), "Quantity must be a positive integer");
            None
        }
        Lenient::Missing => {
            errors.add(field("quantity"), "Quantity is required");
            None
        }
        Lenient::Value(q) if q <= 0 => {
            errors.add(field("quantity"), "Quantity must be a positive integer");
            None
        }
        Lenient::Value(q) => match u32::try_from(q) {
            Ok(q) => Some(q),
            Err(_) => {
                errors.add(field("quantity"), "Quantity is too large");
                None
            }
        },
    };

    Some(StockRequest {
        product_id: product_id?,
        quantity: quantity?,
        display_name: item.product_name.value().cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use storefront_infra::{CartStore, InMemoryStore, OrderStore};
    use storefront_inventory::StockError;
    use storefront_payments::{ExpiryMonth, GatewayError, RawPaymentDetails, SimulatedGateway};
    use storefront_products::{NewProduct, Product};

    fn this_month() -> ExpiryMonth {
        ExpiryMonth::new(2026, 10).unwrap()
    }

    fn product(name: &str, price: Decimal, stock: u32) -> Product {
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

    fn card(expiry: &str) -> RawPaymentDetails {
        RawPaymentDetails {
            card_number: Lenient::Value("4242 4242 4242 4242".to_string()),
            expiry: Lenient::Value(expiry.to_string()),
            cvv: Lenient::Value("123".to_string()),
            card_name: Lenient::Value("Test Shopper".to_string()),
        }
    }

    fn request(lines: &[(&Product, i64)]) -> CheckoutRequest {
        CheckoutRequest::new(
            lines
                .iter()
                .map(|(p, q)| CartLineInput::new(p.id_typed(), *q).named(p.name()))
                .collect(),
            card("12/30"),
        )
    }

    fn orchestrator<G>(store: &Arc<InMemoryStore>, gateway: G) -> CheckoutOrchestrator
    where
        G: PaymentGateway + 'static,
    {
        CheckoutOrchestrator::new(store.clone(), store.clone(), Arc::new(gateway))
    }

    fn approving() -> SimulatedGateway {
        SimulatedGateway::always_approve().with_current_month(this_month())
    }

    async fn stock_of(store: &InMemoryStore, id: ProductId) -> u32 {
        store.get_product(id).await.unwrap().unwrap().stock()
    }

    /// Approves, but first spends stock behind the orchestrator's back.
    struct RacingGateway {
        store: Arc<InMemoryStore>,
        product_id: ProductId,
    }

    #[async_trait]
    impl PaymentGateway for RacingGateway {
        async fn authorize(
            &self,
            _amount: Money,
            _details: &PaymentDetails,
        ) -> Result<Authorization, GatewayError> {
            self.store.decrement_stock(self.product_id, 1).await.unwrap();
            Ok(Authorization::Approved {
                payment_reference: "mock_payment_race".to_string(),
            })
        }
    }

    /// Never answers.
    struct HangingGateway;

    #[async_trait]
    impl PaymentGateway for HangingGateway {
        async fn authorize(
            &self,
            _amount: Money,
            _details: &PaymentDetails,
        ) -> Result<Authorization, GatewayError> {
            std::future::pending().await
        }
    }

    struct BrokenGateway;

    #[async_trait]
    impl PaymentGateway for BrokenGateway {
        async fn authorize(
            &self,
            _amount: Money,
            _details: &PaymentDetails,
        ) -> Result<Authorization, GatewayError> {
            Err(GatewayError::Unavailable("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn approved_checkout_commits_order_stock_and_cart() {
        let p1 = product("Next.js T-Shirt", dec!(10.00), 5);
        let p2 = product("Prisma Mug", dec!(20.00), 5);
        let store = Arc::new(InMemoryStore::with_products([p1.clone(), p2.clone()]));
        let user = UserId::new();
        store.add_item(user, p1.id_typed(), 2).await.unwrap();
        store.add_item(user, p2.id_typed(), 1).await.unwrap();

        let placed = orchestrator(&store, approving())
            .place_order(user, request(&[(&p1, 2), (&p2, 1)]))
            .await
            .unwrap();

        assert_eq!(placed.total_amount(), Money::new(dec!(40.00)).unwrap());
        assert_eq!(placed.total_amount().to_string(), "40.00");
        assert_eq!(stock_of(&store, p1.id_typed()).await, 3);
        assert_eq!(stock_of(&store, p2.id_typed()).await, 4);
        assert!(store.get_cart(user).await.unwrap().is_empty());

        let stored = store.get_order(user, placed.order_id()).await.unwrap().unwrap();
        assert!(stored.payment_reference().starts_with("mock_payment_"));
        assert_eq!(stored.lines()[0].unit_price, p1.price());
    }

    #[tokio::test]
    async fn quantity_above_stock_is_a_stock_error_and_changes_nothing() {
        let mug = product("Prisma Mug", dec!(15.50), 1);
        let store = Arc::new(InMemoryStore::with_products([mug.clone()]));
        let user = UserId::new();

        let err = orchestrator(&store, approving())
            .place_order(user, request(&[(&mug, 2)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Stock(StockError::InsufficientStock { requested: 2, available: 1, .. })
        ));
        assert!(err.user_message().contains("Prisma Mug"));
        assert_eq!(stock_of(&store, mug.id_typed()).await, 1);
        assert!(store.list_orders(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn decline_leaves_every_table_unchanged() {
        let mug = product("Prisma Mug", dec!(15.50), 4);
        let store = Arc::new(InMemoryStore::with_products([mug.clone()]));
        let user = UserId::new();
        store.add_item(user, mug.id_typed(), 2).await.unwrap();

        let products_before = store.list_products().await.unwrap();
        let cart_before = store.get_cart(user).await.unwrap();
        let orders_before = store.list_orders(user).await.unwrap();

        let gateway = SimulatedGateway::always_decline().with_current_month(this_month());
        let err = orchestrator(&store, gateway)
            .place_order(user, request(&[(&mug, 2)]))
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::PaymentDeclined { .. }));
        assert_eq!(err.user_message(), "Payment failed. Please try again.");
        assert_eq!(store.list_products().await.unwrap(), products_before);
        assert_eq!(store.get_cart(user).await.unwrap(), cart_before);
        assert_eq!(store.list_orders(user).await.unwrap(), orders_before);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_checkouts_for_the_last_unit_have_one_winner() {
        let sticker = product("Zustand Sticker Pack", dec!(9.99), 1);
        let store = Arc::new(InMemoryStore::with_products([sticker.clone()]));
        let gateway = SimulatedGateway::new(1.0, Duration::from_millis(5), Duration::from_millis(25))
            .with_current_month(this_month());
        let checkout = Arc::new(orchestrator(&store, gateway));

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let checkout = checkout.clone();
                let req = request(&[(&sticker, 1)]);
                tokio::spawn(async move { checkout.place_order(UserId::new(), req).await })
            })
            .collect();

        let mut wins = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => wins += 1,
                Err(CheckoutError::Stock(_)) | Err(CheckoutError::CommitConflict { .. }) => {}
                Err(other) => panic!("unexpected failure: {other:?}"),
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(stock_of(&store, sticker.id_typed()).await, 0);
    }

    #[tokio::test]
    async fn stock_spent_during_authorization_is_a_commit_conflict() {
        let hoodie = product("Tailwind CSS Hoodie", dec!(49.00), 1);
        let store = Arc::new(InMemoryStore::with_products([hoodie.clone()]));
        let user = UserId::new();
        store.add_item(user, hoodie.id_typed(), 1).await.unwrap();

        let gateway = RacingGateway {
            store: store.clone(),
            product_id: hoodie.id_typed(),
        };
        let err = orchestrator(&store, gateway)
            .place_order(user, request(&[(&hoodie, 1)]))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CheckoutError::CommitConflict {
                product_id: hoodie.id_typed()
            }
        );
        assert!(err.is_retryable());
        assert!(store.list_orders(user).await.unwrap().is_empty());
        assert_eq!(store.get_cart(user).await.unwrap().items().len(), 1);
    }

    #[tokio::test]
    async fn validation_failures_are_field_tagged_and_stable() {
        let mug = product("Prisma Mug", dec!(15.50), 10);
        let store = Arc::new(InMemoryStore::with_products([mug.clone()]));
        let checkout = orchestrator(&store, approving());

        let bad = CheckoutRequest::new(
            vec![
                CartLineInput::new(mug.id_typed(), 1),
                CartLineInput::new("not-a-uuid", 0),
            ],
            RawPaymentDetails {
                cvv: Lenient::Value("12".to_string()),
                ..card("12/30")
            },
        );

        let first = checkout.place_order(UserId::new(), bad.clone()).await.unwrap_err();
        let second = checkout.place_order(UserId::new(), bad).await.unwrap_err();

        assert_eq!(first, second);
        let errors = first.field_errors().unwrap();
        assert_eq!(errors.get("cartItems[1].productId"), Some("Invalid product id"));
        assert_eq!(
            errors.get("cartItems[1].quantity"),
            Some("Quantity must be a positive integer")
        );
        assert_eq!(errors.get("paymentDetails.cvv"), Some("Invalid CVV format"));
        assert!(!errors.contains("cartItems[0].quantity"));
    }

    #[tokio::test]
    async fn empty_cart_and_missing_payment_are_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let err = orchestrator(&store, approving())
            .place_order(UserId::new(), CheckoutRequest::default())
            .await
            .unwrap_err();

        let errors = err.field_errors().unwrap();
        assert_eq!(errors.get("cartItems"), Some("Cart is empty"));
        assert!(errors.contains("paymentDetails.cardNumber"));
        assert!(errors.contains("paymentDetails.expiry"));
    }

    #[tokio::test]
    async fn mistyped_json_values_stay_field_tagged() {
        let mug = product("Prisma Mug", dec!(15.50), 10);
        let store = Arc::new(InMemoryStore::with_products([mug.clone()]));
        let body = serde_json::json!({
            "cartItems": [
                { "productId": mug.id_typed().to_string(), "quantity": "2" },
                { "productId": 42, "quantity": 1.5 },
            ],
            "paymentDetails": {
                "cardNumber": 4242424242424242u64,
                "expiry": "12/30",
                "cvv": "123",
                "cardName": "Test Shopper",
            },
        });
        let request: CheckoutRequest = serde_json::from_value(body).unwrap();

        let err = orchestrator(&store, approving())
            .place_order(UserId::new(), request)
            .await
            .unwrap_err();

        let errors = err.field_errors().unwrap();
        assert_eq!(
            errors.get("cartItems[0].quantity"),
            Some("Quantity must be a positive integer")
        );
        assert_eq!(errors.get("cartItems[1].productId"), Some("Invalid product id"));
        assert!(errors.contains("cartItems[1].quantity"));
        assert_eq!(
            errors.get("paymentDetails.cardNumber"),
            Some("Invalid card number format")
        );
        assert!(!errors.contains("body"));
        assert_eq!(store.get_product(mug.id_typed()).await.unwrap().unwrap().stock(), 10);
    }

    #[tokio::test]
    async fn negative_quantity_is_rejected_before_pricing() {
        let mug = product("Prisma Mug", dec!(15.50), 10);
        let store = Arc::new(InMemoryStore::with_products([mug.clone()]));

        let err = orchestrator(&store, approving())
            .place_order(UserId::new(), request(&[(&mug, -3)]))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "validation_error");
        assert_eq!(stock_of(&store, mug.id_typed()).await, 10);
    }

    #[tokio::test]
    async fn repeated_lines_are_checked_against_their_sum() {
        let guide = product("PostgreSQL Database Guide", dec!(35.00), 3);
        let store = Arc::new(InMemoryStore::with_products([guide.clone()]));
        let checkout = orchestrator(&store, approving());

        let err = checkout
            .place_order(UserId::new(), request(&[(&guide, 2), (&guide, 2)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Stock(StockError::InsufficientStock { requested: 4, available: 3, .. })
        ));

        let placed = checkout
            .place_order(UserId::new(), request(&[(&guide, 2), (&guide, 1)]))
            .await
            .unwrap();
        assert_eq!(placed.total_amount().to_string(), "105.00");
        assert_eq!(placed.order.lines().len(), 2);
        assert_eq!(stock_of(&store, guide.id_typed()).await, 0);
    }

    #[tokio::test]
    async fn unknown_product_is_reported_by_its_client_label() {
        let store = Arc::new(InMemoryStore::new());
        let missing = ProductId::new();
        let req = CheckoutRequest::new(
            vec![CartLineInput::new(missing, 1).named("Retired Poster")],
            card("12/30"),
        );

        let err = orchestrator(&store, approving())
            .place_order(UserId::new(), req)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            CheckoutError::Stock(StockError::ProductNotFound {
                product_id: missing,
                name: "Retired Poster".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn expiry_in_the_gateway_month_is_accepted_prior_month_is_not() {
        let mug = product("Prisma Mug", dec!(15.50), 10);
        let store = Arc::new(InMemoryStore::with_products([mug.clone()]));
        let checkout = orchestrator(&store, approving());
        let line = vec![CartLineInput::new(mug.id_typed(), 1)];

        checkout
            .place_order(UserId::new(), CheckoutRequest::new(line.clone(), card("10/26")))
            .await
            .unwrap();

        let err = checkout
            .place_order(UserId::new(), CheckoutRequest::new(line, card("09/26")))
            .await
            .unwrap_err();
        assert_eq!(
            err.field_errors().and_then(|e| e.get("paymentDetails.expiry")),
            Some("Card has expired")
        );
    }

    #[tokio::test]
    async fn cancellation_during_authorization_never_commits() {
        let mug = product("Prisma Mug", dec!(15.50), 10);
        let store = Arc::new(InMemoryStore::with_products([mug.clone()]));
        let user = UserId::new();
        store.add_item(user, mug.id_typed(), 1).await.unwrap();
        let checkout = orchestrator(&store, HangingGateway);

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            trigger.cancel();
        });

        let err = checkout
            .place_order_cancellable(user, request(&[(&mug, 1)]), token)
            .await
            .unwrap_err();

        assert_eq!(err, CheckoutError::Cancelled);
        assert_eq!(stock_of(&store, mug.id_typed()).await, 10);
        assert_eq!(store.get_cart(user).await.unwrap().items().len(), 1);
        assert!(store.list_orders(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_is_internal_and_changes_nothing() {
        let mug = product("Prisma Mug", dec!(15.50), 10);
        let store = Arc::new(InMemoryStore::with_products([mug.clone()]));

        let err = orchestrator(&store, BrokenGateway)
            .place_order(UserId::new(), request(&[(&mug, 1)]))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "internal_error");
        assert_eq!(err.user_message(), "Internal server error during checkout");
        assert_eq!(stock_of(&store, mug.id_typed()).await, 10);
    }
}
