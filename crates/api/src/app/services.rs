use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use storefront_checkout::CheckoutOrchestrator;
use storefront_infra::{
    AppConfig, CartStore, CheckoutStore, InMemoryStore, OrderStore, PostgresStore,
    ProductCatalog, seed::seed_catalog,
};
use storefront_payments::{PaymentGateway, SimulatedGateway};

/// Everything a handler needs, behind trait objects so the backend is a wiring
/// decision only.
pub struct AppServices {
    pub catalog: Arc<dyn ProductCatalog>,
    pub carts: Arc<dyn CartStore>,
    pub orders: Arc<dyn OrderStore>,
    pub checkout: CheckoutOrchestrator,
}

impl AppServices {
    /// Wire every collaborator to one backend.
    pub fn from_store<S>(store: Arc<S>, gateway: Arc<dyn PaymentGateway>) -> Self
    where
        S: ProductCatalog + CartStore + OrderStore + CheckoutStore + 'static,
    {
        let checkout = CheckoutOrchestrator::new(store.clone(), store.clone(), gateway);
        Self {
            catalog: store.clone(),
            carts: store.clone(),
            orders: store,
            checkout,
        }
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let gateway: Arc<dyn PaymentGateway> = Arc::new(SimulatedGateway::new(
        config.payment_approval_rate,
        config.payment_latency_min,
        config.payment_latency_max,
    ));

    if config.use_persistent_stores {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set when USE_PERSISTENT_STORES=true")?;

        let store = PostgresStore::connect(url)
            .await
            .context("failed to connect to Postgres")?;
        store
            .ensure_schema()
            .await
            .context("failed to create schema")?;
        let store = Arc::new(store);

        if config.seed_catalog {
            let seeded = seed_catalog(store.as_ref())
                .await
                .context("failed to seed catalog")?;
            info!(products = seeded, "seeded catalog");
        }
        info!("using Postgres stores");
        Ok(AppServices::from_store(store, gateway))
    } else {
        let store = Arc::new(InMemoryStore::new());
        if config.seed_catalog {
            let seeded = seed_catalog(store.as_ref())
                .await
                .context("failed to seed catalog")?;
            info!(products = seeded, "seeded catalog");
        }
        info!("using in-memory stores");
        Ok(AppServices::from_store(store, gateway))
    }
}
