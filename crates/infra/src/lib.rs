//! Infrastructure layer: storage backends, configuration, seed data.
//!
//! The collaborator traits the checkout path depends on live in [`store`]; the
//! in-memory backend serves tests and local runs, the Postgres backend serves
//! persistent deployments.

pub mod config;
pub mod error;
pub mod seed;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use error::{CommitError, StoreError};
pub use store::{
    CartStore, CheckoutStore, InMemoryStore, NewOrder, OrderStore, PostgresStore, ProductCatalog,
};
