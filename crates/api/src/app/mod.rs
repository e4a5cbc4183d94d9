//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/gateway wiring behind the collaborator traits
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: the failure body every route answers with

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tracing::warn;

use storefront_infra::AppConfig;

use crate::identity::{IdentityProvider, StaticTokenIdentity};
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router from configuration (used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let identity = StaticTokenIdentity::new(config.api_tokens.iter().cloned());
    if identity.is_empty() {
        warn!("API_TOKENS not set; every protected route will answer 401");
    }

    let services = Arc::new(services::build_services(config).await?);
    Ok(router(services, Arc::new(identity)))
}

/// Router over already-wired services. Tests use this with their own stores.
pub fn router(services: Arc<AppServices>, identity: Arc<dyn IdentityProvider>) -> Router {
    let auth_state = middleware::AuthState { identity };

    // Protected routes: require a resolved user.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}
