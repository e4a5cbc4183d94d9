use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use storefront_core::OrderId;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
}

/// The caller's orders, newest first.
pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    match services.orders.list_orders(user.user_id()).await {
        Ok(orders) => (StatusCode::OK, Json(orders)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Another user's order answers 404, same as a missing one.
pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.orders.get_order(user.user_id(), id).await {
        Ok(Some(order)) => (StatusCode::OK, Json(order)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "Order not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}
