use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};

use storefront_cart::{CartChange, CartItem};
use storefront_core::CartItemId;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart).post(add_item))
        .route("/items/:id", put(update_item).delete(remove_item))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    let cart = match services.carts.get_cart(user.user_id()).await {
        Ok(cart) => cart,
        Err(e) => return errors::store_error_to_response(e),
    };

    let ids: Vec<_> = cart.items().iter().map(|i| i.product_id).collect();
    let products = match services.catalog.get_products(&ids).await {
        Ok(products) => products,
        Err(e) => return errors::store_error_to_response(e),
    };

    match dto::CartView::new(&cart, &products) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// 201 when a new line was created, 200 when it merged into an existing one.
pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    body: Bytes,
) -> axum::response::Response {
    let req: dto::AddCartItemRequest = match dto::parse_body(&body) {
        Ok(req) => req,
        Err(res) => return res,
    };
    let (product_id, quantity) = match req.validate() {
        Ok(v) => v,
        Err(fields) => return errors::validation_error("Invalid cart item", &fields),
    };

    let change = match services.carts.add_item(user.user_id(), product_id, quantity).await {
        Ok(change) => change,
        Err(e) => return errors::store_error_to_response(e),
    };

    match change {
        CartChange::Added(item) => item_response(&services, StatusCode::CREATED, &item).await,
        CartChange::Updated(item) => item_response(&services, StatusCode::OK, &item).await,
        CartChange::Removed(_) => removed_response(),
    }
}

/// Quantity 0 removes the line.
pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    let item_id: CartItemId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let req: dto::UpdateCartItemRequest = match dto::parse_body(&body) {
        Ok(req) => req,
        Err(res) => return res,
    };
    let quantity = match req.validate() {
        Ok(q) => q,
        Err(fields) => return errors::validation_error("Invalid cart item", &fields),
    };

    match services.carts.set_quantity(user.user_id(), item_id, quantity).await {
        Ok(CartChange::Added(item) | CartChange::Updated(item)) => {
            item_response(&services, StatusCode::OK, &item).await
        }
        Ok(CartChange::Removed(_)) => removed_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let item_id: CartItemId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.carts.remove_item(user.user_id(), item_id).await {
        Ok(_) => removed_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn item_response(
    services: &AppServices,
    status: StatusCode,
    item: &CartItem,
) -> axum::response::Response {
    let product = match services.catalog.get_product(item.product_id).await {
        Ok(product) => product,
        Err(e) => return errors::store_error_to_response(e),
    };

    match dto::CartItemView::new(item, product.as_ref()) {
        Ok(view) => (status, Json(view)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

fn removed_response() -> axum::response::Response {
    (
        StatusCode::OK,
        Json(dto::MessageResponse {
            message: "Item removed from cart",
        }),
    )
        .into_response()
}
