use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use storefront_checkout::CheckoutRequest;

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new().route("/", post(checkout))
}

/// Place an order for the submitted lines.
///
/// If the client disconnects, the handler future is dropped and the attempt is
/// abandoned; a commit that already started either finishes or rolls back.
pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    body: Bytes,
) -> axum::response::Response {
    let request: CheckoutRequest = match dto::parse_body(&body) {
        Ok(req) => req,
        Err(res) => return res,
    };

    match services.checkout.place_order(user.user_id(), request).await {
        Ok(placed) => (StatusCode::OK, Json(dto::CheckoutResponse::from(&placed))).into_response(),
        Err(e) => errors::checkout_error_to_response(&e),
    }
}
