use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use storefront_checkout::CheckoutError;

use crate::app::errors;
use crate::context::UserContext;
use crate::identity::IdentityProvider;

#[derive(Clone)]
pub struct AuthState {
    pub identity: Arc<dyn IdentityProvider>,
}

/// Resolve the bearer token to a user, or answer 401 with the failure body.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let user_id = extract_bearer(req.headers()).and_then(|token| state.identity.resolve(token));

    let Some(user_id) = user_id else {
        return errors::checkout_error_to_response(&CheckoutError::Unauthenticated);
    };

    req.extensions_mut().insert(UserContext::new(user_id));
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
