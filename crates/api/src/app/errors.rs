use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use storefront_checkout::CheckoutError;
use storefront_core::{DomainError, FieldErrors};
use storefront_infra::StoreError;

pub fn checkout_error_to_response(err: &CheckoutError) -> Response {
    let status = match err {
        CheckoutError::Validation(_)
        | CheckoutError::Stock(_)
        | CheckoutError::PaymentDeclined { .. } => StatusCode::BAD_REQUEST,
        CheckoutError::CommitConflict { .. } => StatusCode::CONFLICT,
        CheckoutError::Unauthenticated => StatusCode::UNAUTHORIZED,
        CheckoutError::Cancelled | CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    match err.field_errors() {
        Some(fields) => validation_error(err.user_message(), fields),
        None => json_error(status, err.code(), err.user_message()),
    }
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        StoreError::Invalid(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        other => {
            error!(error = %other, "store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            )
        }
    }
}

/// Bad path or body input that never reached a store.
pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::NotFound(what) => {
            json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
        }
        DomainError::InvariantViolation(msg) => {
            error!(error = %msg, "invariant violated while handling request");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error",
            )
        }
        other => json_error(StatusCode::BAD_REQUEST, "validation_error", other.to_string()),
    }
}

pub fn validation_error(message: impl Into<String>, fields: &FieldErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "status": "failed",
            "message": message.into(),
            "errors": fields,
        })),
    )
        .into_response()
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "status": "failed",
            "message": message.into(),
        })),
    )
        .into_response()
}
