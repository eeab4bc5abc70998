//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::{DomainError, OrderError, StoreError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// No shopper identity on an identity-scoped operation.
    NotAuthenticated,
    /// Admin-only operation without the admin flag.
    Forbidden,
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Checkout / payment processing error.
    Checkout(CheckoutError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotAuthenticated => {
                (StatusCode::UNAUTHORIZED, "authentication required".to_string())
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "admin access required".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Checkout(err) => checkout_error_to_response(err),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    match &err {
        DomainError::ProductNotFound { .. }
        | DomainError::OrderNotFound { .. }
        | DomainError::UserNotFound { .. }
        | DomainError::Cart(_) => (StatusCode::NOT_FOUND, err.to_string()),
        DomainError::Order(OrderError::EmptyCart) => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::Order(OrderError::InvalidTransition { .. }) => {
            (StatusCode::CONFLICT, err.to_string())
        }
        DomainError::Catalog(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        DomainError::Store(store_err) => store_error_to_response(store_err, &err),
    }
}

fn store_error_to_response(store_err: &StoreError, err: &DomainError) -> (StatusCode, String) {
    match store_err {
        // A conflict that survived the bounded retries.
        StoreError::RevisionConflict { .. } => (StatusCode::CONFLICT, err.to_string()),
        StoreError::Unavailable(_) | StoreError::Timeout(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        StoreError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match err {
        CheckoutError::Verification(_) | CheckoutError::MalformedEvent(_) => {
            (StatusCode::BAD_REQUEST, err.to_string())
        }
        CheckoutError::Domain(domain_err) => domain_error_to_response(domain_err),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}
