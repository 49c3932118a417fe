//! # Request Handlers
//!
//! Axum request handlers for the store API, grouped by resource.
//! Every handler returns `Result<_, ApiError>`; store errors are mapped
//! to their HTTP status through [`shop_error_to_response`].

pub mod cart;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;
pub mod webhooks;
pub mod wishlist;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use shop_core::{Order, ShopError};
use tracing::error;

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Order left behind by a checkout that failed after creating it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
            order: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_status(err: &ShopError) -> StatusCode {
    StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub fn shop_error_to_response(err: ShopError) -> ApiError {
    let status = error_status(&err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    let mut response = ErrorResponse::new(err.to_string(), status.as_u16());
    if err.is_retryable() {
        response = response.with_details("retryable");
    }
    (status, Json(response))
}

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400);
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
        assert!(err.order.is_none());
    }

    #[test]
    fn test_shop_error_conversion() {
        let (status, Json(body)) =
            shop_error_to_response(ShopError::InvalidQuantity { quantity: 0 });
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, 400);
        assert!(body.details.is_none());

        let (status, Json(body)) =
            shop_error_to_response(ShopError::NetworkError("timeout".into()));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.details.as_deref(), Some("retryable"));
    }
}
