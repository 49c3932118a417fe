//! # Store Error Types
//!
//! Typed error handling for the storefront.
//! Every fallible store, service and gateway operation returns
//! `Result<T, ShopError>`. Pricing itself never fails.

use thiserror::Error;

/// Core error type for all storefront operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Configuration errors (missing keys, invalid policy values)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Entity failed validation (e.g. product without a name)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Cart quantities must be at least one
    #[error("Invalid quantity {quantity}: must be at least 1")]
    InvalidQuantity { quantity: i64 },

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: u64 },

    /// Cart item not found in the caller's cart
    #[error("Cart item not found: {item_id}")]
    CartItemNotFound { item_id: u64 },

    /// Order not found (or not owned by the caller)
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: u64 },

    /// No profile stored for the user
    #[error("User not found: {user_id}")]
    UserNotFound { user_id: u64 },

    /// Email already belongs to another user
    #[error("Email already in use: {email}")]
    EmailTaken { email: String },

    /// No payment record for the given intent or order
    #[error("Payment not found: {reference}")]
    PaymentNotFound { reference: String },

    /// Checkout attempted with nothing in the cart
    #[error("Cart is empty")]
    EmptyCart,

    /// Operation not allowed for the order's current status
    #[error("Invalid order state: {message}")]
    InvalidOrderState { message: String },

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Webhook signature verification failed
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Webhook payload parsing error
    #[error("Webhook parse error: {0}")]
    WebhookParseError(String),

    /// Rate limited by provider
    #[error("Rate limited by {provider}, retry after {retry_after_secs} seconds")]
    RateLimited {
        provider: String,
        retry_after_secs: u64,
    },

    /// Backing store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShopError::NetworkError(_)
                | ShopError::RateLimited { .. }
                | ShopError::ProviderError { .. }
                | ShopError::Storage(_)
        )
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Configuration(_) => 500,
            ShopError::InvalidRequest(_) => 400,
            ShopError::Validation(_) => 400,
            ShopError::InvalidQuantity { .. } => 400,
            ShopError::ProductNotFound { .. } => 404,
            ShopError::CartItemNotFound { .. } => 404,
            ShopError::OrderNotFound { .. } => 404,
            ShopError::UserNotFound { .. } => 404,
            ShopError::EmailTaken { .. } => 409,
            ShopError::PaymentNotFound { .. } => 404,
            ShopError::EmptyCart => 400,
            ShopError::InvalidOrderState { .. } => 409,
            ShopError::ProviderError { .. } => 502,
            ShopError::NetworkError(_) => 503,
            ShopError::WebhookVerificationFailed(_) => 401,
            ShopError::WebhookParseError(_) => 400,
            ShopError::RateLimited { .. } => 429,
            ShopError::Storage(_) => 500,
            ShopError::Serialization(_) => 500,
            ShopError::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        ShopError::Serialization(err.to_string())
    }
}

/// Result type alias for storefront operations
pub type ShopResult<T> = Result<T, ShopError>;
