//! # shop-api
//!
//! HTTP API layer for storefront-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - REST endpoints for catalog, cart, orders, wishlist and payments
//! - Webhook endpoint for the configured payment gateway
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/products` | List products |
//! | GET | `/api/v1/cart` | Priced cart |
//! | POST | `/api/v1/cart/items` | Add to cart |
//! | POST | `/api/v1/orders/checkout` | Order + payment intent |
//! | POST | `/api/v1/payments/intents` | Retry payment for an order |
//! | POST | `/webhooks/{provider}` | Gateway webhook |
//!
//! See [`routes::create_router`] for the full table.

pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use extract::CurrentUser;
pub use routes::create_router;
pub use state::{AppConfig, AppState, LogFormat, PaymentProvider};
