//! # shop-stripe
//!
//! Stripe payment gateway for storefront-rs.
//!
//! [`StripePaymentGateway`] implements `shop_core::PaymentGateway` on top
//! of the Payment Intents API:
//! - Form-encoded requests with a per-attempt idempotency key
//! - `metadata[order_id]` on every intent
//! - `Stripe-Signature` webhook verification (HMAC-SHA256, 5 minute tolerance)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_stripe::StripePaymentGateway;
//! use shop_core::PaymentGateway;
//!
//! let gateway = StripePaymentGateway::from_env()?;
//! let intent = gateway.create_intent(&order.total, order.id).await?;
//!
//! // Hand intent.client_secret to the browser
//! ```
//!
//! ## Webhook Handling
//!
//! ```rust,ignore
//! // In your webhook endpoint:
//! let event = gateway.verify_webhook(payload, signature).await?;
//! payments.apply_event(&event).await?;
//! ```

pub mod config;
pub mod intents;
pub mod webhook;

// Re-exports
pub use config::StripeConfig;
pub use intents::StripePaymentGateway;
pub use webhook::{parse_event, sign_payload, verify_signature, REQUIRED_WEBHOOK_EVENTS};
