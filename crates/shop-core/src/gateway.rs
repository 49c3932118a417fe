//! # Payment Gateway Trait
//!
//! Seam between the checkout flow and whatever processes card payments.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  PaymentGateway (trait)                     │
//! │  ├── create_intent()      ├── retrieve_intent()             │
//! │  ├── confirm_intent()     ├── verify_webhook()              │
//! │  └── cancel_intent()      └── provider_name()               │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                  ┌─────────┴─────────┐
//!                  │                   │
//!        ┌─────────┴────────┐ ┌────────┴────────┐
//!        │StripePaymentGate-│ │   StubGateway   │
//!        │way (shop-stripe) │ │  (dev / tests)  │
//!        └──────────────────┘ └─────────────────┘
//! ```
//!
//! Calls are opaque remote operations: they may fail or time out, and
//! callers must assume a failed call left no intent behind.

use crate::error::ShopResult;
use crate::order::OrderId;
use crate::payment::{PaymentIntent, WebhookEvent};
use crate::product::Price;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Request a payment intent for `amount`, tagged with the order id.
    async fn create_intent(&self, amount: &Price, order_id: OrderId) -> ShopResult<PaymentIntent>;

    /// Confirm an intent server-side.
    async fn confirm_intent(&self, intent_id: &str) -> ShopResult<PaymentIntent>;

    /// Cancel an intent that has not succeeded yet.
    async fn cancel_intent(&self, intent_id: &str) -> ShopResult<PaymentIntent>;

    /// Fetch the current state of an intent.
    async fn retrieve_intent(&self, intent_id: &str) -> ShopResult<PaymentIntent>;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Arguments
    /// * `payload` - Raw webhook body bytes
    /// * `signature` - Signature header from the request
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<WebhookEvent>;

    /// Provider name (for logging, payment records and webhook routing).
    fn provider_name(&self) -> &'static str;

    /// Header carrying the webhook signature.
    fn signature_header(&self) -> &'static str {
        "Stripe-Signature"
    }

    /// Webhook endpoint path for this provider.
    /// Default: `/webhooks/{provider_name}`
    fn webhook_path(&self) -> String {
        format!("/webhooks/{}", self.provider_name())
    }
}

/// Shared gateway handle (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
