//! Stub payment gateway.
//!
//! Simulates the intent lifecycle in process without calling a real
//! processor. Used by `PAYMENT_PROVIDER=stub` and by tests.

use crate::error::{ShopError, ShopResult};
use crate::gateway::PaymentGateway;
use crate::order::OrderId;
use crate::payment::{IntentStatus, PaymentIntent, WebhookEvent};
use crate::product::Price;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

const PROVIDER: &str = "stub";

/// Webhook secret used when none is configured
pub const DEFAULT_STUB_WEBHOOK_SECRET: &str = "whsec_stub";

/// In-process gateway with deterministic intent ids (`pi_stub_1`, ...)
pub struct StubGateway {
    intents: RwLock<HashMap<String, PaymentIntent>>,
    intent_counter: AtomicU64,
    /// Fail the next gateway call
    fail_next: AtomicBool,
    webhook_secret: String,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::with_webhook_secret(DEFAULT_STUB_WEBHOOK_SECRET)
    }

    /// Webhooks are accepted when their signature equals `secret`.
    pub fn with_webhook_secret(secret: impl Into<String>) -> Self {
        Self {
            intents: RwLock::new(HashMap::new()),
            intent_counter: AtomicU64::new(0),
            fail_next: AtomicBool::new(false),
            webhook_secret: secret.into(),
        }
    }

    /// Configure the next call to fail.
    pub fn set_fail_next(&self, fail: bool) {
        self.fail_next.store(fail, Ordering::SeqCst);
    }

    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }

    pub async fn intent_count(&self) -> usize {
        self.intents.read().await.len()
    }

    /// Force an intent into a state (simulates processor-side changes).
    pub async fn set_status(&self, intent_id: &str, status: IntentStatus) -> ShopResult<()> {
        let mut intents = self.intents.write().await;
        let intent = intents.get_mut(intent_id).ok_or_else(|| not_found(intent_id))?;
        intent.status = status;
        Ok(())
    }

    fn should_fail(&self) -> bool {
        self.fail_next.swap(false, Ordering::SeqCst)
    }

    fn simulated_failure(operation: &str) -> ShopError {
        ShopError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("Simulated {} failure", operation),
        }
    }

    async fn transition(
        &self,
        intent_id: &str,
        operation: &str,
        status: IntentStatus,
        blocked_by: IntentStatus,
    ) -> ShopResult<PaymentIntent> {
        if self.should_fail() {
            return Err(Self::simulated_failure(operation));
        }

        let mut intents = self.intents.write().await;
        let intent = intents.get_mut(intent_id).ok_or_else(|| not_found(intent_id))?;
        if intent.status == blocked_by {
            return Err(ShopError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!(
                    "cannot {} intent {} in status {:?}",
                    operation, intent_id, intent.status
                ),
            });
        }
        intent.status = status;
        debug!(intent_id, ?status, "Stub: intent {}", operation);
        Ok(intent.clone())
    }
}

impl Default for StubGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(intent_id: &str) -> ShopError {
    ShopError::PaymentNotFound {
        reference: intent_id.to_string(),
    }
}

#[async_trait]
impl PaymentGateway for StubGateway {
    async fn create_intent(&self, amount: &Price, order_id: OrderId) -> ShopResult<PaymentIntent> {
        if self.should_fail() {
            return Err(Self::simulated_failure("create intent"));
        }

        let n = self.intent_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_stub_{}", n);
        let intent = PaymentIntent {
            client_secret: Some(format!("{}_secret_stub", id)),
            id: id.clone(),
            amount: amount.clone(),
            status: IntentStatus::RequiresPaymentMethod,
            order_id: Some(order_id),
            last_error_code: None,
            metadata: HashMap::from([("order_id".to_string(), order_id.to_string())]),
        };

        self.intents.write().await.insert(id, intent.clone());
        debug!(intent_id = %intent.id, order_id, "Stub: intent created");
        Ok(intent)
    }

    async fn confirm_intent(&self, intent_id: &str) -> ShopResult<PaymentIntent> {
        self.transition(intent_id, "confirm", IntentStatus::Succeeded, IntentStatus::Canceled)
            .await
    }

    async fn cancel_intent(&self, intent_id: &str) -> ShopResult<PaymentIntent> {
        self.transition(intent_id, "cancel", IntentStatus::Canceled, IntentStatus::Succeeded)
            .await
    }

    async fn retrieve_intent(&self, intent_id: &str) -> ShopResult<PaymentIntent> {
        if self.should_fail() {
            return Err(Self::simulated_failure("retrieve intent"));
        }
        self.intents
            .read()
            .await
            .get(intent_id)
            .cloned()
            .ok_or_else(|| not_found(intent_id))
    }

    /// The payload is a JSON-encoded [`WebhookEvent`].
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<WebhookEvent> {
        if signature != self.webhook_secret {
            return Err(ShopError::WebhookVerificationFailed(
                "Signature mismatch".to_string(),
            ));
        }

        let mut event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| ShopError::WebhookParseError(e.to_string()))?;
        event.provider = PROVIDER.to_string();
        Ok(event)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    fn signature_header(&self) -> &'static str {
        "X-Stub-Signature"
    }
}
