//! # Stripe Payment Intents
//!
//! [`PaymentGateway`] backed by the Stripe Payment Intents API.
//! Requests are form-encoded with the secret key as a bearer token;
//! intents carry `metadata[order_id]` so webhooks can find their order.

use crate::config::StripeConfig;
use crate::webhook::{self, StripePaymentError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use shop_core::{
    Currency, IntentStatus, OrderId, PaymentGateway, PaymentIntent, Price, ShopError,
    ShopResult, WebhookEvent,
};
use std::collections::HashMap;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Fallback when a 429 carries no usable `Retry-After`
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

pub struct StripePaymentGateway {
    config: StripeConfig,
    client: Client,
}

impl StripePaymentGateway {
    pub fn new(config: StripeConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ShopError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/payment_intents{}", self.config.api_base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
    }

    async fn send(&self, request: RequestBuilder) -> ShopResult<PaymentIntent> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);
            return Err(map_error(status, retry_after, &body));
        }

        let intent: StripeIntentResponse = serde_json::from_str(&body).map_err(|e| {
            ShopError::Serialization(format!("Failed to parse Stripe response: {}", e))
        })?;
        intent.into_intent()
    }
}

fn map_error(status: StatusCode, retry_after: Option<u64>, body: &str) -> ShopError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ShopError::RateLimited {
            provider: PROVIDER.to_string(),
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        };
    }

    let Ok(response) = serde_json::from_str::<StripeErrorResponse>(body) else {
        return ShopError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("HTTP {}: {}", status, body),
        };
    };

    let error = response.error;
    if error.code.as_deref() == Some("resource_missing") {
        return ShopError::PaymentNotFound {
            reference: error.param.unwrap_or_else(|| "payment_intent".to_string()),
        };
    }

    let message = match error.code {
        Some(code) => format!("{} ({})", error.message, code),
        None => error.message,
    };
    ShopError::ProviderError {
        provider: PROVIDER.to_string(),
        message,
    }
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    #[instrument(skip(self, amount), fields(amount = amount.amount))]
    async fn create_intent(&self, amount: &Price, order_id: OrderId) -> ShopResult<PaymentIntent> {
        let form_params: Vec<(&str, String)> = vec![
            ("amount", amount.amount.to_string()),
            ("currency", amount.currency.as_str().to_string()),
            ("metadata[order_id]", order_id.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
        ];

        // A fresh key per attempt: a retried checkout must get a new intent.
        let idempotency_key = format!("order-{}-{}", order_id, uuid::Uuid::new_v4());
        debug!(order_id, %idempotency_key, "Creating Stripe payment intent");

        let request = self
            .client
            .post(self.url(""))
            .header("Idempotency-Key", idempotency_key)
            .form(&form_params);
        let intent = self.send(request).await?;

        info!(intent_id = %intent.id, order_id, "Created Stripe payment intent");
        Ok(intent)
    }

    #[instrument(skip(self))]
    async fn confirm_intent(&self, intent_id: &str) -> ShopResult<PaymentIntent> {
        let request = self.client.post(self.url(&format!("/{}/confirm", intent_id)));
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn cancel_intent(&self, intent_id: &str) -> ShopResult<PaymentIntent> {
        let request = self.client.post(self.url(&format!("/{}/cancel", intent_id)));
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn retrieve_intent(&self, intent_id: &str) -> ShopResult<PaymentIntent> {
        let request = self.client.get(self.url(&format!("/{}", intent_id)));
        self.send(request).await
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<WebhookEvent> {
        webhook::verify_signature(
            &self.config.webhook_secret,
            payload,
            signature,
            Utc::now().timestamp(),
        )?;
        webhook::parse_event(payload)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripeIntentResponse {
    id: String,
    amount: i64,
    currency: String,
    status: IntentStatus,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    last_payment_error: Option<StripePaymentError>,
}

impl StripeIntentResponse {
    fn into_intent(self) -> ShopResult<PaymentIntent> {
        let currency: Currency = self.currency.parse()?;
        Ok(PaymentIntent {
            order_id: self.metadata.get("order_id").and_then(|id| id.parse().ok()),
            last_error_code: self
                .last_payment_error
                .as_ref()
                .and_then(StripePaymentError::reason_code),
            id: self.id,
            client_secret: self.client_secret,
            amount: Price::from_cents(self.amount, currency),
            status: self.status,
            metadata: self.metadata,
        })
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    param: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shop_core::WebhookEventType;
    use wiremock::matchers::{body_string_contains, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn intent_body(id: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "object": "payment_intent",
            "amount": 12399,
            "currency": "usd",
            "status": status,
            "client_secret": format!("{}_secret_abc", id),
            "metadata": { "order_id": "42" }
        })
    }

    async fn gateway(server: &MockServer) -> StripePaymentGateway {
        let config =
            StripeConfig::new("sk_test_abc123", "whsec_test").with_api_base_url(server.uri());
        StripePaymentGateway::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_create_intent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("Authorization", "Bearer sk_test_abc123"))
            .and(header_exists("Idempotency-Key"))
            .and(header_exists("Stripe-Version"))
            .and(body_string_contains("amount=12399"))
            .and(body_string_contains("currency=usd"))
            .and(body_string_contains("metadata%5Border_id%5D=42"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(intent_body("pi_123", "requires_payment_method")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gateway = gateway(&server).await;
        let intent = gateway
            .create_intent(&Price::from_cents(12399, Currency::USD), 42)
            .await
            .unwrap();

        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret_abc"));
        assert_eq!(intent.amount, Price::from_cents(12399, Currency::USD));
        assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);
        assert_eq!(intent.order_id, Some(42));
    }

    #[tokio::test]
    async fn test_confirm_and_cancel() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents/pi_1/confirm"))
            .respond_with(ResponseTemplate::new(200).set_body_json(intent_body("pi_1", "succeeded")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents/pi_2/cancel"))
            .respond_with(ResponseTemplate::new(200).set_body_json(intent_body("pi_2", "canceled")))
            .mount(&server)
            .await;

        let gateway = gateway(&server).await;
        assert_eq!(
            gateway.confirm_intent("pi_1").await.unwrap().status,
            IntentStatus::Succeeded
        );
        assert_eq!(
            gateway.cancel_intent("pi_2").await.unwrap().status,
            IntentStatus::Canceled
        );
    }

    #[tokio::test]
    async fn test_retrieve_reports_decline_code() {
        let server = MockServer::start().await;
        let mut body = intent_body("pi_9", "requires_payment_method");
        body["last_payment_error"] = json!({
            "code": "card_declined",
            "decline_code": "insufficient_funds",
            "message": "Your card has insufficient funds."
        });
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let intent = gateway(&server).await.retrieve_intent("pi_9").await.unwrap();
        assert_eq!(intent.last_error_code.as_deref(), Some("insufficient_funds"));
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/payment_intents/pi_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "type": "invalid_request_error",
                    "code": "resource_missing",
                    "param": "intent",
                    "message": "No such payment_intent: 'pi_missing'"
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents/pi_bad/confirm"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": { "type": "card_error", "code": "card_declined", "message": "Your card was declined." }
            })))
            .mount(&server)
            .await;

        let gateway = gateway(&server).await;

        assert!(matches!(
            gateway.retrieve_intent("pi_missing").await,
            Err(ShopError::PaymentNotFound { .. })
        ));
        assert!(matches!(
            gateway
                .create_intent(&Price::from_cents(100, Currency::USD), 1)
                .await,
            Err(ShopError::RateLimited { retry_after_secs: 7, .. })
        ));
        match gateway.confirm_intent("pi_bad").await {
            Err(ShopError::ProviderError { provider, message }) => {
                assert_eq!(provider, "stripe");
                assert!(message.contains("card_declined"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_network_failure() {
        let config = StripeConfig::new("sk_test_abc123", "whsec_test")
            .with_api_base_url("http://127.0.0.1:1");
        let gateway = StripePaymentGateway::new(config).unwrap();

        let err = gateway.retrieve_intent("pi_1").await.unwrap_err();
        assert!(matches!(err, ShopError::NetworkError(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_verify_webhook() {
        let server = MockServer::start().await;
        let gateway = gateway(&server).await;
        let payload = serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "created": Utc::now().timestamp(),
            "data": { "object": intent_body("pi_123", "succeeded") }
        }))
        .unwrap();

        let header =
            webhook::sign_payload("whsec_test", Utc::now().timestamp(), &payload).unwrap();
        let event = gateway.verify_webhook(&payload, &header).await.unwrap();
        assert_eq!(event.event_type, WebhookEventType::PaymentSucceeded);
        assert_eq!(event.payment_intent_id.as_deref(), Some("pi_123"));
        assert_eq!(event.order_id, Some(42));

        assert!(matches!(
            gateway.verify_webhook(&payload, "t=1,v1=deadbeef").await,
            Err(ShopError::WebhookVerificationFailed(_))
        ));
    }
}
