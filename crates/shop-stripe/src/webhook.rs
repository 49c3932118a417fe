//! # Stripe Webhook Handling
//!
//! Signature verification for the `Stripe-Signature` header and parsing
//! of `payment_intent.*` events into [`WebhookEvent`]s.
//!
//! The header looks like `t=1700000000,v1=<hex>[,v1=<hex>...]`. A v1
//! signature is the hex HMAC-SHA256 of `"{t}.{payload}"` keyed by the
//! endpoint's signing secret.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use shop_core::{Currency, ShopError, ShopResult, WebhookEvent, WebhookEventType};
use std::collections::HashMap;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed webhook, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Events that should be enabled in the Stripe Dashboard
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[
    "payment_intent.succeeded",
    "payment_intent.payment_failed",
    "payment_intent.canceled",
    "payment_intent.processing",
];

pub(crate) struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

pub(crate) fn parse_signature_header(header: &str) -> ShopResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        ShopError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(ShopError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn compute_hmac_sha256(secret: &str, message: &[u8]) -> ShopResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ShopError::Configuration(format!("Invalid webhook secret: {}", e)))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

fn signed_payload(timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut message = format!("{}.", timestamp).into_bytes();
    message.extend_from_slice(payload);
    message
}

/// Build a `Stripe-Signature` header value for a payload.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> ShopResult<String> {
    let signature = compute_hmac_sha256(secret, &signed_payload(timestamp, payload))?;
    Ok(format!("t={},v1={}", timestamp, signature))
}

/// Check a `Stripe-Signature` header against the payload at time `now`.
pub fn verify_signature(secret: &str, payload: &[u8], header: &str, now: i64) -> ShopResult<()> {
    let parts = parse_signature_header(header)?;

    if (now - parts.timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(ShopError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let expected = compute_hmac_sha256(secret, &signed_payload(parts.timestamp, payload))?;
    if parts
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
    {
        Ok(())
    } else {
        Err(ShopError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    created: i64,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: StripeIntentObject,
}

/// The fields of a payment intent object the store reads
#[derive(Debug, Default, Deserialize)]
struct StripeIntentObject {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
    #[serde(default)]
    last_payment_error: Option<StripePaymentError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StripePaymentError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub decline_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl StripePaymentError {
    /// Most specific code available
    pub(crate) fn reason_code(&self) -> Option<String> {
        self.decline_code.clone().or_else(|| self.code.clone())
    }
}

/// Parse a verified webhook body.
pub fn parse_event(payload: &[u8]) -> ShopResult<WebhookEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| ShopError::WebhookParseError(format!("Failed to parse webhook: {}", e)))?;

    debug!("Verified Stripe webhook: type={}", event.event_type);

    let object = event.data.object;
    let mut parsed = WebhookEvent::new(
        event.id,
        WebhookEventType::from(event.event_type.as_str()),
        "stripe",
    );
    parsed.payment_intent_id = object.id;
    parsed.order_id = object.metadata.get("order_id").and_then(|id| id.parse().ok());
    parsed.amount = object.amount;
    parsed.currency = object.currency.and_then(|c| c.parse::<Currency>().ok());
    if let Some(error) = object.last_payment_error {
        parsed.failure_code = error.reason_code();
        parsed.failure_message = error.message;
    }
    parsed.timestamp = DateTime::from_timestamp(event.created, 0).unwrap_or_else(Utc::now);

    Ok(parsed)
}
