//! # Payment Types
//!
//! Payment intents as reported by a gateway, the payment records the
//! store keeps for them, and the webhook events that move them along.

use crate::order::{OrderId, PaymentStatus};
use crate::product::{Currency, Price};
use crate::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type PaymentId = u64;

/// Lifecycle state of a payment intent on the gateway side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
}

impl IntentStatus {
    /// Map the gateway state onto the store's payment status
    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            IntentStatus::RequiresPaymentMethod
            | IntentStatus::RequiresConfirmation
            | IntentStatus::RequiresAction => PaymentStatus::Pending,
            IntentStatus::Processing | IntentStatus::RequiresCapture => PaymentStatus::Processing,
            IntentStatus::Canceled => PaymentStatus::Cancelled,
            IntentStatus::Succeeded => PaymentStatus::Succeeded,
        }
    }
}

/// A payment intent as returned by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Gateway intent id (e.g. `pi_...`)
    pub id: String,

    /// Secret the client uses to complete payment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    pub amount: Price,

    pub status: IntentStatus,

    /// Order this intent pays for, if the gateway echoed it back
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,

    /// Decline / error code of the last attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_code: Option<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Payment record stored for every intent requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub payment_intent_id: String,
    pub amount: Price,
    pub status: PaymentStatus,
    /// Gateway that issued the intent
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn from_new(id: PaymentId, new: NewPayment) -> Self {
        let now = Utc::now();
        Self {
            id,
            order_id: new.order_id,
            user_id: new.user_id,
            payment_intent_id: new.payment_intent_id,
            amount: new.amount,
            status: new.status,
            provider: new.provider,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: &PaymentUpdate) {
        self.status = update.status;
        if update.failure_reason.is_some() {
            self.failure_reason = update.failure_reason.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// Payment data before the store assigns an id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub payment_intent_id: String,
    pub amount: Price,
    pub status: PaymentStatus,
    pub provider: String,
}

impl NewPayment {
    pub fn for_intent(
        order_id: OrderId,
        user_id: UserId,
        intent: &PaymentIntent,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            order_id,
            user_id,
            payment_intent_id: intent.id.clone(),
            amount: intent.amount.clone(),
            status: intent.status.payment_status(),
            provider: provider.into(),
        }
    }
}

/// Status change for an existing payment record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUpdate {
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
}

impl PaymentUpdate {
    pub fn status(status: PaymentStatus) -> Self {
        Self {
            status,
            failure_reason: None,
        }
    }

    pub fn failed(reason: Option<String>) -> Self {
        Self {
            status: PaymentStatus::Failed,
            failure_reason: reason,
        }
    }
}

/// Webhook event types the store reacts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WebhookEventType {
    PaymentSucceeded,
    PaymentFailed,
    PaymentCanceled,
    PaymentProcessing,
    /// Anything else (acknowledged, not acted on)
    Unknown(String),
}

impl WebhookEventType {
    pub fn as_str(&self) -> &str {
        match self {
            WebhookEventType::PaymentSucceeded => "payment_intent.succeeded",
            WebhookEventType::PaymentFailed => "payment_intent.payment_failed",
            WebhookEventType::PaymentCanceled => "payment_intent.canceled",
            WebhookEventType::PaymentProcessing => "payment_intent.processing",
            WebhookEventType::Unknown(other) => other,
        }
    }
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        match s {
            "payment_intent.succeeded" => WebhookEventType::PaymentSucceeded,
            "payment_intent.payment_failed" => WebhookEventType::PaymentFailed,
            "payment_intent.canceled" => WebhookEventType::PaymentCanceled,
            "payment_intent.processing" => WebhookEventType::PaymentProcessing,
            other => WebhookEventType::Unknown(other.to_string()),
        }
    }
}

impl From<String> for WebhookEventType {
    fn from(s: String) -> Self {
        WebhookEventType::from(s.as_str())
    }
}

impl From<WebhookEventType> for String {
    fn from(t: WebhookEventType) -> Self {
        t.as_str().to_string()
    }
}

/// A verified webhook event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Event id from the provider
    pub event_id: String,

    pub event_type: WebhookEventType,

    #[serde(default)]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,

    /// Order id from the intent metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,

    /// Decline code (payment_failed only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,

    /// Amount in smallest unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,

    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl WebhookEvent {
    pub fn new(
        event_id: impl Into<String>,
        event_type: WebhookEventType,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type,
            provider: provider.into(),
            payment_intent_id: None,
            order_id: None,
            failure_code: None,
            failure_message: None,
            amount: None,
            currency: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_intent(mut self, intent_id: impl Into<String>) -> Self {
        self.payment_intent_id = Some(intent_id.into());
        self
    }

    pub fn with_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_failure(mut self, code: impl Into<String>) -> Self {
        self.failure_code = Some(code.into());
        self
    }

    /// Failure reason to record: decline code, then message
    pub fn failure_reason(&self) -> Option<String> {
        self.failure_code
            .clone()
            .or_else(|| self.failure_message.clone())
    }
}
