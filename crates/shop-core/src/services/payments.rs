//! # Payment Service
//!
//! Owns the intent lifecycle: requests intents from the gateway, keeps
//! the payment records, and moves orders along as the gateway reports
//! outcomes (synchronously or through webhooks).
//!
//! Succeeded and cancelled payments are final. Late or replayed events
//! never move a payment out of a final state.

use crate::error::{ShopError, ShopResult};
use crate::gateway::BoxedPaymentGateway;
use crate::order::{Order, OrderId, OrderStatus, OrderUpdate, PaymentStatus};
use crate::payment::{
    IntentStatus, NewPayment, Payment, PaymentIntent, PaymentUpdate, WebhookEvent,
    WebhookEventType,
};
use crate::repository::{SharedOrderRepository, SharedPaymentRepository};
use crate::UserId;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// An order with the intent just requested for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentReceipt {
    pub order: Order,
    pub payment: Payment,
    /// Handed to the client to complete payment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

pub struct PaymentService {
    gateway: BoxedPaymentGateway,
    payments: SharedPaymentRepository,
    orders: SharedOrderRepository,
}

impl PaymentService {
    pub fn new(
        gateway: BoxedPaymentGateway,
        payments: SharedPaymentRepository,
        orders: SharedOrderRepository,
    ) -> Self {
        Self {
            gateway,
            payments,
            orders,
        }
    }

    pub fn gateway(&self) -> &BoxedPaymentGateway {
        &self.gateway
    }

    async fn owned_order(&self, user_id: UserId, order_id: OrderId) -> ShopResult<Order> {
        self.orders
            .get(order_id)
            .await?
            .filter(|o| o.is_owned_by(user_id))
            .ok_or(ShopError::OrderNotFound { order_id })
    }

    async fn owned_payment(&self, user_id: UserId, intent_id: &str) -> ShopResult<Payment> {
        self.payments
            .find_by_intent(intent_id)
            .await?
            .filter(|p| p.user_id == user_id)
            .ok_or_else(|| ShopError::PaymentNotFound {
                reference: intent_id.to_string(),
            })
    }

    /// Request an intent for the order total and record it.
    #[instrument(skip(self, order), fields(order_id = order.id, total = order.total.amount))]
    pub async fn create_intent(&self, order: &Order) -> ShopResult<IntentReceipt> {
        let intent = self.gateway.create_intent(&order.total, order.id).await?;
        info!(
            intent_id = %intent.id,
            provider = self.gateway.provider_name(),
            "Created payment intent"
        );

        let payment = self
            .payments
            .save_intent(NewPayment::for_intent(
                order.id,
                order.user_id,
                &intent,
                self.gateway.provider_name(),
            ))
            .await?;
        let order = self
            .orders
            .update(
                order.id,
                OrderUpdate::new()
                    .payment_intent(intent.id.clone())
                    .payment_status(intent.status.payment_status()),
            )
            .await?;

        Ok(IntentReceipt {
            order,
            payment,
            client_secret: intent.client_secret,
        })
    }

    /// New intent for an owned order that is still awaiting payment.
    #[instrument(skip(self))]
    pub async fn retry_intent(&self, user_id: UserId, order_id: OrderId) -> ShopResult<IntentReceipt> {
        let order = self.owned_order(user_id, order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(ShopError::InvalidOrderState {
                message: format!("order {} is {}", order.id, order.status),
            });
        }
        if !matches!(
            order.payment_status,
            PaymentStatus::Pending | PaymentStatus::Failed
        ) {
            return Err(ShopError::InvalidOrderState {
                message: format!("order {} payment is {}", order.id, order.payment_status),
            });
        }
        self.create_intent(&order).await
    }

    #[instrument(skip(self))]
    pub async fn confirm(&self, user_id: UserId, intent_id: &str) -> ShopResult<Payment> {
        let payment = self.owned_payment(user_id, intent_id).await?;
        let intent = self.gateway.confirm_intent(intent_id).await?;
        self.sync_intent(&payment, &intent).await
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: UserId, intent_id: &str) -> ShopResult<Payment> {
        let payment = self.owned_payment(user_id, intent_id).await?;
        let intent = self.gateway.cancel_intent(intent_id).await?;
        self.sync_intent(&payment, &intent).await
    }

    /// Current intent state from the gateway, reflected into the records.
    #[instrument(skip(self))]
    pub async fn status(&self, user_id: UserId, intent_id: &str) -> ShopResult<Payment> {
        let payment = self.owned_payment(user_id, intent_id).await?;
        let intent = self.gateway.retrieve_intent(intent_id).await?;
        self.sync_intent(&payment, &intent).await
    }

    async fn sync_intent(&self, payment: &Payment, intent: &PaymentIntent) -> ShopResult<Payment> {
        // A declined attempt sends the intent back to requires_payment_method.
        let status = match (intent.status, &intent.last_error_code) {
            (IntentStatus::RequiresPaymentMethod, Some(_)) => PaymentStatus::Failed,
            (status, _) => status.payment_status(),
        };
        self.record_outcome(payment, status, intent.last_error_code.clone())
            .await
    }

    /// Apply an outcome to a payment record and its order.
    async fn record_outcome(
        &self,
        payment: &Payment,
        status: PaymentStatus,
        failure_reason: Option<String>,
    ) -> ShopResult<Payment> {
        if payment.status == status {
            return Ok(payment.clone());
        }
        if payment.status.is_final() {
            warn!(
                intent_id = %payment.payment_intent_id,
                current = %payment.status,
                ignored = %status,
                "Ignoring transition out of final payment state"
            );
            return Ok(payment.clone());
        }

        let update = match status {
            PaymentStatus::Failed => PaymentUpdate::failed(failure_reason),
            other => PaymentUpdate::status(other),
        };
        let updated = self
            .payments
            .update_by_intent(&payment.payment_intent_id, update)
            .await?;

        let Some(order) = self.orders.get(payment.order_id).await? else {
            warn!(order_id = payment.order_id, "Payment references a missing order");
            return Ok(updated);
        };

        // A superseded intent only matters to the order if it succeeded.
        let current = order.payment_intent_id.as_deref() == Some(payment.payment_intent_id.as_str());
        if !current && status != PaymentStatus::Succeeded {
            debug!(intent_id = %payment.payment_intent_id, "Outcome for superseded intent");
            return Ok(updated);
        }

        let mut order_update = OrderUpdate::new().payment_status(status);
        if status == PaymentStatus::Succeeded && order.status == OrderStatus::Pending {
            order_update = order_update.status(OrderStatus::Processing);
        }
        self.orders.update(order.id, order_update).await?;

        info!(
            order_id = order.id,
            intent_id = %payment.payment_intent_id,
            status = %status,
            "Payment status updated"
        );
        Ok(updated)
    }

    /// Verify a webhook and apply it.
    #[instrument(skip(self, payload, signature))]
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<WebhookEvent> {
        let event = self.gateway.verify_webhook(payload, signature).await?;
        info!(
            event_id = %event.event_id,
            event_type = event.event_type.as_str(),
            "Webhook verified"
        );
        self.apply_event(&event).await?;
        Ok(event)
    }

    /// Returns `true` if the event changed a payment record.
    pub async fn apply_event(&self, event: &WebhookEvent) -> ShopResult<bool> {
        let (status, reason) = match &event.event_type {
            WebhookEventType::PaymentSucceeded => (PaymentStatus::Succeeded, None),
            WebhookEventType::PaymentFailed => (PaymentStatus::Failed, event.failure_reason()),
            WebhookEventType::PaymentCanceled => (PaymentStatus::Cancelled, None),
            WebhookEventType::PaymentProcessing => (PaymentStatus::Processing, None),
            WebhookEventType::Unknown(kind) => {
                debug!(event_type = %kind, "Ignoring unhandled webhook event");
                return Ok(false);
            }
        };

        let Some(intent_id) = event.payment_intent_id.as_deref() else {
            warn!(event_id = %event.event_id, "Webhook event without payment intent");
            return Ok(false);
        };
        let Some(payment) = self.payments.find_by_intent(intent_id).await? else {
            warn!(intent_id, "Webhook for unknown payment intent");
            return Ok(false);
        };

        let updated = self.record_outcome(&payment, status, reason).await?;
        Ok(updated != payment)
    }

    /// Confirm an order as paid after checking the gateway, for clients
    /// that completed payment without a webhook reaching us.
    #[instrument(skip(self))]
    pub async fn confirm_success(&self, user_id: UserId, order_id: OrderId) -> ShopResult<Order> {
        let order = self.owned_order(user_id, order_id).await?;
        if order.payment_status == PaymentStatus::Succeeded {
            return Ok(order);
        }

        let payment = self
            .payments
            .find_by_order(order_id)
            .await?
            .ok_or_else(|| ShopError::PaymentNotFound {
                reference: format!("order {}", order_id),
            })?;
        let intent = self
            .gateway
            .retrieve_intent(&payment.payment_intent_id)
            .await?;
        if intent.status != IntentStatus::Succeeded {
            return Err(ShopError::InvalidOrderState {
                message: format!(
                    "payment {} has not succeeded (status {:?})",
                    intent.id, intent.status
                ),
            });
        }

        self.record_outcome(&payment, PaymentStatus::Succeeded, None)
            .await?;
        self.owned_order(user_id, order_id).await
    }

    pub async fn payment_for_order(&self, user_id: UserId, order_id: OrderId) -> ShopResult<Payment> {
        self.owned_order(user_id, order_id).await?;
        self.payments
            .find_by_order(order_id)
            .await?
            .ok_or_else(|| ShopError::PaymentNotFound {
                reference: format!("order {}", order_id),
            })
    }

    pub async fn history(&self, user_id: UserId) -> ShopResult<Vec<Payment>> {
        self.payments.list_by_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::order::NewOrder;
    use crate::product::{Currency, Price};
    use crate::repository::OrderRepository;
    use crate::stub::StubGateway;
    use std::sync::Arc;

    struct Fixture {
        store: Arc<MemoryStore>,
        gateway: Arc<StubGateway>,
        service: PaymentService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let gateway = Arc::new(StubGateway::new());
        let service = PaymentService::new(gateway.clone(), store.clone(), store.clone());
        Fixture {
            store,
            gateway,
            service,
        }
    }

    async fn order(store: &MemoryStore, user_id: UserId) -> Order {
        let amount = Price::from_cents(12399, Currency::USD);
        OrderRepository::create(
            store,
            NewOrder {
                user_id,
                items: Vec::new(),
                currency: Currency::USD,
                subtotal: Price::from_cents(10000, Currency::USD),
                shipping: Price::from_cents(599, Currency::USD),
                tax: Price::from_cents(1800, Currency::USD),
                total: amount,
            },
        )
        .await
        .unwrap()
    }

    fn event(kind: WebhookEventType, intent: &str) -> WebhookEvent {
        WebhookEvent::new("evt_1", kind, "stub").with_intent(intent)
    }

    #[tokio::test]
    async fn test_create_intent_records_payment() {
        let f = fixture();
        let order = order(&f.store, 1).await;

        let receipt = f.service.create_intent(&order).await.unwrap();
        assert_eq!(receipt.client_secret.as_deref(), Some("pi_stub_1_secret_stub"));
        assert_eq!(receipt.payment.amount.amount, 12399);
        assert_eq!(receipt.payment.status, PaymentStatus::Pending);
        assert_eq!(receipt.payment.provider, "stub");
        assert_eq!(receipt.order.payment_intent_id.as_deref(), Some("pi_stub_1"));
    }

    #[tokio::test]
    async fn test_succeeded_webhook_moves_order_to_processing() {
        let f = fixture();
        let order = order(&f.store, 1).await;
        f.service.create_intent(&order).await.unwrap();

        let changed = f
            .service
            .apply_event(&event(WebhookEventType::PaymentSucceeded, "pi_stub_1"))
            .await
            .unwrap();
        assert!(changed);

        let order = OrderRepository::get(f.store.as_ref(), order.id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Succeeded);
        assert_eq!(order.status, OrderStatus::Processing);

        // Replays and late failures do not regress the outcome.
        assert!(!f
            .service
            .apply_event(&event(WebhookEventType::PaymentSucceeded, "pi_stub_1"))
            .await
            .unwrap());
        assert!(!f
            .service
            .apply_event(&event(WebhookEventType::PaymentFailed, "pi_stub_1"))
            .await
            .unwrap());
        let payment = f.service.payment_for_order(1, order.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_failed_webhook_records_reason() {
        let f = fixture();
        let order = order(&f.store, 1).await;
        f.service.create_intent(&order).await.unwrap();

        f.service
            .apply_event(
                &event(WebhookEventType::PaymentFailed, "pi_stub_1").with_failure("card_declined"),
            )
            .await
            .unwrap();

        let payment = f.service.payment_for_order(1, order.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.failure_reason.as_deref(), Some("card_declined"));
        let order = OrderRepository::get(f.store.as_ref(), order.id).await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Failed);
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_events_are_ignored() {
        let f = fixture();
        assert!(!f
            .service
            .apply_event(&event(WebhookEventType::Unknown("charge.refunded".into()), "pi_x"))
            .await
            .unwrap());
        assert!(!f
            .service
            .apply_event(&event(WebhookEventType::PaymentSucceeded, "pi_unknown"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_handle_webhook_verifies_signature() {
        let f = fixture();
        let order = order(&f.store, 1).await;
        f.service.create_intent(&order).await.unwrap();

        let payload = serde_json::to_vec(&event(WebhookEventType::PaymentCanceled, "pi_stub_1")).unwrap();
        assert!(matches!(
            f.service.handle_webhook(&payload, "bad").await,
            Err(ShopError::WebhookVerificationFailed(_))
        ));

        let event = f
            .service
            .handle_webhook(&payload, f.gateway.webhook_secret())
            .await
            .unwrap();
        assert_eq!(event.event_type, WebhookEventType::PaymentCanceled);
        let payment = f.service.payment_for_order(1, order.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_retry_after_failed_intent() {
        let f = fixture();
        let order = order(&f.store, 1).await;

        f.gateway.set_fail_next(true);
        assert!(f.service.create_intent(&order).await.is_err());
        assert!(f.service.payment_for_order(1, order.id).await.is_err());

        let receipt = f.service.retry_intent(1, order.id).await.unwrap();
        assert_eq!(receipt.payment.payment_intent_id, "pi_stub_1");

        assert!(matches!(
            f.service.retry_intent(2, order.id).await,
            Err(ShopError::OrderNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_retry_rejected_for_paid_order() {
        let f = fixture();
        let order = order(&f.store, 1).await;
        f.service.create_intent(&order).await.unwrap();
        f.service.confirm(1, "pi_stub_1").await.unwrap();

        assert!(matches!(
            f.service.retry_intent(1, order.id).await,
            Err(ShopError::InvalidOrderState { .. })
        ));
    }

    #[tokio::test]
    async fn test_confirm_cancel_and_status() {
        let f = fixture();
        let first = order(&f.store, 1).await;
        let second = order(&f.store, 1).await;
        f.service.create_intent(&first).await.unwrap();
        f.service.create_intent(&second).await.unwrap();

        let paid = f.service.confirm(1, "pi_stub_1").await.unwrap();
        assert_eq!(paid.status, PaymentStatus::Succeeded);

        let cancelled = f.service.cancel(1, "pi_stub_2").await.unwrap();
        assert_eq!(cancelled.status, PaymentStatus::Cancelled);
        assert_eq!(
            f.service.status(1, "pi_stub_2").await.unwrap().status,
            PaymentStatus::Cancelled
        );

        // Intents are private to their owner.
        assert!(matches!(
            f.service.status(2, "pi_stub_1").await,
            Err(ShopError::PaymentNotFound { .. })
        ));

        let history = f.service.history(1).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].payment_intent_id, "pi_stub_2");
    }

    #[tokio::test]
    async fn test_confirm_success_checks_gateway() {
        let f = fixture();
        let order = order(&f.store, 1).await;
        f.service.create_intent(&order).await.unwrap();

        assert!(matches!(
            f.service.confirm_success(1, order.id).await,
            Err(ShopError::InvalidOrderState { .. })
        ));

        f.gateway
            .set_status("pi_stub_1", IntentStatus::Succeeded)
            .await
            .unwrap();
        let order = f.service.confirm_success(1, order.id).await.unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Succeeded);
        assert_eq!(order.status, OrderStatus::Processing);
    }
}
