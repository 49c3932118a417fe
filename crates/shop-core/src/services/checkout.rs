//! # Checkout Orchestrator
//!
//! ```text
//! cart snapshot ──▶ compute_summary ──▶ create order (pending)
//!                                              │
//!                                              ▼
//!               remove ordered items ◀── create payment intent
//! ```
//!
//! Each step is a separate call with no surrounding transaction. Steps
//! that already succeeded are never rolled back: if the intent cannot be
//! created the order stays, marked `payment_status = failed`, and is
//! returned with the error so the client can retry payment for it. The
//! ordered rows are only taken out of the cart once both the order and
//! the intent exist. Items added after the cart was priced stay in the
//! cart. A failure to update the cart is logged and does not fail the
//! checkout.

use crate::cart::CartSnapshot;
use crate::error::{ShopError, ShopResult};
use crate::order::{NewOrder, Order, OrderId, OrderUpdate, PaymentStatus};
use crate::pricing::compute_summary;
use crate::repository::SharedOrderRepository;
use crate::services::cart::CartService;
use crate::services::payments::{IntentReceipt, PaymentService};
use crate::UserId;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

/// Successful checkout: the order, its payment record and client secret
pub type CheckoutReceipt = IntentReceipt;

/// Checkout error, with the order if one was already persisted
#[derive(Debug, Error)]
#[error("{error}")]
pub struct CheckoutFailure {
    /// Present when the order was created before the failure
    pub order: Option<Order>,
    #[source]
    pub error: ShopError,
}

impl CheckoutFailure {
    fn before_order(error: ShopError) -> Self {
        Self { order: None, error }
    }
}

pub struct CheckoutOrchestrator {
    carts: Arc<CartService>,
    orders: SharedOrderRepository,
    payments: Arc<PaymentService>,
}

impl CheckoutOrchestrator {
    pub fn new(
        carts: Arc<CartService>,
        orders: SharedOrderRepository,
        payments: Arc<PaymentService>,
    ) -> Self {
        Self {
            carts,
            orders,
            payments,
        }
    }

    /// Price the cart and persist it as a pending order.
    async fn create_order(&self, user_id: UserId) -> ShopResult<(Order, CartSnapshot)> {
        let (_, snapshot) = self.carts.snapshot(user_id).await?;
        if snapshot.is_empty() {
            return Err(ShopError::EmptyCart);
        }

        let summary = compute_summary(&snapshot, self.carts.policy());
        let order = self
            .orders
            .create(NewOrder::from_summary(&snapshot, &summary))
            .await?;
        info!(
            order_id = order.id,
            items = order.items.len(),
            total = %order.total.display(),
            "Order created"
        );
        Ok((order, snapshot))
    }

    async fn remove_ordered(&self, user_id: UserId, order: &Order, snapshot: &CartSnapshot) {
        if let Err(e) = self.carts.remove_ordered(user_id, snapshot).await {
            warn!(order_id = order.id, error = %e, "Failed to remove ordered items from cart");
        }
    }

    /// Order from cart without requesting payment.
    #[instrument(skip(self))]
    pub async fn place_order(&self, user_id: UserId) -> ShopResult<Order> {
        let (order, snapshot) = self.create_order(user_id).await?;
        self.remove_ordered(user_id, &order, &snapshot).await;
        Ok(order)
    }

    /// Full checkout: order plus payment intent.
    #[instrument(skip(self))]
    pub async fn checkout(&self, user_id: UserId) -> Result<CheckoutReceipt, CheckoutFailure> {
        let (order, snapshot) = self
            .create_order(user_id)
            .await
            .map_err(CheckoutFailure::before_order)?;

        let receipt = match self.payments.create_intent(&order).await {
            Ok(receipt) => receipt,
            Err(e) => {
                error!(order_id = order.id, error = %e, "Order created but payment initialization failed");
                let order = self.mark_payment_failed(order).await;
                return Err(CheckoutFailure {
                    order: Some(order),
                    error: e,
                });
            }
        };

        self.remove_ordered(user_id, &receipt.order, &snapshot).await;
        Ok(receipt)
    }

    /// The caller's orders, newest first.
    pub async fn orders(&self, user_id: UserId) -> ShopResult<Vec<Order>> {
        self.orders.list_by_user(user_id).await
    }

    /// An order owned by the caller; anyone else's is reported as missing.
    pub async fn order(&self, user_id: UserId, order_id: OrderId) -> ShopResult<Order> {
        self.orders
            .get(order_id)
            .await?
            .filter(|o| o.is_owned_by(user_id))
            .ok_or(ShopError::OrderNotFound { order_id })
    }

    /// Best effort: the original order is returned if the update fails.
    async fn mark_payment_failed(&self, order: Order) -> Order {
        match self
            .orders
            .update(order.id, OrderUpdate::new().payment_status(PaymentStatus::Failed))
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                warn!(order_id = order.id, error = %e, "Failed to mark order payment as failed");
                order
            }
        }
    }
}
