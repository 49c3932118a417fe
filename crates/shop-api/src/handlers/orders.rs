//! Order endpoints, including checkout.

use super::{error_status, shop_error_to_response, ApiError, ErrorResponse};
use crate::extract::CurrentUser;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shop_core::{CheckoutFailure, CheckoutReceipt, Order, OrderId};
use tracing::{error, info, instrument};

pub async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = state
        .checkout
        .orders(user_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .checkout
        .order(user_id, order_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(order))
}

/// Turn the cart into an order without requesting payment
pub async fn place_order(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state
        .checkout
        .place_order(user_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Order plus payment intent. When the intent fails after the order was
/// stored, the order is returned in the error body so the client can
/// retry payment for it.
#[instrument(skip(state))]
pub async fn checkout(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<(StatusCode, Json<CheckoutReceipt>), ApiError> {
    match state.checkout.checkout(user_id).await {
        Ok(receipt) => {
            info!(
                order_id = receipt.order.id,
                intent_id = %receipt.payment.payment_intent_id,
                "Checkout complete"
            );
            Ok((StatusCode::CREATED, Json(receipt)))
        }
        Err(CheckoutFailure {
            order: Some(order),
            error: err,
        }) => {
            let status = error_status(&err);
            error!(order_id = order.id, "Checkout failed after order creation: {}", err);
            Err((
                status,
                Json(ErrorResponse::new(err.to_string(), status.as_u16()).with_order(order)),
            ))
        }
        Err(CheckoutFailure { order: None, error }) => Err(shop_error_to_response(error)),
    }
}
