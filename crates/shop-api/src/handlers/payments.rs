//! Payment endpoints: intent lifecycle and payment records.

use super::{shop_error_to_response, ApiError};
use crate::extract::CurrentUser;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shop_core::{IntentReceipt, Order, OrderId, Payment};
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub order_id: OrderId,
}

/// New intent for an order whose payment never started or failed
#[instrument(skip(state, request), fields(order_id = request.order_id))]
pub async fn create_intent(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<CreateIntentRequest>,
) -> Result<(StatusCode, Json<IntentReceipt>), ApiError> {
    let receipt = state
        .payments
        .retry_intent(user_id, request.order_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

pub async fn intent_status(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(intent_id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state
        .payments
        .status(user_id, &intent_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(payment))
}

pub async fn confirm_intent(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(intent_id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state
        .payments
        .confirm(user_id, &intent_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(payment))
}

pub async fn cancel_intent(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(intent_id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state
        .payments
        .cancel(user_id, &intent_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(payment))
}

pub async fn payment_for_order(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Payment>, ApiError> {
    let payment = state
        .payments
        .payment_for_order(user_id, order_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(payment))
}

/// Mark an order paid after checking the gateway directly
pub async fn confirm_order_payment(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .payments
        .confirm_success(user_id, order_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(order))
}

pub async fn payment_history(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let payments = state
        .payments
        .history(user_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(payments))
}
