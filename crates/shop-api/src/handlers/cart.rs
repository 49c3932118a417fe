//! Cart endpoints. Every read is priced by the pricing engine.

use super::{shop_error_to_response, ApiError};
use crate::extract::CurrentUser;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shop_core::{CartView, ProductId};
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Signed so that zero and negative values reach validation
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

pub async fn view_cart(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .carts
        .view(user_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(view))
}

#[instrument(skip(state, request), fields(product_id = request.product_id))]
pub async fn add_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartView>), ApiError> {
    let view = state
        .carts
        .add_item(user_id, request.product_id, request.quantity)
        .await
        .map_err(shop_error_to_response)?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<u64>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .carts
        .update_quantity(user_id, item_id, request.quantity)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(view))
}

pub async fn remove_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(item_id): Path<u64>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .carts
        .remove_item(user_id, item_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(view))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<StatusCode, ApiError> {
    state
        .carts
        .clear(user_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}
