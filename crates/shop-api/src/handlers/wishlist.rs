//! Wishlist endpoints.

use super::{shop_error_to_response, ApiError, ErrorResponse};
use crate::extract::CurrentUser;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use shop_core::{ProductId, WishlistItem};

#[derive(Debug, Deserialize)]
pub struct AddToWishlistRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Serialize)]
pub struct WishlistStatus {
    pub product_id: ProductId,
    pub in_wishlist: bool,
}

pub async fn list_wishlist(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<WishlistItem>>, ApiError> {
    let items = state
        .wishlist
        .list(user_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(items))
}

/// 201 when newly added, 200 when it was already there
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<AddToWishlistRequest>,
) -> Result<(StatusCode, Json<WishlistStatus>), ApiError> {
    let added = state
        .wishlist
        .add(user_id, request.product_id)
        .await
        .map_err(shop_error_to_response)?;
    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(WishlistStatus {
            product_id: request.product_id,
            in_wishlist: true,
        }),
    ))
}

pub async fn wishlist_contains(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<ProductId>,
) -> Result<Json<WishlistStatus>, ApiError> {
    let in_wishlist = state
        .wishlist
        .contains(user_id, product_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(WishlistStatus {
        product_id,
        in_wishlist,
    }))
}

pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    let removed = state
        .wishlist
        .remove(user_id, product_id)
        .await
        .map_err(shop_error_to_response)?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                format!("Product {} is not in the wishlist", product_id),
                404,
            )),
        ))
    }
}
