//! Profile endpoints for the calling user.

use super::{shop_error_to_response, ApiError};
use crate::extract::CurrentUser;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use shop_core::{User, UserProfile};

pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<User>, ApiError> {
    let user = state
        .users
        .profile(user_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(user))
}

/// 201 when the profile is created, 200 when it is updated
pub async fn put_user(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(profile): Json<UserProfile>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let (user, created) = state
        .users
        .save_profile(user_id, profile)
        .await
        .map_err(shop_error_to_response)?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(user)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<StatusCode, ApiError> {
    state
        .users
        .delete(user_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(StatusCode::NO_CONTENT)
}
