//! Request extractors.

use crate::handlers::ErrorResponse;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use shop_core::UserId;

/// Header carrying the authenticated user id, set by the upstream
/// identity layer
pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller, taken from `X-User-Id`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let unauthorized = |message: &str| {
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(message, 401)),
            )
        };

        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| unauthorized("Missing X-User-Id header"))?;

        raw.to_str()
            .ok()
            .and_then(|v| v.trim().parse::<UserId>().ok())
            .map(CurrentUser)
            .ok_or_else(|| unauthorized("Invalid X-User-Id header"))
    }
}
