//! Gateway webhooks. The body is taken raw since signatures cover the
//! exact bytes sent.

use super::{shop_error_to_response, ApiError, ErrorResponse};
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub event_id: String,
}

#[instrument(skip(state, headers, body))]
pub async fn payment_webhook(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let gateway = state.payments.gateway();
    if provider != gateway.provider_name() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(
                format!("No webhook endpoint for provider: {}", provider),
                404,
            )),
        ));
    }

    let header_name = gateway.signature_header();
    let signature = headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(
                    format!("Missing {} header", header_name),
                    400,
                )),
            )
        })?;

    let event = state
        .payments
        .handle_webhook(&body, signature)
        .await
        .map_err(|e| {
            error!("Webhook rejected: {}", e);
            shop_error_to_response(e)
        })?;

    info!(
        "Received webhook: type={}, id={}",
        event.event_type.as_str(),
        event.event_id
    );

    Ok(Json(WebhookAck {
        received: true,
        event_id: event.event_id,
    }))
}
