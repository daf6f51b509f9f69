//! Order submission endpoint.

use axum::{Json, body::Bytes, extract::State};
use serde::Serialize;
use tracing::instrument;

use door_renaissance_core::OrderSubmission;

use super::parse_json_body;
use crate::error::OrderError;
use crate::middleware::ClientIp;
use crate::state::AppState;

/// Success acknowledgement: `{"ok": true}`.
#[derive(Debug, Serialize)]
pub struct OrderAccepted {
    pub ok: bool,
}

/// Submit an order.
///
/// POST /api/orders
///
/// Accepts `{name, phone, email?, items, total, recaptchaToken?, hp?}`. On
/// success the order is relayed to the notification endpoint; the relay's
/// outcome is logged and never changes the response.
#[instrument(skip(state, client_ip, body), fields(client_ip = %client_ip.as_str()))]
pub async fn create(
    State(state): State<AppState>,
    client_ip: ClientIp,
    body: Bytes,
) -> Result<Json<OrderAccepted>, OrderError> {
    let submission = OrderSubmission::from_json(&parse_json_body(&body));
    let order = state.intake().submit(&submission, client_ip.as_str()).await?;

    let outcome = state.relay().notify(&order).await;
    tracing::debug!(order_id = %order.id, ?outcome, "Relay finished");

    Ok(Json(OrderAccepted { ok: true }))
}
