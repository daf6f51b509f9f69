//! Telegram notification endpoint.

use axum::{Json, body::Bytes, extract::State};
use serde::Serialize;
use tracing::instrument;

use super::parse_json_body;
use crate::error::{AppError, Result};
use crate::services::OrderSummary;
use crate::state::AppState;

/// `{"success": true}`
#[derive(Debug, Serialize)]
pub struct NotifySent {
    pub success: bool,
}

/// Forward an order summary to the configured Telegram chat.
///
/// POST /api/notify
///
/// Accepts `{contact, order, total}` where `order` is an array of
/// `{name, quantity, price}`.
#[instrument(skip(state, body))]
pub async fn send(State(state): State<AppState>, body: Bytes) -> Result<Json<NotifySent>> {
    let summary = OrderSummary::from_request(&parse_json_body(&body)).ok_or_else(|| {
        AppError::BadRequest("contact and an order array are required".to_string())
    })?;
    let telegram = state
        .telegram()
        .ok_or(AppError::NotConfigured("telegram"))?;

    telegram.send_message(&summary.render()).await?;
    tracing::info!(lines = summary.lines.len(), "Order summary sent to Telegram");

    Ok(Json(NotifySent { success: true }))
}
