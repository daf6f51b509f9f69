//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (order store reachable)
//!
//! # Public API (CORS-enabled)
//! POST    /api/orders          - Submit an order
//! OPTIONS /api/orders          - CORS preflight (204)
//! POST    /api/notify          - Send an order summary to Telegram
//! OPTIONS /api/notify          - CORS preflight (204)
//!
//! # Catalog
//! GET  /api/products           - Product listing (?category=&cursor=)
//! ```
//!
//! Other methods on the POST routes get `405 Method Not Allowed` with an
//! empty body.

pub mod health;
pub mod notify;
pub mod orders;
pub mod products;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use serde_json::Value;

use crate::middleware::cors_middleware;
use crate::state::AppState;

/// Create the public API router (mounted at `/api`).
pub fn api_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/orders", post(orders::create))
        .route("/notify", post(notify::send))
        .layer(middleware::from_fn(cors_middleware));

    public.route("/products", get(products::index))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes())
}

/// Parse a request body as JSON. Anything unparseable is treated as an
/// empty body.
pub(crate) fn parse_json_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes).unwrap_or(Value::Null)
}
