//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (unique ID per request)
//! 4. CORS (public API routes only)
//!
//! [`ClientIp`] is an extractor rather than a layer.

pub mod client_ip;
pub mod cors;
pub mod request_id;

pub use client_ip::ClientIp;
pub use cors::cors_middleware;
pub use request_id::request_id_middleware;
