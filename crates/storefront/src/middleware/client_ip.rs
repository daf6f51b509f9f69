//! Requester address extraction.
//!
//! The address is taken from the first hop of `X-Forwarded-For` when a proxy
//! set one, otherwise from the TCP peer. It is used as a rate-limit key and
//! stored on orders verbatim, so it is kept as text and not parsed.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

/// Address used when neither a forwarded header nor a peer is available.
pub const UNKNOWN_CLIENT_IP: &str = "0.0.0.0";

/// The requester's address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn from_parts(parts: &Parts) -> Self {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if let Some(ip) = forwarded {
            return Self(ip.to_string());
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map_or_else(
                || Self(UNKNOWN_CLIENT_IP.to_string()),
                |ConnectInfo(addr)| Self(addr.ip().to_string()),
            )
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
