//! Unified error handling with Sentry integration.
//!
//! Two response shapes exist:
//! - [`OrderError`] answers the order endpoint with `{ok: false, code}`.
//! - [`AppError`] answers everything else with `{error}`.
//!
//! Server-side failures are captured to Sentry before responding; client
//! and policy rejections are not.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use door_renaissance_core::{RejectionCode, ValidationError};

use crate::db::RepositoryError;
use crate::services::{RecaptchaError, TelegramError};

/// Why an order submission was not accepted.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A field failed validation, or the honeypot was filled in.
    #[error("invalid order: {0}")]
    Invalid(#[from] ValidationError),

    /// Too many orders from this address or phone number.
    #[error("rate limited")]
    RateLimited,

    /// The bot screen rejected the token.
    #[error("reCAPTCHA rejected submission (score {score})")]
    Recaptcha { score: f64 },

    /// A store operation failed.
    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),

    /// The verification service could not be consulted.
    #[error("verification error: {0}")]
    Verification(#[from] RecaptchaError),
}

impl OrderError {
    /// Code reported to the client. Upstream failures all collapse to
    /// `server_error`.
    #[must_use]
    pub const fn code(&self) -> RejectionCode {
        match self {
            Self::Invalid(e) => e.code(),
            Self::RateLimited => RejectionCode::RateLimited,
            Self::Recaptcha { .. } => RejectionCode::Recaptcha,
            Self::Repository(_) | Self::Verification(_) => RejectionCode::ServerError,
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Recaptcha { .. } => StatusCode::FORBIDDEN,
            Self::Repository(_) | Self::Verification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let code = self.code();
        if code == RejectionCode::ServerError {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Order intake failed"
            );
        } else {
            tracing::info!(code = %code, reason = %self, "Order rejected");
        }

        (self.status(), Json(json!({ "ok": false, "code": code }))).into_response()
    }
}

/// Application-level error type for the remaining endpoints.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Telegram delivery failed.
    #[error("{0}")]
    Telegram(#[from] TelegramError),

    /// A required integration is not configured.
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),

    /// Bad request from client.
    #[error("Bad request")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Telegram(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) | Self::Telegram(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::BadRequest(detail) => {
                tracing::debug!(%detail, "Bad request");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for a business event.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of events
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
