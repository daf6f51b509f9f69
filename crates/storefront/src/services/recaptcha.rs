//! reCAPTCHA v3 verification.
//!
//! Screening is soft-disabled: with no secret configured, or no token sent,
//! every submission passes with a score of zero.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::RecaptchaConfig;

/// Action label the order form requests its token for.
pub const ORDER_ACTION: &str = "order";

/// Lowest score accepted as human.
pub const MIN_SCORE: f64 = 0.5;

/// Errors talking to the verification service.
#[derive(Debug, Error)]
pub enum RecaptchaError {
    #[error("verification request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Result of screening one token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub ok: bool,
    pub score: f64,
}

impl Verdict {
    /// Pass without asking anyone.
    pub const SKIPPED: Self = Self {
        ok: true,
        score: 0.0,
    };
}

/// Body of a `siteverify` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteVerifyResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

impl SiteVerifyResponse {
    /// Judge the response against the action the token should be for.
    ///
    /// An empty or missing action label is not checked. A missing score
    /// counts as zero.
    #[must_use]
    pub fn verdict(&self, expected_action: &str) -> Verdict {
        let score = self.score.unwrap_or(0.0);
        let action_ok = self
            .action
            .as_deref()
            .filter(|a| !a.is_empty())
            .is_none_or(|a| a == expected_action);

        Verdict {
            ok: self.success && action_ok && score >= MIN_SCORE,
            score,
        }
    }
}

/// Client for the verification endpoint.
#[derive(Clone)]
pub struct RecaptchaClient {
    client: Client,
    secret: Option<SecretString>,
    verify_url: Url,
}

impl std::fmt::Debug for RecaptchaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecaptchaClient")
            .field("enabled", &self.secret.is_some())
            .field("verify_url", &self.verify_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RecaptchaClient {
    #[must_use]
    pub fn new(config: &RecaptchaConfig) -> Self {
        Self {
            client: Client::new(),
            secret: config.secret.clone(),
            verify_url: config.verify_url.clone(),
        }
    }

    /// Screen a client token.
    ///
    /// # Errors
    ///
    /// Returns `RecaptchaError` if the service cannot be reached or answers
    /// with something other than a verification result.
    #[instrument(skip(self, token), fields(has_token = token.is_some()))]
    pub async fn verify(
        &self,
        token: Option<&str>,
        expected_action: &str,
    ) -> Result<Verdict, RecaptchaError> {
        let (Some(token), Some(secret)) = (token, self.secret.as_ref()) else {
            return Ok(Verdict::SKIPPED);
        };

        let response: SiteVerifyResponse = self
            .client
            .post(self.verify_url.clone())
            .form(&[("secret", secret.expose_secret()), ("response", token)])
            .send()
            .await?
            .json()
            .await?;

        let verdict = response.verdict(expected_action);
        debug!(
            ok = verdict.ok,
            score = verdict.score,
            action = ?response.action,
            error_codes = ?response.error_codes,
            "reCAPTCHA verdict"
        );
        Ok(verdict)
    }
}
