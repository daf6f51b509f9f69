//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `RECAPTCHA_SECRET` - reCAPTCHA v3 server secret; verification is skipped when unset
//! - `RECAPTCHA_VERIFY_URL` - Verification endpoint (default: Google's `siteverify`)
//! - `TELEGRAM_BOT_TOKEN` / `TELEGRAM_CHAT_ID` - Destination for order notifications
//! - `TELEGRAM_API_BASE` - Bot API base URL (default: <https://api.telegram.org>)
//! - `ORDER_NOTIFY_URL` - Endpoint the order relay posts to; relay is skipped when unset
//! - `RATE_LIMIT_IP` / `RATE_LIMIT_IP_WINDOW_SECS` - Orders per client address (default: 10 / 60)
//! - `RATE_LIMIT_PHONE` / `RATE_LIMIT_PHONE_WINDOW_SECS` - Orders per phone (default: 3 / 3600)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0-1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0-1.0 (default: 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Google's reCAPTCHA verification endpoint.
pub const DEFAULT_RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Telegram Bot API base URL.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bot screening
    pub recaptcha: RecaptchaConfig,
    /// Telegram destination; `None` disables the notify endpoint
    pub telegram: Option<TelegramConfig>,
    /// Where accepted orders are relayed; `None` skips the relay
    pub notify_url: Option<Url>,
    /// Order intake throttling
    pub rate_limits: OrderRateLimits,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

/// reCAPTCHA verification settings.
#[derive(Clone)]
pub struct RecaptchaConfig {
    /// Server secret; when absent every submission passes the screen.
    pub secret: Option<SecretString>,
    pub verify_url: Url,
}

impl std::fmt::Debug for RecaptchaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecaptchaConfig")
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("verify_url", &self.verify_url.as_str())
            .finish()
    }
}

/// Telegram Bot API settings.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub chat_id: String,
    pub api_base: Url,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

/// A fixed-window limit: at most `limit` admissions per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitRule {
    #[must_use]
    pub const fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            limit,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// The two throttles applied to order submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRateLimits {
    pub per_ip: RateLimitRule,
    pub per_phone: RateLimitRule,
}

impl Default for OrderRateLimits {
    fn default() -> Self {
        Self {
            per_ip: RateLimitRule::new(10, 60),
            per_phone: RateLimitRule::new(3, 3600),
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_parsed_or_default("STOREFRONT_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        let port = get_parsed_or_default("STOREFRONT_PORT", 3000_u16)?;

        Ok(Self {
            database_url,
            host,
            port,
            recaptcha: RecaptchaConfig::from_env()?,
            telegram: TelegramConfig::from_env()?,
            notify_url: get_optional_url("ORDER_NOTIFY_URL")?,
            rate_limits: OrderRateLimits::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_sample_rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_sample_rate("SENTRY_TRACES_SAMPLE_RATE", 0.1)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl RecaptchaConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = match get_optional_env("RECAPTCHA_SECRET") {
            Some(value) => {
                validate_secret_strength(&value, "RECAPTCHA_SECRET")?;
                Some(SecretString::from(value))
            }
            None => None,
        };
        let verify_url = get_url_or_default("RECAPTCHA_VERIFY_URL", DEFAULT_RECAPTCHA_VERIFY_URL)?;
        Ok(Self { secret, verify_url })
    }

    /// Verification disabled; used by tests and local development.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            secret: None,
            verify_url: Url::parse(DEFAULT_RECAPTCHA_VERIFY_URL).expect("Invalid URL"),
        }
    }
}

impl TelegramConfig {
    /// Both the token and the chat id must be set, or neither.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let token = get_optional_env("TELEGRAM_BOT_TOKEN");
        let chat_id = get_optional_env("TELEGRAM_CHAT_ID");

        match (token, chat_id) {
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar("TELEGRAM_CHAT_ID".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".to_string())),
            (Some(token), Some(chat_id)) => {
                validate_secret_strength(&token, "TELEGRAM_BOT_TOKEN")?;
                Ok(Some(Self {
                    bot_token: SecretString::from(token),
                    chat_id,
                    api_base: get_url_or_default("TELEGRAM_API_BASE", DEFAULT_TELEGRAM_API_BASE)?,
                }))
            }
        }
    }
}

impl OrderRateLimits {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            per_ip: get_rule("RATE_LIMIT_IP", defaults.per_ip)?,
            per_phone: get_rule("RATE_LIMIT_PHONE", defaults.per_phone)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_parsed_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn get_optional_url(key: &str) -> Result<Option<Url>, ConfigError> {
    get_optional_env(key)
        .map(|raw| parse_value::<Url>(key, &raw))
        .transpose()
}

fn get_url_or_default(key: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = get_optional_env(key).unwrap_or_else(|| default.to_string());
    parse_value(key, &raw)
}

fn get_sample_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let rate = get_parsed_or_default(key, default)?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
}

/// Read `{prefix}` (limit) and `{prefix}_WINDOW_SECS`.
fn get_rule(prefix: &str, default: RateLimitRule) -> Result<RateLimitRule, ConfigError> {
    let window_key = format!("{prefix}_WINDOW_SECS");
    let limit = get_parsed_or_default(prefix, default.limit)?;
    let window_secs = get_parsed_or_default(&window_key, default.window.as_secs())?;
    if window_secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            window_key,
            "window must be at least one second".to_string(),
        ));
    }
    Ok(RateLimitRule::new(limit, window_secs))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
