//! Business logic services for storefront.
//!
//! # Services
//!
//! - `intake` - Order intake pipeline (validation, throttling, screening, persistence)
//! - `rate_limit` - Fixed-window limiter over the counter store
//! - `recaptcha` - reCAPTCHA v3 token verification
//! - `relay` - Best-effort relay of accepted orders to the notify endpoint
//! - `telegram` - Telegram Bot API client and order summaries
//! - `catalog` - Cached product listing

pub mod catalog;
pub mod intake;
pub mod rate_limit;
pub mod recaptcha;
pub mod relay;
pub mod telegram;

pub use catalog::Catalog;
pub use intake::OrderIntake;
pub use rate_limit::RateLimiter;
pub use recaptcha::{RecaptchaClient, RecaptchaError, Verdict};
pub use relay::{NotificationRelay, RelayOutcome};
pub use telegram::{OrderSummary, TelegramClient, TelegramError};
