//! Fixed-window rate limiting over a persistent counter store.
//!
//! Each `(key, window)` pair gets its own bucket named
//! `{key}:{window_index}`, where the window index is the current time in
//! milliseconds divided by the window length. A request is admitted while
//! the bucket's count is below the limit; admission increments it. Denied
//! requests do not count.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::config::RateLimitRule;
use crate::db::{RateLimitStore, RepositoryError};

/// Limiter shared by every request handler.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    /// Try to admit one request for `key` under `rule`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the counter store fails.
    pub async fn admit(&self, key: &str, rule: RateLimitRule) -> Result<bool, RepositoryError> {
        self.admit_at(key, rule, Utc::now()).await
    }

    /// [`RateLimiter::admit`] with an explicit clock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the counter store fails.
    pub async fn admit_at(
        &self,
        key: &str,
        rule: RateLimitRule,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let window = Window::containing(now, rule);
        let bucket = window.bucket_id(key);

        let count = self.store.count(&bucket).await?;
        if count >= i64::from(rule.limit) {
            debug!(bucket = %bucket, count, limit = rule.limit, "Rate limit reached");
            return Ok(false);
        }

        self.store.increment(&bucket, window.expire_at()).await?;
        Ok(true)
    }
}

/// One fixed window of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    index: i64,
    length_ms: i64,
}

impl Window {
    fn containing(now: DateTime<Utc>, rule: RateLimitRule) -> Self {
        let length_ms = i64::try_from(rule.window.as_millis())
            .unwrap_or(i64::MAX)
            .max(1);
        Self {
            index: now.timestamp_millis().div_euclid(length_ms),
            length_ms,
        }
    }

    fn bucket_id(self, key: &str) -> String {
        format!("{key}:{}", self.index)
    }

    /// Advisory expiry for cleanup: two window lengths past the window's end.
    fn expire_at(self) -> DateTime<Utc> {
        let end_ms = self.index.saturating_add(1).saturating_mul(self.length_ms);
        let expire_ms = end_ms.saturating_add(self.length_ms.saturating_mul(2));
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::milliseconds(expire_ms)
    }
}
