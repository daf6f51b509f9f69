//! Rate-limit counter repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{RateLimitStore, RepositoryError};

/// `PostgreSQL`-backed [`RateLimitStore`].
///
/// The increment is a single upsert, so concurrent requests never lose a
/// count. The read-then-increment sequence in the limiter is not atomic,
/// which can admit a few requests past the limit under a burst.
#[derive(Clone)]
pub struct RateLimitRepository {
    pool: PgPool,
}

impl RateLimitRepository {
    /// Create a new rate-limit repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RateLimitStore for RateLimitRepository {
    async fn count(&self, bucket: &str) -> Result<i64, RepositoryError> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT count FROM storefront.ratelimits WHERE id = $1")
                .bind(bucket)
                .fetch_optional(&self.pool)
                .await?;

        Ok(count.unwrap_or(0))
    }

    async fn increment(
        &self,
        bucket: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.ratelimits (id, count, expire_at)
            VALUES ($1, 1, $2)
            ON CONFLICT (id) DO UPDATE
            SET count = storefront.ratelimits.count + 1,
                expire_at = EXCLUDED.expire_at
            ",
        )
        .bind(bucket)
        .bind(expire_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.ratelimits WHERE expire_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
