//! Rate-limit counter maintenance.
//!
//! Counter rows carry an advisory `expire_at`; nothing on the request path
//! deletes them. Run `dr-cli ratelimits prune` periodically (cron, systemd
//! timer) to keep the table small.

use chrono::Utc;
use door_renaissance_storefront::db::{RateLimitRepository, RateLimitStore, create_pool};

use super::{CommandError, database_url};

/// Delete every counter whose `expire_at` is in the past.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub async fn prune() -> Result<(), CommandError> {
    let database_url = database_url()?;
    let pool = create_pool(&database_url).await?;

    let deleted = RateLimitRepository::new(pool)
        .prune_expired(Utc::now())
        .await?;

    tracing::info!(deleted, "Pruned expired rate-limit counters");
    Ok(())
}
