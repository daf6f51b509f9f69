//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `orders` - Accepted order documents
//! - `ratelimits` - Fixed-window counters, one row per key and window
//! - `products` - Catalog documents
//!
//! Each table sits behind a store trait with two implementations: the
//! Postgres repositories in this module's children, and [`MemoryStore`] for
//! tests and local runs without a database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p door-renaissance-cli -- migrate
//! ```

pub mod memory;
pub mod orders;
pub mod products;
pub mod rate_limits;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use door_renaissance_core::Order;

use crate::models::{Product, ProductCursor};

pub use memory::MemoryStore;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use rate_limits::RateLimitRepository;

/// Errors that can occur in repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The store cannot take requests right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for accepted orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist a new order document.
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Check that the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Fixed-window counters keyed by bucket id.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Current count of a bucket; zero if it does not exist.
    async fn count(&self, bucket: &str) -> Result<i64, RepositoryError>;

    /// Atomically add one to a bucket, creating it if needed, and set its
    /// expiry.
    async fn increment(&self, bucket: &str, expire_at: DateTime<Utc>)
    -> Result<(), RepositoryError>;

    /// Delete buckets whose expiry is before `now`, returning how many.
    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Read access to the catalog.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Up to `limit` products, newest first, strictly after `after`.
    async fn list(
        &self,
        category: Option<&str>,
        after: Option<&ProductCursor>,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError>;
}

/// The set of stores the service runs against.
#[derive(Clone)]
pub struct Stores {
    pub orders: Arc<dyn OrderStore>,
    pub rate_limits: Arc<dyn RateLimitStore>,
    pub products: Arc<dyn ProductStore>,
}

impl Stores {
    /// Stores backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            orders: Arc::new(OrderRepository::new(pool.clone())),
            rate_limits: Arc::new(RateLimitRepository::new(pool.clone())),
            products: Arc::new(ProductRepository::new(pool.clone())),
        }
    }

    /// Stores backed by one shared in-memory store.
    #[must_use]
    pub fn memory(store: &MemoryStore) -> Self {
        Self {
            orders: Arc::new(store.clone()),
            rate_limits: Arc::new(store.clone()),
            products: Arc::new(store.clone()),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
