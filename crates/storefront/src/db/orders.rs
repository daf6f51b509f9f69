//! Order repository.
//!
//! Orders are written once by the intake pipeline. Queries are checked at
//! runtime so the crate builds without a live database.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;

use door_renaissance_core::Order;

use super::{OrderStore, RepositoryError};

/// `PostgreSQL`-backed [`OrderStore`].
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storefront.orders (id, contact, items, total, status, created_at, ip)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(order.id)
        .bind(Json(&order.contact))
        .bind(Json(&order.items))
        .bind(order.total)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(&order.ip)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
