//! Catalog repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use door_renaissance_core::ProductId;

use super::{ProductStore, RepositoryError};
use crate::models::{Product, ProductCursor};

/// `PostgreSQL`-backed [`ProductStore`].
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    category: Option<String>,
    data: Json<Map<String, Value>>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            category: row.category,
            created_at: row.created_at,
            attributes: row.data.0,
        }
    }
}

#[async_trait]
impl ProductStore for ProductRepository {
    async fn list(
        &self,
        category: Option<&str>,
        after: Option<&ProductCursor>,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(
            r"
            SELECT id, category, data, created_at
            FROM storefront.products
            WHERE ($1::text IS NULL OR category = $1)
              AND ($2::timestamptz IS NULL OR (created_at, id) < ($2, $3))
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            ",
        )
        .bind(category)
        .bind(after.map(|c| c.created_at))
        .bind(after.map(|c| c.id.as_uuid()))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }
}
