//! In-memory implementation of every store.
//!
//! Backs tests and local runs without `PostgreSQL`. All clones share state.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use door_renaissance_core::Order;

use super::{OrderStore, ProductStore, RateLimitStore, RepositoryError};
use crate::models::{Product, ProductCursor};

/// Shared in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
    unavailable: Arc<AtomicBool>,
}

#[derive(Default)]
struct MemoryStoreInner {
    orders: Vec<Order>,
    buckets: HashMap<String, Bucket>,
    products: Vec<Product>,
}

/// A rate-limit counter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub count: i64,
    pub expire_at: DateTime<Utc>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with [`RepositoryError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Orders persisted so far, oldest first.
    pub async fn orders(&self) -> Vec<Order> {
        self.inner.lock().await.orders.clone()
    }

    /// Snapshot of one rate-limit bucket.
    pub async fn bucket(&self, id: &str) -> Option<Bucket> {
        self.inner.lock().await.buckets.get(id).copied()
    }

    /// Number of rate-limit buckets created so far.
    pub async fn bucket_count(&self) -> usize {
        self.inner.lock().await.buckets.len()
    }

    /// Add a product to the catalog.
    pub async fn add_product(&self, product: Product) {
        self.inner.lock().await.products.push(product);
    }

    fn check_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "memory store switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        self.check_available()?;
        self.inner.lock().await.orders.push(order.clone());
        Ok(())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.check_available()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn count(&self, bucket: &str) -> Result<i64, RepositoryError> {
        self.check_available()?;
        Ok(self
            .inner
            .lock()
            .await
            .buckets
            .get(bucket)
            .map_or(0, |b| b.count))
    }

    async fn increment(
        &self,
        bucket: &str,
        expire_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        let entry = inner.buckets.entry(bucket.to_string()).or_insert(Bucket {
            count: 0,
            expire_at,
        });
        entry.count += 1;
        entry.expire_at = expire_at;
        Ok(())
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        self.check_available()?;
        let mut inner = self.inner.lock().await;
        let before = inner.buckets.len();
        inner.buckets.retain(|_, b| b.expire_at >= now);
        Ok(u64::try_from(before - inner.buckets.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list(
        &self,
        category: Option<&str>,
        after: Option<&ProductCursor>,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.check_available()?;
        let inner = self.inner.lock().await;

        let mut products: Vec<&Product> = inner
            .products
            .iter()
            .filter(|p| category.is_none_or(|c| p.category.as_deref() == Some(c)))
            .collect();
        products.sort_by(|a, b| position(b).cmp(&position(a)));

        Ok(products
            .into_iter()
            .filter(|p| {
                after.is_none_or(|cursor| position(p) < (cursor.created_at, cursor.id.as_uuid()))
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

fn position(product: &Product) -> (DateTime<Utc>, uuid::Uuid) {
    (product.created_at, product.id.as_uuid())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::Map;

    use door_renaissance_core::ProductId;

    use super::*;

    fn product(category: &str, minutes: i64) -> Product {
        Product {
            id: ProductId::generate(),
            category: Some(category.to_string()),
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
            attributes: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_increment_creates_then_counts() {
        let store = MemoryStore::new();
        let expire = Utc::now();

        assert_eq!(store.count("ip:1.2.3.4:7").await.unwrap(), 0);
        store.increment("ip:1.2.3.4:7", expire).await.unwrap();
        store.increment("ip:1.2.3.4:7", expire).await.unwrap();
        assert_eq!(store.count("ip:1.2.3.4:7").await.unwrap(), 2);
        assert_eq!(store.bucket("ip:1.2.3.4:7").await.unwrap().expire_at, expire);
    }

    #[tokio::test]
    async fn test_prune_expired() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.increment("old", now - Duration::hours(1)).await.unwrap();
        store.increment("live", now + Duration::hours(1)).await.unwrap();

        assert_eq!(store.prune_expired(now).await.unwrap(), 1);
        assert!(store.bucket("old").await.is_none());
        assert!(store.bucket("live").await.is_some());
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_and_pages() {
        let store = MemoryStore::new();
        for minutes in 0..5 {
            store.add_product(product("doors", minutes)).await;
        }
        store.add_product(product("laminate", 10)).await;

        let first = store.list(Some("doors"), None, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert!(first[0].created_at > first[1].created_at);

        let cursor = first[1].cursor();
        let rest = store.list(Some("doors"), Some(&cursor), 10).await.unwrap();
        assert_eq!(rest.len(), 3);
        assert!(rest.iter().all(|p| p.created_at < cursor.created_at));

        assert_eq!(store.list(None, None, 100).await.unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.ping().await,
            Err(RepositoryError::Unavailable(_))
        ));
        store.set_unavailable(false);
        assert!(store.ping().await.is_ok());
    }
}
