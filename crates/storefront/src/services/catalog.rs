//! Catalog listing.
//!
//! Pages of 100 products, newest first, optionally filtered by category.
//! Pages are cached with `moka` for one minute.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::db::{ProductStore, RepositoryError};
use crate::models::{ProductCursor, ProductPage};

/// Products per page.
pub const PAGE_SIZE: u32 = 100;

/// Cache key: category filter and resume cursor.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct PageKey {
    category: Option<String>,
    after: Option<ProductCursor>,
}

/// Cached catalog reader.
#[derive(Clone)]
pub struct Catalog {
    products: Arc<dyn ProductStore>,
    cache: Cache<PageKey, ProductPage>,
}

impl Catalog {
    #[must_use]
    pub fn new(products: Arc<dyn ProductStore>) -> Self {
        Self {
            products,
            cache: Cache::builder()
                .max_capacity(1000)
                .time_to_live(Duration::from_secs(60))
                .build(),
        }
    }

    /// Fetch one page of the listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the product store fails.
    pub async fn page(
        &self,
        category: Option<&str>,
        after: Option<ProductCursor>,
    ) -> Result<ProductPage, RepositoryError> {
        let key = PageKey {
            category: category.map(String::from),
            after,
        };
        if let Some(page) = self.cache.get(&key).await {
            debug!("Cache hit for product page");
            return Ok(page);
        }

        let items = self
            .products
            .list(category, after.as_ref(), PAGE_SIZE)
            .await?;
        let done = items.len() < PAGE_SIZE as usize;
        let next_cursor = if done {
            None
        } else {
            items.last().map(|p| p.cursor().encode())
        };

        let page = ProductPage {
            items,
            next_cursor,
            done,
        };
        self.cache.insert(key, page.clone()).await;
        Ok(page)
    }

    /// Drop every cached page.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}
