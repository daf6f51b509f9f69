//! Catalog listing endpoint.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{ProductCursor, ProductPage};
use crate::state::AppState;

/// Query parameters for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    /// Only products in this category.
    pub category: Option<String>,
    /// `nextCursor` from the previous page.
    pub cursor: Option<String>,
}

/// List products, newest first.
///
/// GET /api/products
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ProductPage>> {
    let category = query.category.as_deref().filter(|c| !c.is_empty());
    let after = query
        .cursor
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(ProductCursor::decode)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let page = state.catalog().page(category, after).await?;
    Ok(Json(page))
}
