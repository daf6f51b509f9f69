//! Catalog product types.
//!
//! Products are schemaless documents: besides the fields used for listing
//! (`id`, `category`, `createdAt`) every attribute is passed through as-is.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use door_renaissance_core::ProductId;

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Remaining document fields (name, price, images, ...).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Product {
    /// Position of this product in the listing order.
    #[must_use]
    pub const fn cursor(&self) -> ProductCursor {
        ProductCursor {
            created_at: self.created_at,
            id: self.id,
        }
    }
}

/// One page of a product listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub items: Vec<Product>,
    /// Cursor to pass back for the next page; absent once `done`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// True when this page was shorter than the page size.
    pub done: bool,
}

/// Invalid listing cursor.
#[derive(Debug, Error)]
#[error("invalid product cursor")]
pub struct CursorError;

/// Resume point of a listing: the last product seen.
///
/// Listings are ordered newest first with the id as tiebreaker, so the pair
/// identifies a position even when timestamps collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProductCursor {
    pub created_at: DateTime<Utc>,
    pub id: ProductId,
}

impl ProductCursor {
    /// Opaque, URL-safe token.
    #[must_use]
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}|{}", self.created_at.to_rfc3339(), self.id))
    }

    /// Parse a token produced by [`ProductCursor::encode`].
    ///
    /// # Errors
    ///
    /// Returns `CursorError` if the token is not valid base64 or does not
    /// contain a timestamp and product id.
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| CursorError)?;
        let raw = String::from_utf8(bytes).map_err(|_| CursorError)?;
        let (created_at, id) = raw.split_once('|').ok_or(CursorError)?;

        Ok(Self {
            created_at: DateTime::parse_from_rfc3339(created_at)
                .map_err(|_| CursorError)?
                .with_timezone(&Utc),
            id: id.parse().map_err(|_| CursorError)?,
        })
    }
}
