//! Domain models for storefront.
//!
//! Orders and their submissions live in `door_renaissance_core`; this module
//! holds the types only the service deals with.

pub mod product;

pub use product::{CursorError, Product, ProductCursor, ProductPage};
