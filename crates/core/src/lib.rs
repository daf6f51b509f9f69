//! Door Renaissance Core - Shared domain library.
//!
//! This crate provides the domain logic shared by the storefront service and
//! its tooling:
//! - `storefront` - Order intake, notification relay, catalog listing
//! - `cli` - Command-line tools for migrations and maintenance
//!
//! # Architecture
//!
//! The core crate performs no network or database I/O. Persistence and
//! third-party calls live in the storefront crate; everything here can be
//! exercised synchronously.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, statuses, and loosely-typed amounts
//! - [`order`] - The order document and raw order submissions
//! - [`validation`] - Order field validation and rejection codes
//! - [`cart`] - Cart state, its local storage slot, and cross-context sync

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod order;
pub mod types;
pub mod validation;

pub use order::{Contact, Order, OrderItem, OrderSubmission};
pub use types::*;
pub use validation::{RejectionCode, ValidatedOrder, ValidationError, validate};
