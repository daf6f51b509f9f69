//! Shopping cart state.
//!
//! The cart is an ordered list of line items, at most one per product `id`,
//! owned by a single browsing context. Every mutation re-serializes the whole
//! list into a durable [`LocalStorage`] slot, and the cart is rehydrated from
//! that slot when created. [`CartSync`] keeps carts in sibling contexts
//! consistent by reloading from the slot whenever another context writes it.
//!
//! # Example
//!
//! ```
//! use door_renaissance_core::cart::{CartItem, CartStore, SharedStorage};
//! use serde_json::json;
//!
//! let storage = SharedStorage::new();
//! let mut cart = CartStore::new(storage.context());
//!
//! let door = CartItem::from_product(&json!({"id": "door-1", "name": "Door", "price": 12500}))
//!     .expect("product has an id");
//! cart.add(door.clone()).expect("storage accepts the write");
//! cart.add(door).expect("storage accepts the write");
//!
//! assert_eq!(cart.total_count(), 2);
//! ```

mod storage;
mod sync;

pub use storage::{
    LocalStorage, ObservableStorage, SharedStorage, StorageContext, StorageError, StorageEvent,
    StorageSubscription, StorageWatch,
};
pub use sync::CartSync;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{coerce_amount, coerce_quantity};
use crate::types::price::{deserialize_amount, deserialize_quantity, serialize_amount};

/// Storage key holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "cart";

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product identifier; unique within a cart.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        serialize_with = "serialize_amount",
        deserialize_with = "deserialize_amount"
    )]
    pub price: Decimal,
    /// Always at least 1 while the item is in a cart.
    #[serde(deserialize_with = "deserialize_quantity")]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Any other product attributes (size, color, category, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CartItem {
    /// Build a cart line from a catalog product payload.
    ///
    /// The price is coerced (non-numeric becomes 0) and the quantity set to 1.
    /// Returns `None` when the product has no usable `id`.
    #[must_use]
    pub fn from_product(product: &Value) -> Option<Self> {
        let Value::Object(fields) = product else {
            return None;
        };
        let mut extra = fields.clone();

        let id = match extra.remove("id")? {
            Value::String(s) if !s.is_empty() => s,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let name = extra
            .remove("name")
            .and_then(|v| v.as_str().map(str::to_owned));
        let price = extra
            .remove("price")
            .map_or(Decimal::ZERO, |v| coerce_amount(&v));
        let image = extra
            .remove("image")
            .and_then(|v| v.as_str().map(str::to_owned));
        let quantity = extra
            .remove("quantity")
            .map_or(1, |v| coerce_quantity(&v))
            .max(1);

        Some(Self {
            id,
            name,
            price,
            quantity,
            image,
            extra,
        })
    }

    /// Price × quantity, saturating at the bounds of [`Decimal`].
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// The cart of one browsing context, mirrored into local storage.
pub struct CartStore<S> {
    items: Vec<CartItem>,
    storage: S,
}

impl<S: LocalStorage> CartStore<S> {
    /// Create a cart, rehydrating its items from `storage`.
    pub fn new(storage: S) -> Self {
        let items = read_items(&storage);
        Self { items, storage }
    }

    /// Current line items, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Look up a line by product id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// The storage slot backing this cart.
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Add one unit of a product.
    ///
    /// If the product is already in the cart only its quantity is bumped;
    /// the other fields of `item` are ignored. Otherwise it is appended with
    /// quantity 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted. The in-memory
    /// change is kept either way.
    pub fn add(&mut self, item: CartItem) -> Result<(), StorageError> {
        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            existing.quantity = existing.quantity.saturating_add(1);
        } else {
            self.items.push(CartItem { quantity: 1, ..item });
        }
        self.persist()
    }

    /// Remove one unit; the line disappears when its quantity would reach 0.
    ///
    /// Unknown ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    pub fn decrement(&mut self, id: &str) -> Result<(), StorageError> {
        let Some(pos) = self.items.iter().position(|i| i.id == id) else {
            return Ok(());
        };
        match self.items.get_mut(pos) {
            Some(item) if item.quantity > 1 => item.quantity -= 1,
            _ => {
                self.items.remove(pos);
            }
        }
        self.persist()
    }

    /// Set a line's quantity, clamping negatives to 0; 0 removes the line.
    ///
    /// Unknown ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    pub fn set_quantity(&mut self, id: &str, quantity: i64) -> Result<(), StorageError> {
        let Some(pos) = self.items.iter().position(|i| i.id == id) else {
            return Ok(());
        };
        let quantity = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);
        if quantity == 0 {
            self.items.remove(pos);
        } else if let Some(item) = self.items.get_mut(pos) {
            item.quantity = quantity;
        }
        self.persist()
    }

    /// Remove a line entirely.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    pub fn remove(&mut self, id: &str) -> Result<(), StorageError> {
        self.items.retain(|i| i.id != id);
        self.persist()
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.items.clear();
        self.persist()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Sum of price × quantity over all lines, saturating like
    /// [`CartItem::line_total`].
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items
            .iter()
            .map(CartItem::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    /// Replace the in-memory items wholesale with the slot's current content.
    pub fn reload(&mut self) {
        self.items = read_items(&self.storage);
    }

    fn persist(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string(&self.items)?;
        self.storage.set_item(CART_STORAGE_KEY, &json)
    }
}

/// Parse the slot; anything malformed reads as an empty cart.
fn read_items<S: LocalStorage>(storage: &S) -> Vec<CartItem> {
    let Some(raw) = storage.get_item(CART_STORAGE_KEY) else {
        return Vec::new();
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(entries)) => entries.iter().filter_map(CartItem::from_product).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::*;

    fn item(id: &str, price: Value) -> CartItem {
        CartItem::from_product(&json!({"id": id, "name": id, "price": price})).unwrap()
    }

    fn cart() -> CartStore<StorageContext> {
        CartStore::new(SharedStorage::new().context())
    }

    #[test]
    fn test_add_same_id_twice_bumps_quantity() {
        let mut cart = cart();
        cart.add(item("door-1", json!(100))).unwrap();
        cart.add(item("door-1", json!(999))).unwrap();

        assert_eq!(cart.items().len(), 1);
        let line = cart.get("door-1").unwrap();
        assert_eq!(line.quantity, 2);
        // Fields of the second add are ignored.
        assert_eq!(line.price, Decimal::from(100));
    }

    #[test]
    fn test_add_coerces_price() {
        let mut cart = cart();
        cart.add(item("door-1", json!("bad"))).unwrap();
        cart.add(item("door-2", json!("4500"))).unwrap();

        assert_eq!(cart.get("door-1").unwrap().price, Decimal::ZERO);
        assert_eq!(cart.get("door-2").unwrap().price, Decimal::from(4500));
    }

    #[test]
    fn test_add_always_starts_at_one() {
        let mut cart = cart();
        let mut line = item("door-1", json!(100));
        line.quantity = 7;
        cart.add(line).unwrap();
        assert_eq!(cart.get("door-1").unwrap().quantity, 1);
    }

    #[test]
    fn test_decrement() {
        let mut cart = cart();
        cart.add(item("door-1", json!(100))).unwrap();
        cart.add(item("door-1", json!(100))).unwrap();

        cart.decrement("door-1").unwrap();
        assert_eq!(cart.get("door-1").unwrap().quantity, 1);

        cart.decrement("door-1").unwrap();
        assert!(cart.get("door-1").is_none());
        assert!(cart.items().is_empty());

        // Unknown ids are ignored.
        cart.decrement("door-1").unwrap();
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = cart();
        cart.add(item("door-1", json!(100))).unwrap();
        cart.add(item("door-2", json!(100))).unwrap();

        cart.set_quantity("door-1", 5).unwrap();
        assert_eq!(cart.get("door-1").unwrap().quantity, 5);

        cart.set_quantity("door-1", 0).unwrap();
        assert!(cart.get("door-1").is_none());

        cart.set_quantity("door-2", -3).unwrap();
        assert!(cart.get("door-2").is_none());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = cart();
        cart.add(item("door-1", json!(100))).unwrap();
        cart.add(item("door-2", json!(100))).unwrap();

        cart.remove("door-1").unwrap();
        assert_eq!(cart.items().len(), 1);

        cart.clear().unwrap();
        assert!(cart.items().is_empty());
        assert_eq!(cart.storage().get_item(CART_STORAGE_KEY).as_deref(), Some("[]"));
    }

    #[test]
    fn test_totals() {
        let mut cart = cart();
        cart.add(item("a", json!(100))).unwrap();
        cart.set_quantity("a", 2).unwrap();
        cart.add(item("b", json!("bad"))).unwrap();
        cart.set_quantity("b", 3).unwrap();

        assert_eq!(cart.total_count(), 5);
        assert_eq!(cart.total_price(), Decimal::from(200));
    }

    #[test]
    fn test_total_price_with_fractions() {
        let mut cart = cart();
        cart.add(item("a", json!("19.99"))).unwrap();
        cart.set_quantity("a", 3).unwrap();
        assert_eq!(cart.total_price(), Decimal::from_str("59.97").unwrap());
    }

    #[test]
    fn test_huge_totals_saturate() {
        let mut cart = cart();
        cart.add(item("a", json!("100000000000000000000"))).unwrap();
        cart.set_quantity("a", 1_000_000_000).unwrap();
        cart.add(item("b", json!("100000000000000000000"))).unwrap();
        cart.set_quantity("b", 1_000_000_000).unwrap();

        assert_eq!(cart.get("a").unwrap().line_total(), Decimal::MAX);
        assert_eq!(cart.total_price(), Decimal::MAX);
    }

    #[test]
    fn test_slot_holds_numeric_prices() {
        let mut cart = cart();
        cart.add(item("a", json!(12500))).unwrap();
        cart.add(item("b", json!("19.99"))).unwrap();

        let raw = cart.storage().get_item(CART_STORAGE_KEY).unwrap();
        let slot: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(slot[0]["price"], json!(12500));
        assert_eq!(slot[1]["price"], json!(19.99));
        assert_eq!(slot[0]["quantity"], json!(1));
    }

    #[test]
    fn test_item_deserializes_leniently() {
        let line: CartItem = serde_json::from_value(json!({
            "id": "a",
            "price": "250",
            "quantity": "3",
            "size": "80x200"
        }))
        .unwrap();

        assert_eq!(line.price, Decimal::from(250));
        assert_eq!(line.quantity, 3);
        assert_eq!(line.extra.get("size"), Some(&json!("80x200")));
    }

    #[test]
    fn test_every_mutation_persists() {
        let storage = SharedStorage::new();
        let mut cart = CartStore::new(storage.context());
        cart.add(item("door-1", json!(100))).unwrap();

        let reopened = CartStore::new(storage.context());
        assert_eq!(reopened.items(), cart.items());
    }

    #[test]
    fn test_rehydrate_preserves_extra_fields() {
        let storage = SharedStorage::new();
        let mut cart = CartStore::new(storage.context());
        let door = CartItem::from_product(&json!({
            "id": "door-1",
            "price": 100,
            "image": "https://res.cloudinary.com/door.jpg",
            "color": "oak"
        }))
        .unwrap();
        cart.add(door).unwrap();

        let reopened = CartStore::new(storage.context());
        let line = reopened.get("door-1").unwrap();
        assert_eq!(line.image.as_deref(), Some("https://res.cloudinary.com/door.jpg"));
        assert_eq!(line.extra.get("color"), Some(&json!("oak")));
    }

    #[test]
    fn test_rehydrate_malformed_slot_is_empty() {
        for raw in ["not json", "{\"id\": 1}", "42", "null"] {
            let storage = SharedStorage::new();
            storage.context().set_item(CART_STORAGE_KEY, raw).unwrap();
            assert!(CartStore::new(storage.context()).items().is_empty(), "{raw}");
        }
    }

    #[test]
    fn test_rehydrate_coerces_entries() {
        let storage = SharedStorage::new();
        storage
            .context()
            .set_item(
                CART_STORAGE_KEY,
                r#"[{"id":"a","price":"bad","quantity":0},{"name":"no id"},7,{"id":"b","price":50,"quantity":"2"}]"#,
            )
            .unwrap();

        let cart = CartStore::new(storage.context());
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.get("a").unwrap().quantity, 1);
        assert_eq!(cart.get("a").unwrap().price, Decimal::ZERO);
        assert_eq!(cart.get("b").unwrap().quantity, 2);
        assert_eq!(cart.total_price(), Decimal::from(100));
    }
}
