//! Cross-context cart synchronization.
//!
//! Last writer wins: when another context writes the cart slot, the local
//! cart is replaced wholesale with the slot's content. There is no merge, so
//! two contexts editing within the same tick can lose one side's change.

use super::storage::{ObservableStorage, StorageWatch};
use super::{CART_STORAGE_KEY, CartStore};

/// A cart attached to its storage slot's change notifications.
///
/// Local mutations go through [`CartSync::cart_mut`] and are persisted by the
/// cart itself; [`CartSync::pump`] applies writes made by other contexts.
/// Dropping the value, or calling [`CartSync::detach`], unsubscribes.
pub struct CartSync<S: ObservableStorage> {
    cart: CartStore<S>,
    subscription: S::Subscription,
}

impl<S: ObservableStorage> CartSync<S> {
    /// Subscribe `cart` to foreign writes of its storage slot.
    pub fn attach(cart: CartStore<S>) -> Self {
        let subscription = cart.storage().subscribe(CART_STORAGE_KEY);
        Self { cart, subscription }
    }

    /// Apply every notification delivered since the last call.
    ///
    /// Returns the number of notifications seen; if any, the cart has been
    /// reloaded from the slot.
    pub fn pump(&mut self) -> usize {
        let pending = self.subscription.pending();
        if pending > 0 {
            self.cart.reload();
        }
        pending
    }

    /// The synchronized cart.
    #[must_use]
    pub const fn cart(&self) -> &CartStore<S> {
        &self.cart
    }

    /// Mutable access for local edits.
    pub const fn cart_mut(&mut self) -> &mut CartStore<S> {
        &mut self.cart
    }

    /// Stop listening and hand the cart back.
    pub fn detach(self) -> CartStore<S> {
        self.cart
    }
}
