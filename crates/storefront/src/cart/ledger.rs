use std::sync::Arc;

use tokio::sync::watch;

use ecomm_core::ProductId;

use super::{Cart, CartItem, CartProduct};
use crate::storage::{KeyValueStore, StorageError, keys};

/// The persisted cart.
///
/// Mutations run read-modify-persist inside the watch channel's lock, so two
/// calls never interleave and a change is published only after it has been
/// written. A mutation that fails to persist leaves the published cart as it
/// was.
pub struct CartLedger {
    store: Arc<dyn KeyValueStore>,
    state: watch::Sender<Cart>,
}

impl std::fmt::Debug for CartLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartLedger")
            .field("cart", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl CartLedger {
    /// Hydrate the ledger from storage.
    ///
    /// Unreadable data yields an empty cart. Lines that break the ledger's
    /// rules (zero quantity, duplicates, quantity above stock) are repaired.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let cart = store
            .get(keys::CART)
            .map_or_else(Cart::default, |text| match serde_json::from_str::<Cart>(&text) {
                Ok(cart) => sanitize(cart),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding unreadable persisted cart");
                    Cart::default()
                }
            });

        let (state, _) = watch::channel(cart);
        Self { store, state }
    }

    /// The current cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.state.borrow().clone()
    }

    /// Subscribe to cart changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.state.subscribe()
    }

    /// Add `quantity` units of `product`.
    ///
    /// The line's captured product data is replaced by `product`, and the
    /// resulting quantity is clamped to its stock. Products with no stock
    /// (and requests for zero units) leave the cart unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    pub fn add(&self, product: &CartProduct, quantity: u32) -> Result<(), StorageError> {
        if product.stock == 0 || quantity == 0 {
            tracing::debug!(product_id = %product.id, "Ignoring add of unavailable product");
            return Ok(());
        }

        self.mutate(|items| {
            if let Some(item) = items.iter_mut().find(|i| i.product.id == product.id) {
                let next = item.quantity.saturating_add(quantity).min(product.stock);
                let changed = next != item.quantity || item.product != *product;
                item.product = product.clone();
                item.quantity = next;
                changed
            } else {
                items.push(CartItem {
                    product: product.clone(),
                    quantity: quantity.min(product.stock),
                });
                true
            }
        })
    }

    /// Set the quantity of an existing line.
    ///
    /// Zero or negative removes the line; values above the captured stock
    /// are clamped. Unknown products are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    pub fn set_quantity(&self, id: &ProductId, quantity: i64) -> Result<(), StorageError> {
        if quantity <= 0 {
            return self.remove(id);
        }

        self.mutate(|items| {
            let Some(item) = items.iter_mut().find(|i| &i.product.id == id) else {
                return false;
            };
            let ceiling = i64::from(item.product.stock);
            // Bounded by a u32 stock value.
            let next = u32::try_from(quantity.min(ceiling)).unwrap_or(item.product.stock);
            if next == 0 {
                items.retain(|i| &i.product.id != id);
                return true;
            }
            let changed = next != item.quantity;
            item.quantity = next;
            changed
        })
    }

    /// Remove a line. Absent products are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    pub fn remove(&self, id: &ProductId) -> Result<(), StorageError> {
        self.mutate(|items| {
            let before = items.len();
            items.retain(|i| &i.product.id != id);
            items.len() != before
        })
    }

    /// Empty the cart. Always writes, even when already empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut result = Ok(());
        self.state.send_if_modified(|cart| {
            match persist(self.store.as_ref(), &Cart::default()) {
                Ok(()) => {
                    let changed = !cart.is_empty();
                    *cart = Cart::default();
                    changed
                }
                Err(e) => {
                    result = Err(e);
                    false
                }
            }
        });
        result
    }

    /// Replace the captured data of an existing line with fresh product data.
    ///
    /// The quantity is re-clamped to the new stock; a product that is out of
    /// stock is removed. Returns whether the product was in the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart could not be persisted.
    pub fn refresh_product(&self, product: &CartProduct) -> Result<bool, StorageError> {
        let mut present = false;
        self.mutate(|items| {
            if product.stock == 0 {
                let before = items.len();
                items.retain(|i| i.product.id != product.id);
                present = items.len() != before;
                return present;
            }
            let Some(item) = items.iter_mut().find(|i| i.product.id == product.id) else {
                return false;
            };
            present = true;
            let quantity = item.quantity.min(product.stock);
            let changed = item.product != *product || quantity != item.quantity;
            item.product = product.clone();
            item.quantity = quantity;
            changed
        })?;
        Ok(present)
    }

    fn mutate(&self, apply: impl FnOnce(&mut Vec<CartItem>) -> bool) -> Result<(), StorageError> {
        let mut result = Ok(());
        self.state.send_if_modified(|cart| {
            let mut next = cart.clone();
            if !apply(&mut next.items) {
                return false;
            }
            match persist(self.store.as_ref(), &next) {
                Ok(()) => {
                    *cart = next;
                    true
                }
                Err(e) => {
                    result = Err(e);
                    false
                }
            }
        });
        result
    }
}

fn persist(store: &dyn KeyValueStore, cart: &Cart) -> Result<(), StorageError> {
    let text = serde_json::to_string(cart).map_err(|source| StorageError::Serialize {
        key: keys::CART,
        source,
    })?;
    store.set(keys::CART, &text)
}

fn sanitize(cart: Cart) -> Cart {
    let mut items: Vec<CartItem> = Vec::with_capacity(cart.items.len());
    for mut item in cart.items {
        item.quantity = item.quantity.min(item.product.stock);
        if item.quantity == 0 {
            continue;
        }
        if let Some(existing) = items.iter_mut().find(|i| i.product.id == item.product.id) {
            existing.quantity = existing
                .quantity
                .saturating_add(item.quantity)
                .min(existing.product.stock);
        } else {
            items.push(item);
        }
    }
    Cart { items }
}
