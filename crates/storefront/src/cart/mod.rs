//! Cart ledger.
//!
//! The cart lives on the client until checkout. Each line captures the
//! product's price and stock as they were when the line was last touched, so
//! totals reflect what the shopper saw. The backend re-checks everything when
//! the order arrives.

mod ledger;

pub use ledger::CartLedger;

use serde::{Deserialize, Serialize};

use ecomm_core::{Price, ProductId};

/// Product data captured on a cart line.
///
/// Serialized with the backend's product field names so carts persisted by
/// earlier clients (which stored whole product records) still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    #[serde(rename = "productId")]
    pub id: ProductId,
    #[serde(rename = "productName")]
    pub name: String,
    pub price: Price,
    /// Stock ceiling known when the line was last updated.
    pub stock: u32,
}

/// One cart line. `quantity` is at least 1 and at most `product.stock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: CartProduct,
    pub quantity: u32,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.product.price.times(self.quantity)
    }
}

/// Immutable snapshot of the cart, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// The line for `id`, if present.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.product.id == id)
    }

    /// Sum of line totals at captured prices.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}
