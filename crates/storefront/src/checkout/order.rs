//! Order request assembly.

use serde::{Deserialize, Serialize};

use ecomm_core::{Price, ProductId, PurchaseOrderId};

use super::CheckoutError;
use crate::cart::Cart;

/// One line of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(rename = "idProduct")]
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of an order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub id: PurchaseOrderId,
    pub lines: Vec<OrderLine>,
    /// Sum of captured unit prices times quantities.
    pub total: Price,
}

/// Order id for a submission made at `millis` since the epoch.
#[must_use]
pub fn order_id(millis: i64) -> PurchaseOrderId {
    PurchaseOrderId::new(format!("ORDER-{millis}"))
}

/// Build an order from a cart snapshot using the prices captured on each
/// line. Prices are not re-fetched.
///
/// # Errors
///
/// Returns [`CheckoutError::EmptyCart`] if the cart has no lines.
pub fn build_request(cart: &Cart, id: PurchaseOrderId) -> Result<OrderRequest, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    Ok(OrderRequest {
        id,
        lines: cart
            .items()
            .iter()
            .map(|item| OrderLine {
                product_id: item.product.id.clone(),
                quantity: item.quantity,
            })
            .collect(),
        total: cart.total(),
    })
}
