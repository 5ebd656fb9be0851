//! Comparing cart lines against live product data.

use std::fmt;

use ecomm_core::{Price, ProductId};

use super::{CheckoutError, ProductCatalog};
use crate::cart::CartLedger;

/// A difference between a cart line and the live catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discrepancy {
    PriceChanged {
        product_id: ProductId,
        name: String,
        was: Price,
        now: Price,
    },
    StockReduced {
        product_id: ProductId,
        name: String,
        requested: u32,
        available: u32,
    },
    /// Deleted or out of stock; the line was removed.
    Unavailable { product_id: ProductId, name: String },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriceChanged { name, was, now, .. } => {
                write!(f, "{name}: price changed from {was} to {now}")
            }
            Self::StockReduced {
                name,
                requested,
                available,
                ..
            } => write!(f, "{name}: only {available} left (had {requested} in cart)"),
            Self::Unavailable { name, .. } => write!(f, "{name}: no longer available"),
        }
    }
}

/// Refresh every line of the ledger from `catalog`, reporting what changed.
pub(super) async fn reconcile_ledger(
    ledger: &CartLedger,
    catalog: &impl ProductCatalog,
) -> Result<Vec<Discrepancy>, CheckoutError> {
    let mut discrepancies = Vec::new();

    for item in ledger.snapshot().items() {
        let captured = &item.product;
        let Some(live) = catalog.current_product(&captured.id).await? else {
            ledger.remove(&captured.id)?;
            discrepancies.push(Discrepancy::Unavailable {
                product_id: captured.id.clone(),
                name: captured.name.clone(),
            });
            continue;
        };

        if live.stock == 0 {
            discrepancies.push(Discrepancy::Unavailable {
                product_id: captured.id.clone(),
                name: captured.name.clone(),
            });
        } else {
            if live.price != captured.price {
                discrepancies.push(Discrepancy::PriceChanged {
                    product_id: captured.id.clone(),
                    name: live.name.clone(),
                    was: captured.price,
                    now: live.price,
                });
            }
            if live.stock < item.quantity {
                discrepancies.push(Discrepancy::StockReduced {
                    product_id: captured.id.clone(),
                    name: live.name.clone(),
                    requested: item.quantity,
                    available: live.stock,
                });
            }
        }
        ledger.refresh_product(&live)?;
    }

    if !discrepancies.is_empty() {
        tracing::info!(count = discrepancies.len(), "Cart differs from live catalog");
    }
    Ok(discrepancies)
}
