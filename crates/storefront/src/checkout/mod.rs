//! Checkout: turning the cart into a purchase order.
//!
//! [`CheckoutFlow`] drives `Idle -> Building -> Submitting -> Completed |
//! Failed` and publishes each transition. Submission goes through an
//! [`OrderSubmitter`]; live product checks go through a [`ProductCatalog`].
//! Both are implemented by [`ApiClient`](crate::api::ApiClient) and are
//! traits so the flow can be driven without a backend.

mod flow;
mod order;
mod reconcile;

pub use flow::{CheckoutFlow, CheckoutState};
pub use order::{OrderLine, OrderRequest, build_request, order_id};
pub use reconcile::Discrepancy;

use std::future::Future;

use thiserror::Error;

use ecomm_core::ProductId;

use crate::api::ApiError;
use crate::cart::CartProduct;
use crate::storage::StorageError;

/// Message shown when the backend gives no reason for a rejected order.
pub const GENERIC_SUBMISSION_FAILURE: &str = "Failed to create purchase order. Please try again.";

/// Sends orders to the backend.
pub trait OrderSubmitter: Send + Sync {
    /// Submit `order` once. Implementations must not retry.
    fn submit_order(&self, order: &OrderRequest) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Source of live product data.
pub trait ProductCatalog: Send + Sync {
    /// Current data for `id`, or `None` if the product no longer exists.
    fn current_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<Option<CartProduct>, ApiError>> + Send;
}

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to order.
    #[error("cart is empty")]
    EmptyCart,

    /// A submission is already in flight.
    #[error("an order is already being submitted")]
    AlreadySubmitting,

    /// `submit` was called without a freshly built order.
    #[error("no order is ready to submit")]
    NotBuilt,

    /// The backend rejected the order or could not be reached. The cart is
    /// unchanged.
    #[error("{message}")]
    SubmissionFailed {
        message: String,
        #[source]
        source: ApiError,
    },

    /// Fetching live product data failed.
    #[error("catalog error: {0}")]
    Catalog(#[from] ApiError),

    /// The cart could not be persisted.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
