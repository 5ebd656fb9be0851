//! Purchase order endpoints.

use reqwest::Method;
use tracing::instrument;

use ecomm_core::{OrderStatus, Page, PageRequest, PurchaseOrderId};

use super::{ApiClient, ApiError, PurchaseOrderDto, PurchaseOrderSummary, StatusUpdate};
use crate::checkout::{OrderRequest, OrderSubmitter};

impl ApiClient {
    /// Submit a new order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects the order.
    #[instrument(skip(self, order), fields(order_id = %order.id, lines = order.lines.len()))]
    pub async fn create_order(&self, order: &OrderRequest) -> Result<(), ApiError> {
        self.send_json(Method::POST, &["purchase-order"], order)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn order(&self, id: &PurchaseOrderId) -> Result<PurchaseOrderDto, ApiError> {
        self.get_json(&["purchase-order", id.as_str()], &[]).await
    }

    /// Orders visible to the caller: their own, or all of them for admins.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: PageRequest,
    ) -> Result<Page<PurchaseOrderSummary>, ApiError> {
        self.get_json(
            &["purchase-order", "page"],
            &[("page", page.page.to_string()), ("size", page.size.to_string())],
        )
        .await
    }

    /// Request a status change. Lifecycle rules are enforced by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the transition is refused.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_order_status(
        &self,
        id: &PurchaseOrderId,
        status: OrderStatus,
    ) -> Result<(), ApiError> {
        self.send_json(
            Method::PATCH,
            &["purchase-order", id.as_str()],
            &StatusUpdate { status },
        )
        .await
    }
}

impl OrderSubmitter for ApiClient {
    async fn submit_order(&self, order: &OrderRequest) -> Result<(), ApiError> {
        self.create_order(order).await
    }
}
