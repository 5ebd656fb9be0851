use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use ecomm_core::PurchaseOrderId;

use super::reconcile::reconcile_ledger;
use super::{
    CheckoutError, Discrepancy, GENERIC_SUBMISSION_FAILURE, OrderRequest, OrderSubmitter,
    ProductCatalog, build_request, order_id,
};
use crate::cart::CartLedger;
use crate::clock::Clock;

/// Where the checkout flow stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CheckoutState {
    #[default]
    Idle,
    /// An order has been assembled but not sent.
    Building,
    Submitting { order_id: PurchaseOrderId },
    /// The order was accepted and the cart cleared.
    Completed { order_id: PurchaseOrderId },
    /// The order was refused; the cart is untouched.
    Failed { message: String },
}

/// The checkout state machine.
///
/// `Completed` and `Failed` are published as-is and count as `Idle` for the
/// next [`build`](Self::build), so a fresh flow can start once the previous
/// one settled. [`submit`](Self::submit) only runs from `Building`: every
/// built order is sent at most once.
pub struct CheckoutFlow {
    ledger: Arc<CartLedger>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<CheckoutState>,
    last_order_millis: Mutex<i64>,
}

impl std::fmt::Debug for CheckoutFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutFlow")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl CheckoutFlow {
    #[must_use]
    pub fn new(ledger: Arc<CartLedger>, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(CheckoutState::Idle);
        Self {
            ledger,
            clock,
            state,
            last_order_millis: Mutex::new(i64::MIN),
        }
    }

    #[must_use]
    pub fn state(&self) -> CheckoutState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CheckoutState> {
        self.state.subscribe()
    }

    /// Assemble an order from the current cart.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::AlreadySubmitting`] while a submission is in
    /// flight and [`CheckoutError::EmptyCart`] when there is nothing to
    /// order (the flow returns to `Idle`).
    pub fn build(&self) -> Result<OrderRequest, CheckoutError> {
        self.enter(CheckoutState::Building, |s| match s {
            CheckoutState::Submitting { .. } => Err(CheckoutError::AlreadySubmitting),
            _ => Ok(()),
        })?;

        match build_request(&self.ledger.snapshot(), self.next_order_id()) {
            Ok(order) => Ok(order),
            Err(e) => {
                self.state.send_replace(CheckoutState::Idle);
                Err(e)
            }
        }
    }

    /// Submit an assembled order once.
    ///
    /// On success the cart is cleared and the flow completes. On failure the
    /// cart is left as it was and the backend's message (or a generic one)
    /// is reported.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::AlreadySubmitting`] if another submission is
    /// in flight, [`CheckoutError::NotBuilt`] unless the flow is `Building`
    /// and [`CheckoutError::SubmissionFailed`] if the backend refused the
    /// order.
    pub async fn submit(
        &self,
        submitter: &impl OrderSubmitter,
        order: &OrderRequest,
    ) -> Result<PurchaseOrderId, CheckoutError> {
        self.enter(
            CheckoutState::Submitting {
                order_id: order.id.clone(),
            },
            |s| match s {
                CheckoutState::Building => Ok(()),
                CheckoutState::Submitting { .. } => Err(CheckoutError::AlreadySubmitting),
                _ => Err(CheckoutError::NotBuilt),
            },
        )?;

        if let Err(source) = submitter.submit_order(order).await {
            let message = source
                .backend_message()
                .unwrap_or(GENERIC_SUBMISSION_FAILURE)
                .to_owned();
            tracing::warn!(order_id = %order.id, error = %source, "Order submission failed");
            self.state.send_replace(CheckoutState::Failed {
                message: message.clone(),
            });
            return Err(CheckoutError::SubmissionFailed { message, source });
        }

        // The order exists on the backend now; a failed local clear must not
        // be reported as a failed order.
        if let Err(e) = self.ledger.clear() {
            tracing::error!(order_id = %order.id, error = %e, "Order placed but cart could not be cleared");
        }

        tracing::info!(order_id = %order.id, total = %order.total, "Order submitted");
        self.state.send_replace(CheckoutState::Completed {
            order_id: order.id.clone(),
        });
        Ok(order.id.clone())
    }

    /// Build and submit in one step.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build) and [`submit`](Self::submit).
    pub async fn checkout(
        &self,
        submitter: &impl OrderSubmitter,
    ) -> Result<PurchaseOrderId, CheckoutError> {
        let order = self.build()?;
        self.submit(submitter, &order).await
    }

    /// Refresh cart lines from live product data and report differences.
    ///
    /// Unavailable products are removed, quantities are clamped to live
    /// stock and captured prices are updated. The next [`build`](Self::build)
    /// uses the refreshed prices.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::AlreadySubmitting`] while a submission is in
    /// flight, or the first catalog or storage error.
    pub async fn reconcile(
        &self,
        catalog: &impl ProductCatalog,
    ) -> Result<Vec<Discrepancy>, CheckoutError> {
        if matches!(*self.state.borrow(), CheckoutState::Submitting { .. }) {
            return Err(CheckoutError::AlreadySubmitting);
        }
        reconcile_ledger(&self.ledger, catalog).await
    }

    /// Return to `Idle`. Ignored while a submission is in flight.
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, CheckoutState::Idle | CheckoutState::Submitting { .. }) {
                return false;
            }
            *state = CheckoutState::Idle;
            true
        });
    }

    fn enter(
        &self,
        next: CheckoutState,
        allowed: impl FnOnce(&CheckoutState) -> Result<(), CheckoutError>,
    ) -> Result<(), CheckoutError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| {
            outcome = allowed(state);
            if outcome.is_err() {
                return false;
            }
            *state = next;
            true
        });
        outcome
    }

    /// `ORDER-<millis>`, bumped past the previous id when the clock has not
    /// moved so every attempt gets a distinct id.
    fn next_order_id(&self) -> PurchaseOrderId {
        let now = self.clock.now_millis();
        let mut last = self
            .last_order_millis
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let millis = if now > *last { now } else { last.saturating_add(1) };
        *last = millis;
        order_id(millis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use ecomm_core::{Price, ProductId};

    use super::*;
    use crate::api::{ApiError, ErrorResponse};
    use crate::cart::CartProduct;
    use crate::clock::ManualClock;
    use crate::storage::{KeyValueStore, MemoryStore, keys};

    #[derive(Default)]
    struct FakeBackend {
        reject_with: Option<(u16, Option<&'static str>)>,
        calls: AtomicUsize,
        received: Mutex<Vec<OrderRequest>>,
    }

    impl OrderSubmitter for FakeBackend {
        async fn submit_order(&self, order: &OrderRequest) -> Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.received.lock().unwrap().push(order.clone());
            match self.reject_with {
                None => Ok(()),
                Some((status, Some(message))) => {
                    Err(ApiError::Status(ErrorResponse::with_message(status, message)))
                }
                Some((status, None)) => Err(ApiError::Status(ErrorResponse::parse(status, ""))),
            }
        }
    }

    struct FakeCatalog(HashMap<ProductId, CartProduct>);

    impl ProductCatalog for FakeCatalog {
        async fn current_product(&self, id: &ProductId) -> Result<Option<CartProduct>, ApiError> {
            Ok(self.0.get(id).cloned())
        }
    }

    fn product(id: &str, price_cents: u32, stock: u32) -> CartProduct {
        CartProduct {
            id: ProductId::new(id),
            name: id.to_uppercase(),
            price: Price::from_cents(price_cents),
            stock,
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        ledger: Arc<CartLedger>,
        flow: CheckoutFlow,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let ledger = Arc::new(CartLedger::load(store.clone()));
        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        let flow = CheckoutFlow::new(ledger.clone(), clock);
        Fixture {
            store,
            ledger,
            flow,
        }
    }

    fn fill(ledger: &CartLedger) {
        ledger.add(&product("a", 1000, 5), 2).unwrap();
        ledger.add(&product("b", 500, 5), 1).unwrap();
    }

    #[tokio::test]
    async fn test_empty_cart_fails_and_returns_to_idle() {
        let f = fixture();
        let backend = FakeBackend::default();

        let err = f.flow.checkout(&backend).await.unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(f.flow.state(), CheckoutState::Idle);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_submit_clears_cart() {
        let f = fixture();
        fill(&f.ledger);
        let backend = FakeBackend::default();

        let id = f.flow.checkout(&backend).await.unwrap();
        assert_eq!(id.as_str(), "ORDER-1700000000000");
        assert_eq!(
            f.flow.state(),
            CheckoutState::Completed {
                order_id: id.clone()
            }
        );

        let sent = backend.received.lock().unwrap()[0].clone();
        assert_eq!(sent.total, Price::from_cents(2500));
        assert_eq!(sent.lines.len(), 2);

        assert!(f.ledger.snapshot().is_empty());
        assert_eq!(f.store.get(keys::CART).as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_cart() {
        let f = fixture();
        fill(&f.ledger);
        let before = f.ledger.snapshot();
        let backend = FakeBackend {
            reject_with: Some((409, Some("Insufficient stock for product a"))),
            ..FakeBackend::default()
        };

        let err = f.flow.checkout(&backend).await.unwrap_err();
        match err {
            CheckoutError::SubmissionFailed { message, .. } => {
                assert_eq!(message, "Insufficient stock for product a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(f.ledger.snapshot(), before);
        assert!(matches!(f.flow.state(), CheckoutState::Failed { .. }));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_without_backend_message_is_generic() {
        let f = fixture();
        fill(&f.ledger);
        let backend = FakeBackend {
            reject_with: Some((500, None)),
            ..FakeBackend::default()
        };

        let err = f.flow.checkout(&backend).await.unwrap_err();
        assert_eq!(err.to_string(), GENERIC_SUBMISSION_FAILURE);
    }

    #[tokio::test]
    async fn test_retry_after_failure_uses_new_id() {
        let f = fixture();
        fill(&f.ledger);
        let failing = FakeBackend {
            reject_with: Some((503, None)),
            ..FakeBackend::default()
        };
        f.flow.checkout(&failing).await.unwrap_err();

        let backend = FakeBackend::default();
        let id = f.flow.checkout(&backend).await.unwrap();

        let first = failing.received.lock().unwrap()[0].id.clone();
        assert_ne!(first, id);
        assert!(f.ledger.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_order_is_sent_at_most_once() {
        let f = fixture();
        fill(&f.ledger);
        let backend = FakeBackend::default();

        let order = f.flow.build().unwrap();
        f.flow.submit(&backend, &order).await.unwrap();
        // Refill so only the state machine stands in the way.
        fill(&f.ledger);

        let again = f.flow.submit(&backend, &order).await.unwrap_err();
        assert!(matches!(again, CheckoutError::NotBuilt));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(f.flow.state(), CheckoutState::Completed { .. }));
    }

    #[tokio::test]
    async fn test_submit_requires_build() {
        let f = fixture();
        fill(&f.ledger);
        let backend = FakeBackend::default();
        let order = f.flow.build().unwrap();
        f.flow.reset();

        let err = f.flow.submit(&backend, &order).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NotBuilt));
        assert_eq!(f.flow.state(), CheckoutState::Idle);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.ledger.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_order_must_be_rebuilt() {
        let f = fixture();
        fill(&f.ledger);
        let failing = FakeBackend {
            reject_with: Some((503, None)),
            ..FakeBackend::default()
        };
        let order = f.flow.build().unwrap();
        f.flow.submit(&failing, &order).await.unwrap_err();

        let err = f.flow.submit(&failing, &order).await.unwrap_err();
        assert!(matches!(err, CheckoutError::NotBuilt));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);

        let rebuilt = f.flow.build().unwrap();
        assert_ne!(rebuilt.id, order.id);
        assert_eq!(f.flow.state(), CheckoutState::Building);
    }

    #[test]
    fn test_build_is_blocked_while_submitting() {
        let f = fixture();
        fill(&f.ledger);
        let order = f.flow.build().unwrap();
        f.flow
            .enter(
                CheckoutState::Submitting {
                    order_id: order.id,
                },
                |_| Ok(()),
            )
            .unwrap();

        assert!(matches!(f.flow.build(), Err(CheckoutError::AlreadySubmitting)));
        f.flow.reset();
        assert!(matches!(f.flow.state(), CheckoutState::Submitting { .. }));
    }

    #[test]
    fn test_transitions_are_published() {
        let f = fixture();
        fill(&f.ledger);
        let mut rx = f.flow.subscribe();
        rx.borrow_and_update();

        f.flow.build().unwrap();
        assert_eq!(*rx.borrow_and_update(), CheckoutState::Building);

        f.flow.reset();
        assert_eq!(*rx.borrow_and_update(), CheckoutState::Idle);
    }

    #[tokio::test]
    async fn test_reconcile_reports_and_applies_changes() {
        let f = fixture();
        f.ledger.add(&product("a", 1000, 5), 4).unwrap();
        f.ledger.add(&product("b", 500, 5), 1).unwrap();
        f.ledger.add(&product("c", 300, 5), 1).unwrap();
        f.ledger.add(&product("d", 200, 5), 1).unwrap();

        let catalog = FakeCatalog(HashMap::from([
            (ProductId::new("a"), product("a", 1000, 2)),
            (ProductId::new("b"), product("b", 600, 5)),
            (ProductId::new("d"), product("d", 200, 0)),
        ]));

        let found = f.flow.reconcile(&catalog).await.unwrap();
        assert!(found.contains(&Discrepancy::StockReduced {
            product_id: ProductId::new("a"),
            name: "A".into(),
            requested: 4,
            available: 2,
        }));
        assert!(found.contains(&Discrepancy::PriceChanged {
            product_id: ProductId::new("b"),
            name: "B".into(),
            was: Price::from_cents(500),
            now: Price::from_cents(600),
        }));
        assert!(found.iter().any(|d| matches!(d, Discrepancy::Unavailable { product_id, .. } if product_id.as_str() == "c")));
        assert!(found.iter().any(|d| matches!(d, Discrepancy::Unavailable { product_id, .. } if product_id.as_str() == "d")));

        let cart = f.ledger.snapshot();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.total(), Price::from_cents(2600));
    }

    #[tokio::test]
    async fn test_reconcile_clean_cart_reports_nothing() {
        let f = fixture();
        f.ledger.add(&product("a", 1000, 5), 1).unwrap();
        let catalog = FakeCatalog(HashMap::from([(ProductId::new("a"), product("a", 1000, 5))]));

        assert!(f.flow.reconcile(&catalog).await.unwrap().is_empty());
        assert_eq!(f.ledger.snapshot().len(), 1);
    }
}
