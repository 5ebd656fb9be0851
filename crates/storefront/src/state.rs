//! The wired-up client.

use std::sync::Arc;

use crate::alerts::{AlertCenter, AlertDebouncer, ResponseAlerts};
use crate::api::ApiClient;
use crate::auth::{AuthGate, AuthService, SessionStore};
use crate::cart::CartLedger;
use crate::checkout::CheckoutFlow;
use crate::clock::{Clock, SystemClock};
use crate::config::StorefrontConfig;
use crate::error::Result;
use crate::storage::{FileStore, KeyValueStore};

/// Every component of the client, sharing one store and one clock.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    session: Arc<SessionStore>,
    cart: Arc<CartLedger>,
    checkout: CheckoutFlow,
    api: ApiClient,
    alerts: AlertCenter,
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Storefront {
    /// Open the client with state persisted under `config.state_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the state directory cannot be opened or the HTTP
    /// client cannot be built.
    pub fn open(config: StorefrontConfig) -> Result<Self> {
        let store = Arc::new(FileStore::open(&config.state_dir)?);
        Self::with_parts(config, store, Arc::new(SystemClock))
    }

    /// Build the client over explicit storage and clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_parts(
        config: StorefrontConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let session = Arc::new(SessionStore::load(store.clone(), clock.clone()));
        let cart = Arc::new(CartLedger::load(store));
        let checkout = CheckoutFlow::new(cart.clone(), clock.clone());

        let alerts = AlertCenter::new(clock.clone(), config.alert_duration);
        let responses = Arc::new(ResponseAlerts::new(
            alerts.clone(),
            AlertDebouncer::new(clock, config.alert_debounce),
        ));
        let api = ApiClient::new(&config, session.clone(), Some(responses))?;

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                session,
                cart,
                checkout,
                api,
                alerts,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// A guard view over the current session.
    #[must_use]
    pub fn gate(&self) -> AuthGate {
        AuthGate::new(self.inner.session.subscribe())
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(&self.inner.api, &self.inner.session)
    }

    #[must_use]
    pub fn cart(&self) -> &CartLedger {
        &self.inner.cart
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutFlow {
        &self.inner.checkout
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    #[must_use]
    pub fn alerts(&self) -> &AlertCenter {
        &self.inner.alerts
    }
}
