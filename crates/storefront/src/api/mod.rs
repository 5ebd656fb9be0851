//! HTTP client for the ecomm backend.
//!
//! # Behavior
//!
//! - The session's bearer token is attached to every request when present
//! - A 401 on any request other than login clears the session
//! - Products fetched by id are cached via `moka` for reconciliation
//! - Mutating requests report their outcome to [`ResponseAlerts`] when wired
//!
//! Endpoint methods live in per-resource modules (`auth`, `categories`,
//! `orders`, `products`) as `impl ApiClient` blocks.

mod auth;
mod categories;
mod error;
mod orders;
mod products;
pub mod types;

pub use error::{ApiError, BackendFieldError, ErrorResponse};
pub use types::*;

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use ecomm_core::ProductId;

use crate::alerts::ResponseAlerts;
use crate::auth::SessionStore;
use crate::config::StorefrontConfig;

/// Client for the backend REST API.
///
/// Cheap to clone; clones share the connection pool and product cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
    products: Cache<ProductId, ProductDto>,
    alerts: Option<Arc<ResponseAlerts>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: &StorefrontConfig,
        session: Arc<SessionStore>,
        alerts: Option<Arc<ResponseAlerts>>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let products = Cache::builder()
            .max_capacity(config.product_cache_capacity)
            .time_to_live(config.product_cache_ttl)
            .build();

        // Trailing slash so endpoint segments append instead of replacing
        // the last path segment.
        let mut base_url = config.api_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                session,
                products,
                alerts,
            }),
        })
    }

    /// The session this client authenticates with.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Send a request and turn non-success statuses into [`ApiError::Status`].
    async fn execute(
        &self,
        method: Method,
        segments: &[&str],
        customize: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(segments);
        let is_login = segments == ["login"];

        let mut request = self.inner.client.request(method.clone(), url.clone());
        if !is_login && let Some(token) = self.inner.session.bearer() {
            request = request.bearer_auth(token.expose());
        }

        let result = match customize(request).send().await {
            Ok(response) if response.status().is_success() => Ok(response),
            Ok(response) => Err(self.status_error(response, is_login).await),
            Err(e) => {
                tracing::warn!(%method, path = url.path(), error = %e, "Request failed");
                Err(ApiError::Transport(e))
            }
        };

        if let Some(alerts) = &self.inner.alerts {
            alerts.notify(&method, url.path(), result.as_ref().map(|_| ()));
        }
        result
    }

    async fn status_error(&self, response: reqwest::Response, is_login: bool) -> ApiError {
        let status = response.status();
        let path = response.url().path().to_owned();
        let body = response.text().await.unwrap_or_default();
        let error = ErrorResponse::parse(status.as_u16(), &body);

        if status == StatusCode::UNAUTHORIZED && !is_login {
            tracing::info!(%path, "Backend rejected credentials, signing out");
            if let Err(e) = self.inner.session.clear() {
                tracing::warn!(error = %e, "Failed to clear session after 401");
            }
        } else if status.is_server_error() {
            tracing::error!(
                %status,
                %path,
                body = %body.chars().take(500).collect::<String>(),
                "Backend returned server error"
            );
        } else {
            tracing::debug!(%status, %path, "Backend rejected request");
        }

        ApiError::Status(error)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .execute(Method::GET, segments, |r| r.query(query))
            .await?;
        Ok(response.json().await?)
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<(), ApiError> {
        self.execute(method, segments, |r| r.json(body)).await?;
        Ok(())
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), ApiError> {
        self.execute(Method::DELETE, segments, |r| r).await?;
        Ok(())
    }
}
