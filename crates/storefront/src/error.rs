//! Unified error handling.
//!
//! Each module has its own error enum; [`StorefrontError`] collects them for
//! callers that drive several modules (the CLI, mostly) and knows which text
//! is safe to show to a shopper.

use thiserror::Error;

use crate::api::ApiError;
use crate::auth::{AccessRejection, AuthError};
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Top-level error type for the storefront library.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Persisted state could not be written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Backend request failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Login, signup or logout failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// A guard refused access.
    #[error("Access denied: {0}")]
    Access(#[from] AccessRejection),
}

impl StorefrontError {
    /// Text suitable for showing to the user.
    ///
    /// Internal details (I/O paths, serialization errors) are replaced with a
    /// generic message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.to_string(),
            Self::Storage(_) => "Could not save local state".to_string(),
            Self::Api(e) => api_message(e),
            Self::Auth(e) => match e {
                AuthError::InvalidCredentials => "Invalid username or password".to_string(),
                AuthError::RejectedToken(_) => "Login failed: the server issued an unusable session".to_string(),
                AuthError::Api(e) => api_message(e),
                AuthError::Storage(_) => "Could not save local state".to_string(),
            },
            Self::Checkout(e) => match e {
                CheckoutError::Catalog(e) => api_message(e),
                CheckoutError::Storage(_) => "Could not save local state".to_string(),
                other => other.to_string(),
            },
            Self::Access(AccessRejection::RedirectToLogin) => "Please log in first".to_string(),
            Self::Access(AccessRejection::Forbidden) => "Admin access required".to_string(),
        }
    }
}

fn api_message(error: &ApiError) -> String {
    if let Some(message) = error.backend_message() {
        return message.to_string();
    }
    match error {
        ApiError::Transport(_) => "Network error. Please check your connection.".to_string(),
        ApiError::Invalid(fields) => fields.to_string(),
        ApiError::Status(_) if error.is_unauthorized() => {
            "Your session has expired. Please log in again.".to_string()
        }
        ApiError::Status(_) => error.to_string(),
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;
