//! CLI error type.

use thiserror::Error;

use ecomm_core::ValidationErrors;
use ecomm_storefront::StorefrontError;
use ecomm_storefront::api::ApiError;
use ecomm_storefront::auth::{AccessRejection, AuthError};
use ecomm_storefront::checkout::CheckoutError;
use ecomm_storefront::config::ConfigError;
use ecomm_storefront::storage::StorageError;

/// Errors that end a CLI command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    /// Bad command-line input.
    #[error("{0}")]
    Input(String),

    /// Reading from stdin failed.
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Storefront(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

macro_rules! via_storefront {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for CliError {
                fn from(e: $source) -> Self {
                    Self::Storefront(StorefrontError::from(e))
                }
            }
        )*
    };
}

via_storefront!(
    ApiError,
    AuthError,
    CheckoutError,
    ConfigError,
    StorageError,
    AccessRejection,
);

impl From<ValidationErrors> for CliError {
    fn from(e: ValidationErrors) -> Self {
        Self::Storefront(StorefrontError::Api(ApiError::Invalid(e)))
    }
}
