//! Authentication error types.

use thiserror::Error;

use super::token::TokenError;
use crate::api::ApiError;
use crate::storage::StorageError;

/// Errors that can occur during login, signup and logout.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend refused the credentials.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The backend issued a token the client cannot use.
    #[error("login returned an unusable token: {0}")]
    RejectedToken(TokenError),

    /// Request failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Session state could not be persisted.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
