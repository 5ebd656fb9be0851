//! Authentication: token decoding, session state, guards and login flows.
//!
//! - [`token`] decodes claims from a bearer token without verifying it
//! - [`SessionStore`] owns the persisted session and publishes changes
//! - [`AuthGate`] answers "signed in?" and "admin?" for views
//! - [`AuthService`] drives login, signup and logout against the backend
//!
//! Nothing here is a security boundary. The backend verifies tokens and
//! enforces access on every request.

mod error;
mod gate;
mod session;
pub mod token;

pub use error::AuthError;
pub use gate::{Access, AccessRejection, AuthGate};
pub use session::{BearerToken, Session, SessionChange, SessionStore, UserInfo};

use secrecy::SecretString;

use crate::api::{ApiClient, LoginRequest, RegisterUser};

/// Login, signup and logout.
pub struct AuthService<'a> {
    api: &'a ApiClient,
    session: &'a SessionStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(api: &'a ApiClient, session: &'a SessionStore) -> Self {
        Self { api, session }
    }

    /// Log in and start a session with the issued token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the backend answers 401.
    /// Returns `AuthError::RejectedToken` if the issued token is malformed or
    /// already expired; the session is left signed out.
    pub async fn login(&self, username: &str, password: SecretString) -> Result<UserInfo, AuthError> {
        let credentials = LoginRequest {
            username: username.trim().to_owned(),
            password,
        };

        let token = self.api.login(&credentials).await.map_err(|e| {
            if e.is_unauthorized() {
                AuthError::InvalidCredentials
            } else {
                AuthError::Api(e)
            }
        })?;

        match self.session.set_token(&token)? {
            SessionChange::SignedIn(user) => Ok(user),
            SessionChange::Rejected(reason) => Err(AuthError::RejectedToken(reason)),
        }
    }

    /// Register an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Api` carrying field errors when client-side
    /// validation fails or the backend rejects the registration.
    pub async fn signup(&self, user: &RegisterUser) -> Result<(), AuthError> {
        self.api.signup(user).await?;
        tracing::info!(username = %user.username, "Account registered");
        Ok(())
    }

    /// End the session.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted session keys could not be removed.
    pub fn logout(&self) -> Result<(), AuthError> {
        self.session.clear()?;
        Ok(())
    }
}
