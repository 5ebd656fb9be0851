//! Login and signup endpoints.

use reqwest::Method;
use tracing::instrument;

use super::{ApiClient, ApiError, LoginRequest, LoginResponse, RegisterUser};

impl ApiClient {
    /// Exchange credentials for a bearer token.
    ///
    /// The session is not touched here; see
    /// [`AuthService::login`](crate::auth::AuthService::login).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the credentials are refused.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &LoginRequest) -> Result<String, ApiError> {
        let response = self
            .execute(Method::POST, &["login"], |r| r.form(credentials))
            .await?;
        let body = response.text().await?;
        Ok(LoginResponse::parse(&body).into_token())
    }

    /// Register a new account after client-side validation.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Invalid`] without sending when validation fails.
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub async fn signup(&self, user: &RegisterUser) -> Result<(), ApiError> {
        user.validate()?;
        self.send_json(Method::POST, &["signup"], user).await
    }
}
