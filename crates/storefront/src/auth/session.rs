//! Session store.
//!
//! Holds the current bearer token and the identity derived from it, persists
//! both through a [`KeyValueStore`], and publishes every change on a
//! [`watch`] channel so views and guards can subscribe instead of polling.
//!
//! The token is decoded exactly once per change. Readers (see
//! [`AuthGate`](super::AuthGate)) only look at the cached [`Session`].

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::token::{self, Claims, TokenError};
use crate::clock::Clock;
use crate::storage::{KeyValueStore, StorageError, keys};

/// A bearer token.
///
/// Implements `Debug` manually so tokens never end up in logs.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Identity derived from token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_admin: bool,
}

impl UserInfo {
    /// Derive the identity from decoded claims.
    ///
    /// The username is the `sub` claim, falling back to `name` for issuers
    /// that put the login there.
    #[must_use]
    pub fn from_claims(claims: &Claims) -> Self {
        let text = |name: &str| claims.string(name).unwrap_or_default().to_owned();
        Self {
            username: claims
                .subject()
                .or_else(|| claims.string("name"))
                .unwrap_or_default()
                .to_owned(),
            email: text("email"),
            first_name: text("firstName"),
            last_name: text("lastName"),
            is_admin: claims.is_admin(),
        }
    }

    /// "First Last", or the username when no name claims were present.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_owned()
        }
    }
}

/// Snapshot of the authentication state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<BearerToken>,
    user: Option<UserInfo>,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// The logged-out session.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            token: None,
            user: None,
            expires_at: None,
        }
    }

    /// The bearer token, if signed in.
    #[must_use]
    pub const fn token(&self) -> Option<&BearerToken> {
        self.token.as_ref()
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&UserInfo> {
        self.user.as_ref()
    }

    /// Expiry of the current token, if it carries one.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether a token that was valid when set is held.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Cached admin flag; false when signed out.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.token.is_some() && self.user.as_ref().is_some_and(|u| u.is_admin)
    }

    /// Username of the signed-in user.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.username.as_str())
    }
}

/// Result of handing a token to the store.
#[derive(Debug)]
pub enum SessionChange {
    /// Token accepted; the session now belongs to this user.
    SignedIn(UserInfo),
    /// Token unusable; the session was cleared instead.
    Rejected(TokenError),
}

/// Owner of the session state.
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<Session>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("session", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Restore the session from persisted storage.
    ///
    /// A persisted token that is malformed or expired is discarded (and its
    /// keys removed), so a signed-in-but-broken state is never observable.
    pub fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let session = match store.get(keys::AUTH_TOKEN) {
            Some(raw) => match token::validate(&raw, clock.now()) {
                Ok(claims) => restore(store.as_ref(), raw, &claims),
                Err(e) => {
                    tracing::warn!(error = %e, "Discarding persisted session token");
                    if let Err(e) = remove_keys(store.as_ref()) {
                        tracing::warn!(error = %e, "Failed to remove stale session keys");
                    }
                    Session::empty()
                }
            },
            None => Session::empty(),
        };

        let (state, _) = watch::channel(session);
        Self {
            store,
            clock,
            state,
        }
    }

    /// The current session snapshot.
    #[must_use]
    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Subscribe to session changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// The bearer token to attach to API requests, if signed in.
    #[must_use]
    pub fn bearer(&self) -> Option<BearerToken> {
        self.state.borrow().token.clone()
    }

    /// Adopt a token issued by the backend.
    ///
    /// Malformed or expired tokens clear the session and are reported as
    /// [`SessionChange::Rejected`] rather than as an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the new state could not be persisted.
    pub fn set_token(&self, raw: &str) -> Result<SessionChange, StorageError> {
        let claims = match token::validate(raw, self.clock.now()) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected session token");
                self.clear()?;
                return Ok(SessionChange::Rejected(e));
            }
        };

        let user = UserInfo::from_claims(&claims);
        self.store.set(keys::AUTH_TOKEN, raw)?;
        self.store.set(keys::USER_INFO, &encode_user(&user)?)?;

        tracing::info!(username = %user.username, admin = user.is_admin, "Session started");
        self.state.send_replace(Session {
            token: Some(BearerToken::new(raw)),
            user: Some(user.clone()),
            expires_at: claims.expires_at(),
        });
        Ok(SessionChange::SignedIn(user))
    }

    /// Sign out: remove persisted token and identity and publish the empty
    /// session. Clearing an empty session is a no-op apart from the write.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted keys could not be removed.
    pub fn clear(&self) -> Result<(), StorageError> {
        remove_keys(self.store.as_ref())?;
        let previous = self.state.send_replace(Session::empty());
        if let Some(username) = previous.username() {
            tracing::info!(%username, "Session cleared");
        }
        Ok(())
    }

    /// Re-check the cached expiry against the clock, clearing the session if
    /// the token has lapsed since it was set.
    ///
    /// Returns whether the session is still authenticated.
    ///
    /// # Errors
    ///
    /// Returns an error if an expired session could not be cleared.
    pub fn revalidate(&self) -> Result<bool, StorageError> {
        let (authenticated, expires_at) = {
            let session = self.state.borrow();
            (session.is_authenticated(), session.expires_at)
        };
        if !authenticated {
            return Ok(false);
        }
        match expires_at {
            Some(expiry) if expiry <= self.clock.now() => {
                tracing::info!(%expiry, "Session token expired");
                self.clear()?;
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}

fn restore(store: &dyn KeyValueStore, raw: String, claims: &Claims) -> Session {
    let derived = UserInfo::from_claims(claims);
    let persisted = store
        .get(keys::USER_INFO)
        .and_then(|text| match serde_json::from_str::<UserInfo>(&text) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted user info");
                None
            }
        });

    if persisted.as_ref() != Some(&derived) {
        let written = encode_user(&derived).and_then(|text| store.set(keys::USER_INFO, &text));
        if let Err(e) = written {
            tracing::warn!(error = %e, "Failed to rewrite persisted user info");
        }
    }

    Session {
        token: Some(BearerToken::new(raw)),
        user: Some(derived),
        expires_at: claims.expires_at(),
    }
}

fn encode_user(user: &UserInfo) -> Result<String, StorageError> {
    serde_json::to_string(user).map_err(|source| StorageError::Serialize {
        key: keys::USER_INFO,
        source,
    })
}

fn remove_keys(store: &dyn KeyValueStore) -> Result<(), StorageError> {
    store.remove(keys::AUTH_TOKEN)?;
    store.remove(keys::USER_INFO)
}
