//! Authorization gate.
//!
//! Synchronous questions views ask before they activate: is anyone signed in,
//! and are they an admin. Answers come from the session store's cached state
//! only; the gate never decodes a token.
//!
//! These checks exist to decide what to show. They are not a security
//! boundary: tokens are not signature-verified on the client, so the backend
//! must enforce every access rule on its own.

use tokio::sync::watch;

use super::session::Session;

/// Who may open a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone.
    Public,
    /// Any signed-in user.
    Authenticated,
    /// Signed-in users holding an admin role.
    Admin,
}

/// Why a guard refused entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessRejection {
    /// Nobody is signed in.
    #[error("sign in required")]
    RedirectToLogin,
    /// Signed in, but without the admin role.
    #[error("admin access required")]
    Forbidden,
}

impl AccessRejection {
    /// Where the user should be sent instead.
    #[must_use]
    pub const fn redirect_path(self) -> &'static str {
        match self {
            Self::RedirectToLogin => "/login",
            Self::Forbidden => "/products",
        }
    }
}

/// Read-only view over the session for guards.
#[derive(Debug, Clone)]
pub struct AuthGate {
    session: watch::Receiver<Session>,
}

impl AuthGate {
    /// Create a gate observing the given session channel.
    #[must_use]
    pub const fn new(session: watch::Receiver<Session>) -> Self {
        Self { session }
    }

    /// Whether a session is active.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_authenticated()
    }

    /// Whether the active session holds an admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.session.borrow().is_admin()
    }

    /// Check `access` against the current session.
    ///
    /// # Errors
    ///
    /// Returns [`AccessRejection::RedirectToLogin`] when signed out and
    /// [`AccessRejection::Forbidden`] when an admin view is requested by a
    /// non-admin.
    pub fn guard(&self, access: Access) -> Result<(), AccessRejection> {
        let session = self.session.borrow();
        match access {
            Access::Public => Ok(()),
            _ if !session.is_authenticated() => Err(AccessRejection::RedirectToLogin),
            Access::Authenticated => Ok(()),
            Access::Admin if session.is_admin() => Ok(()),
            Access::Admin => Err(AccessRejection::Forbidden),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::auth::SessionStore;
    use crate::auth::token::encode_unsigned;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn sessions() -> SessionStore {
        SessionStore::load(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::at_timestamp(1_700_000_000)),
        )
    }

    #[test]
    fn test_signed_out_guards() {
        let sessions = sessions();
        let gate = AuthGate::new(sessions.subscribe());

        assert!(gate.guard(Access::Public).is_ok());
        assert_eq!(
            gate.guard(Access::Authenticated),
            Err(AccessRejection::RedirectToLogin)
        );
        assert_eq!(gate.guard(Access::Admin), Err(AccessRejection::RedirectToLogin));
        assert_eq!(AccessRejection::RedirectToLogin.redirect_path(), "/login");
    }

    #[test]
    fn test_customer_is_forbidden_from_admin() {
        let sessions = sessions();
        let gate = AuthGate::new(sessions.subscribe());
        sessions
            .set_token(&encode_unsigned(&json!({"sub": "bob", "roles": ["USER"]})))
            .unwrap();

        assert!(gate.is_authenticated());
        assert!(!gate.is_admin());
        assert!(gate.guard(Access::Authenticated).is_ok());
        assert_eq!(gate.guard(Access::Admin), Err(AccessRejection::Forbidden));
        assert_eq!(AccessRejection::Forbidden.redirect_path(), "/products");
    }

    #[test]
    fn test_gate_follows_login_and_logout() {
        let sessions = sessions();
        let gate = AuthGate::new(sessions.subscribe());

        sessions
            .set_token(&encode_unsigned(&json!({
                "sub": "alice",
                "roles": ["ADMIN"],
                "exp": 1_700_003_600,
            })))
            .unwrap();
        assert!(gate.is_authenticated());
        assert!(gate.is_admin());
        assert!(gate.guard(Access::Admin).is_ok());

        sessions.clear().unwrap();
        assert!(!gate.is_authenticated());
        assert!(!gate.is_admin());
    }
}
