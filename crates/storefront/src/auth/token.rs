//! Bearer token decoding.
//!
//! Tokens are JWTs issued by the backend. Only the payload segment is read:
//! **no signature verification happens here**. Expiry and role checks built
//! on these claims are a UX gate that decides what to show, never an access
//! control boundary. The backend must enforce every permission itself.

use std::collections::BTreeSet;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

/// Substring that marks a scope entry as a role.
const ROLE_MARKER: &str = "ROLE_";

/// Role names (case-insensitive) that grant admin screens.
const ADMIN_ROLES: &[&str] = &["ADMIN", "ROLE_ADMIN"];

/// Why a token could not be decoded.
#[derive(Debug, Error)]
pub enum MalformedToken {
    /// Not exactly three dot-separated segments.
    #[error("expected 3 segments, found {0}")]
    SegmentCount(usize),

    /// Payload segment is not valid base64.
    #[error("payload is not base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// Payload is not JSON.
    #[error("payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is JSON but not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Reasons a token is not usable for a session.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token could not be decoded.
    #[error("malformed token: {0}")]
    Malformed(#[from] MalformedToken),

    /// Token expiry is at or before the current time.
    #[error("token expired at {0}")]
    Expired(DateTime<Utc>),
}

/// One way of reading role names out of a claims payload.
///
/// Backends disagree on the shape: Spring resource servers emit a `scope`
/// string, hand-rolled issuers emit `roles` arrays or comma-separated
/// strings. Strategies are tried in [`ROLE_STRATEGIES`] order and the first
/// one whose claim is present wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleSource {
    /// `"roles": ["ADMIN", "USER"]`
    RolesArray,
    /// `"authorities": ["ROLE_ADMIN"]` or `[{"authority": "ROLE_ADMIN"}]`
    AuthoritiesArray,
    /// `"roles": "ADMIN,USER"` or `"authorities": "ROLE_ADMIN,ROLE_USER"`
    CommaSeparated,
    /// `"scope": "openid ROLE_ADMIN"`; entries containing `ROLE_`.
    Scope,
}

/// Role extraction strategies in priority order.
pub const ROLE_STRATEGIES: [RoleSource; 4] = [
    RoleSource::RolesArray,
    RoleSource::AuthoritiesArray,
    RoleSource::CommaSeparated,
    RoleSource::Scope,
];

impl RoleSource {
    /// Roles found by this strategy, or `None` if its claim is absent or has
    /// a different shape.
    fn extract(self, claims: &Map<String, Value>) -> Option<BTreeSet<String>> {
        match self {
            Self::RolesArray => array_roles(claims.get("roles")?),
            Self::AuthoritiesArray => array_roles(claims.get("authorities")?),
            Self::CommaSeparated => ["roles", "authorities"].iter().find_map(|key| {
                let raw = claims.get(*key)?.as_str()?;
                Some(
                    raw.split(',')
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .map(str::to_owned)
                        .collect(),
                )
            }),
            Self::Scope => {
                let scope = claims.get("scope")?.as_str()?;
                Some(
                    scope
                        .split_whitespace()
                        .filter(|entry| entry.to_ascii_uppercase().contains(ROLE_MARKER))
                        .map(str::to_owned)
                        .collect(),
                )
            }
        }
    }
}

fn array_roles(value: &Value) -> Option<BTreeSet<String>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(role) => Some(role.clone()),
                Value::Object(obj) => obj
                    .get("authority")
                    .and_then(Value::as_str)
                    .map(str::to_owned),
                _ => None,
            })
            .collect(),
    )
}

/// Whether a role set contains an admin marker.
#[must_use]
pub fn has_admin_role(roles: &BTreeSet<String>) -> bool {
    roles.iter().any(|role| {
        let upper = role.to_ascii_uppercase();
        // Prefixed forms such as `SCOPE_ROLE_ADMIN` must end on a `_` boundary.
        ADMIN_ROLES.contains(&upper.as_str())
            || upper
                .strip_suffix("_ROLE_ADMIN")
                .is_some_and(|prefix| !prefix.is_empty())
    })
}

/// Decoded token payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    payload: Map<String, Value>,
}

impl Claims {
    /// Build claims from an already-decoded payload object.
    #[must_use]
    pub const fn from_payload(payload: Map<String, Value>) -> Self {
        Self { payload }
    }

    /// The `sub` claim.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.string("sub")
    }

    /// A string-valued claim.
    #[must_use]
    pub fn string(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }

    /// The `exp` claim in seconds since the epoch, if present and numeric.
    #[must_use]
    pub fn expires_at_secs(&self) -> Option<i64> {
        let exp = self.payload.get("exp")?;
        exp.as_i64().or_else(|| {
            #[allow(clippy::cast_possible_truncation)] // exp is whole seconds in practice
            exp.as_f64().map(|secs| secs.floor() as i64)
        })
    }

    /// The `exp` claim as an instant.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at_secs()?, 0)
    }

    /// Whether the token has expired at `now`.
    ///
    /// True iff `exp` is present and `exp * 1000 <= now` in milliseconds. A
    /// token without `exp` never expires.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_secs()
            .is_some_and(|exp| exp.saturating_mul(1000) <= now.timestamp_millis())
    }

    /// Role names carried by the token, or an empty set if no strategy in
    /// [`ROLE_STRATEGIES`] recognizes the payload.
    #[must_use]
    pub fn roles(&self) -> BTreeSet<String> {
        ROLE_STRATEGIES
            .iter()
            .find_map(|source| source.extract(&self.payload))
            .unwrap_or_default()
    }

    /// Whether the roles include an admin marker.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        has_admin_role(&self.roles())
    }
}

/// Decode a token's payload.
///
/// # Errors
///
/// Returns [`MalformedToken`] if the token does not split into exactly three
/// segments or its payload is not base64url-encoded JSON.
pub fn decode(token: &str) -> Result<Claims, MalformedToken> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    let [_, payload, _] = segments.as_slice() else {
        return Err(MalformedToken::SegmentCount(segments.len()));
    };

    let payload = payload.trim_end_matches('=');
    // Tolerate the standard alphabet as well as base64url.
    let bytes = if payload.contains(['+', '/']) {
        STANDARD_NO_PAD.decode(payload)?
    } else {
        URL_SAFE_NO_PAD.decode(payload)?
    };

    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(payload) => Ok(Claims::from_payload(payload)),
        _ => Err(MalformedToken::NotAnObject),
    }
}

/// Decode a token and reject it if expired at `now`.
///
/// # Errors
///
/// Returns [`TokenError::Malformed`] or [`TokenError::Expired`].
pub fn validate(token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
    let claims = decode(token)?;
    if claims.is_expired(now) {
        return Err(TokenError::Expired(
            claims.expires_at().unwrap_or(DateTime::UNIX_EPOCH),
        ));
    }
    Ok(claims)
}

/// Build an unsigned token around `payload`. Test and tooling helper.
#[must_use]
pub fn encode_unsigned(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.signature")
}
