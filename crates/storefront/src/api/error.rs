//! API error types.

use serde::Deserialize;
use thiserror::Error;

use ecomm_core::{FieldError, ValidationErrors};

/// A rejected field as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendFieldError {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub default_message: String,
}

/// The backend's error body.
///
/// Every field is optional on the wire; a body that does not parse at all is
/// replaced by an empty one carrying only the HTTP status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Option<Vec<BackendFieldError>>,
    #[serde(default)]
    pub path: Option<String>,
}

impl ErrorResponse {
    /// Parse a response body, keeping the real HTTP status.
    #[must_use]
    pub fn parse(status: u16, body: &str) -> Self {
        let mut response: Self = serde_json::from_str(body).unwrap_or_default();
        response.status = status;
        response
    }

    /// An error body with only a status and a message.
    #[must_use]
    pub fn with_message(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    fn summary(&self) -> String {
        match (self.message.as_deref(), self.error.as_deref()) {
            (Some(message), _) if !message.is_empty() => message.to_owned(),
            (_, Some(error)) if !error.is_empty() => format!("HTTP {}: {error}", self.status),
            _ => format!("HTTP {}", self.status),
        }
    }
}

/// Errors returned by [`ApiClient`](super::ApiClient).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{}", .0.summary())]
    Status(ErrorResponse),

    /// A request body failed client-side checks and was not sent.
    #[error("Invalid input: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl ApiError {
    /// HTTP status of the failure; `0` when no response was received.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Transport(e) => e.status().map_or(0, |s| s.as_u16()),
            Self::Status(response) => response.status,
            Self::Invalid(_) => 400,
        }
    }

    /// The backend-supplied message, if it sent one.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Status(response) => response.message.as_deref().filter(|m| !m.is_empty()),
            Self::Transport(_) | Self::Invalid(_) => None,
        }
    }

    /// Description of a transport failure.
    #[must_use]
    pub fn transport_message(&self) -> Option<String> {
        match self {
            Self::Transport(e) => Some(e.to_string()),
            Self::Status(_) | Self::Invalid(_) => None,
        }
    }

    /// Per-field messages, from the backend or from client-side checks.
    #[must_use]
    pub fn field_errors(&self) -> ValidationErrors {
        match self {
            Self::Status(response) => response
                .errors
                .iter()
                .flatten()
                .filter(|e| !e.field.is_empty())
                .map(|e| FieldError::new(&e.field, &e.default_message))
                .collect(),
            Self::Invalid(errors) => errors.clone(),
            Self::Transport(_) => ValidationErrors::new(),
        }
    }

    /// Whether the backend reported 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status(r) if r.status == 404)
    }

    /// Whether the backend reported 401.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status(r) if r.status == 401)
    }
}
