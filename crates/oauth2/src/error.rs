//! Error types for the OAuth2 client
//!
//! The taxonomy separates what callers need to distinguish: transport
//! failures (retryable), HTTP error statuses (carry the server's OAuth2
//! error body when one was sent), validation failures (exact, stable
//! messages per rule), missing discovery endpoints (misconfiguration), and
//! local credential-state preconditions (never reach the network).
//!
//! Every variant is cheap to clone so results can flow through the
//! coalescing orchestrator to all joined callers.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::storage::StorageError;
use crate::validator::ValidationError;

/// Result alias for all public SDK operations
pub type OAuth2Result<T> = Result<T, OAuth2Error>;

/// Error type for OAuth2 client operations
#[derive(Debug, Clone, Error)]
pub enum OAuth2Error {
    /// Network transport failure (connect, timeout, I/O)
    #[error("HTTP request failed: {0}")]
    Transport(Arc<reqwest::Error>),

    /// Non-2xx response from the authorization server
    #[error(transparent)]
    HttpResponse(#[from] HttpResponseError),

    /// A response body could not be deserialized
    #[error("Failed to deserialize response: {0}")]
    Serialization(Arc<serde_json::Error>),

    /// Token validation failed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Discovery metadata lacks the endpoint required by the operation
    #[error("OIDC endpoints not available.")]
    EndpointsNotAvailable,

    /// Persistence failure from the token storage backend
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Local credential-state precondition failed
    #[error(transparent)]
    State(#[from] StateError),
}

impl From<reqwest::Error> for OAuth2Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Arc::new(err))
    }
}

impl From<serde_json::Error> for OAuth2Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(Arc::new(err))
    }
}

/// An HTTP error status from the authorization server.
///
/// Carries the standard OAuth2 error body fields when the server sent them;
/// both are `None` when the body was absent or unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseError {
    /// The HTTP status code
    pub status: u16,

    /// The `error` field of the OAuth2 error body, when present
    pub error: Option<String>,

    /// The `error_description` field of the OAuth2 error body, when present
    pub error_description: Option<String>,
}

impl fmt::Display for HttpResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{description}"),
            None => write!(f, "HTTP Error: status code - {}", self.status),
        }
    }
}

impl std::error::Error for HttpResponseError {}

/// Standard OAuth2 error body (RFC 6749 §5.2); both fields optional
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Build an [`HttpResponseError`] from a status code and response body.
///
/// Deserialization of the error body is best effort: an unreadable body
/// degrades to `None` fields rather than failing the whole call.
pub(crate) fn http_response_error(status: u16, body: &str) -> HttpResponseError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let (error, error_description) = match parsed {
        Some(body) => (body.error, body.error_description),
        None => (None, None),
    };
    HttpResponseError { status, error, error_description }
}

/// Local credential-state precondition failures.
///
/// These are raised before any network call is attempted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    /// The credential has no token yet
    #[error("No token.")]
    NoToken,

    /// The current token carries no refresh token
    #[error("No refresh token.")]
    NoRefreshToken,

    /// The current token carries no device secret
    #[error("No device secret.")]
    NoDeviceSecret,

    /// The credential was removed from its data source
    #[error("Credential is removed.")]
    CredentialRemoved,
}

#[cfg(test)]
mod tests {
    //! Unit tests for error.
    use super::*;

    /// Validates `http_response_error` behavior for the OAuth2 error body
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `error`/`error_description` are extracted.
    /// - Confirms the display string is the description.
    #[test]
    fn test_http_error_with_body() {
        let err = http_response_error(400, r#"{"error":"invalid_grant","error_description":"The refresh token is invalid."}"#);
        assert_eq!(err.error.as_deref(), Some("invalid_grant"));
        assert_eq!(err.error_description.as_deref(), Some("The refresh token is invalid."));
        assert_eq!(err.to_string(), "The refresh token is invalid.");
    }

    /// Validates `http_response_error` behavior for the missing body
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms both fields degrade to `None`.
    /// - Confirms the display string falls back to the status code form.
    #[test]
    fn test_http_error_without_body() {
        let err = http_response_error(503, "Service Unavailable");
        assert_eq!(err.error, None);
        assert_eq!(err.error_description, None);
        assert_eq!(err.to_string(), "HTTP Error: status code - 503");
    }

    /// Validates the state-error display strings callers match on.
    ///
    /// Assertions:
    /// - Confirms each precondition renders its exact message.
    #[test]
    fn test_state_error_messages() {
        assert_eq!(StateError::NoToken.to_string(), "No token.");
        assert_eq!(StateError::NoRefreshToken.to_string(), "No refresh token.");
        assert_eq!(StateError::NoDeviceSecret.to_string(), "No device secret.");
        assert_eq!(OAuth2Error::EndpointsNotAvailable.to_string(), "OIDC endpoints not available.");
    }
}
