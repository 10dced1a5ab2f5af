//! OAuth 2.0 token types
//!
//! [`Token`] is the immutable result of a successful token-endpoint call.
//! "Updates" (device-secret preservation across refresh) build a new value;
//! nothing mutates in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aegis_foundation::Clock;

/// An issued token set with metadata.
///
/// Created only from a successful token-endpoint response via
/// [`Token::from_response`], which stamps `issued_at` from the configured
/// clock so expiry checks need no ambient time source. Equality is
/// full-field structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token type (`Bearer` for OAuth 2.0)
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    /// The access token
    pub access_token: String,

    /// Granted scopes (space-separated), when returned
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scope: Option<String>,

    /// Refresh token, when issued
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub refresh_token: Option<String>,

    /// ID token (JWT), when issued
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id_token: Option<String>,

    /// Device secret for cross-device SSO, when issued
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub device_secret: Option<String>,

    /// Issued token type from a token-exchange response, when present
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub issued_token_type: Option<String>,

    /// When the token-endpoint response was accepted (client clock)
    pub issued_at: DateTime<Utc>,
}

impl Token {
    /// Build a token from a token-endpoint response, stamping `issued_at`
    /// from the supplied clock.
    pub fn from_response(response: TokenResponse, clock: &dyn Clock) -> Self {
        Self {
            token_type: response.token_type,
            expires_in: response.expires_in,
            access_token: response.access_token,
            scope: response.scope,
            refresh_token: response.refresh_token,
            id_token: response.id_token,
            device_secret: response.device_secret,
            issued_token_type: response.issued_token_type,
            issued_at: clock.now(),
        }
    }

    /// Whether the access token's lifetime has elapsed per the given clock
    pub fn is_access_token_expired(&self, clock: &dyn Clock) -> bool {
        clock.now() >= self.issued_at + chrono::Duration::seconds(self.expires_in)
    }

    /// Return a token that falls back to the previous token's device secret.
    ///
    /// Authorization servers do not always re-issue device secrets on
    /// refresh; the prior secret stays valid and must survive the
    /// replacement.
    pub fn preserving_device_secret(mut self, previous: Option<&Self>) -> Self {
        if self.device_secret.is_none() {
            if let Some(previous) = previous {
                self.device_secret.clone_from(&previous.device_secret);
            }
        }
        self
    }
}

/// Token-endpoint response body (RFC 6749)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Token type (`Bearer`)
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    /// The access token
    pub access_token: String,

    /// Granted scopes, when returned
    #[serde(default)]
    pub scope: Option<String>,

    /// Refresh token, when issued
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// ID token, when issued
    #[serde(default)]
    pub id_token: Option<String>,

    /// Device secret, when issued
    #[serde(default)]
    pub device_secret: Option<String>,

    /// Issued token type (token exchange), when present
    #[serde(default)]
    pub issued_token_type: Option<String>,
}

#[cfg(test)]
mod tests {
    //! Unit tests for token.
    use aegis_foundation::testing::MockClock;

    use super::*;

    fn response(device_secret: Option<&str>) -> TokenResponse {
        TokenResponse {
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            access_token: "access".to_string(),
            scope: Some("openid offline_access".to_string()),
            refresh_token: Some("refresh".to_string()),
            id_token: None,
            device_secret: device_secret.map(ToOwned::to_owned),
            issued_token_type: None,
        }
    }

    /// Validates `Token::from_response` behavior for the issued-at stamping
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `issued_at` reads the injected clock, not the system time.
    /// - Confirms field-by-field equality semantics.
    #[test]
    fn test_from_response_stamps_clock_time() {
        let clock = MockClock::at_epoch(1_767_225_600);
        let token = Token::from_response(response(None), &clock);

        assert_eq!(token.issued_at.timestamp(), 1_767_225_600);
        assert_eq!(token, token.clone());

        let differing = Token { expires_in: 60, ..token.clone() };
        assert_ne!(token, differing);
    }

    /// Validates `Token::is_access_token_expired` behavior around the expiry
    /// boundary.
    ///
    /// Assertions:
    /// - Ensures the token is valid before expiry and expired at/after it.
    #[test]
    fn test_access_token_expiry() {
        let clock = MockClock::at_epoch(1_767_225_600);
        let token = Token::from_response(response(None), &clock);

        assert!(!token.is_access_token_expired(&clock));
        clock.advance_seconds(3599);
        assert!(!token.is_access_token_expired(&clock));
        clock.advance_seconds(1);
        assert!(token.is_access_token_expired(&clock));
    }

    /// Validates `Token::preserving_device_secret` behavior for refresh
    /// responses that omit the secret.
    ///
    /// Assertions:
    /// - Confirms the prior secret is carried into the replacement.
    /// - Confirms a re-issued secret is kept as is.
    #[test]
    fn test_device_secret_preservation() {
        let clock = MockClock::at_epoch(1_767_225_600);
        let previous = Token::from_response(response(Some("secret-1")), &clock);

        let replacement =
            Token::from_response(response(None), &clock).preserving_device_secret(Some(&previous));
        assert_eq!(replacement.device_secret.as_deref(), Some("secret-1"));

        let reissued = Token::from_response(response(Some("secret-2")), &clock)
            .preserving_device_secret(Some(&previous));
        assert_eq!(reissued.device_secret.as_deref(), Some("secret-2"));
    }

    /// Validates `TokenResponse` deserialization of a minimal wire body.
    ///
    /// Assertions:
    /// - Confirms optional fields default to `None`.
    #[test]
    fn test_minimal_response_deserializes() {
        let body = r#"{"token_type":"Bearer","expires_in":300,"access_token":"at"}"#;
        let response: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.access_token, "at");
        assert!(response.refresh_token.is_none());
        assert!(response.device_secret.is_none());
    }
}
