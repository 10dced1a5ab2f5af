//! Token validation pipeline
//!
//! Three independent validators run after every token-endpoint response that
//! carries an ID token: ID-token claims, `at_hash` against the access token,
//! and `ds_hash` against the device secret. Each is a single-method trait so
//! deployments can substitute their own policy; the defaults implement the
//! OIDC Core rules with exact, stable failure strings that callers (and
//! tests) match on.

mod access_token;
mod device_secret;
mod id_token;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

use aegis_foundation::jwt::JwksError;
use aegis_foundation::{Clock, Jwt};

pub use access_token::{AccessTokenValidationError, DefaultAccessTokenValidator};
pub use device_secret::{DefaultDeviceSecretValidator, DeviceSecretValidationError};
pub use id_token::{DefaultIdTokenValidator, IdTokenValidationError};

/// Context handed to validators for one token-endpoint response
pub struct ValidationParameters<'a> {
    /// The configured client id (`aud` must match)
    pub client_id: &'a str,

    /// The issuer resolved from discovery (`iss` must match)
    pub issuer: &'a Url,

    /// The configured clock
    pub clock: &'a dyn Clock,

    /// Allowed distance of `iat` from "now", in seconds
    pub issued_at_grace_period_seconds: i64,

    /// The nonce supplied to the flow, when one was used
    pub nonce: Option<&'a str>,
}

/// Validates ID-token claims against the client configuration
pub trait IdTokenValidator: Send + Sync {
    /// Validate the parsed ID token; the first failed rule wins.
    fn validate(
        &self,
        id_token: &Jwt,
        parameters: &ValidationParameters<'_>,
    ) -> Result<(), IdTokenValidationError>;
}

/// Validates the ID token's `at_hash` claim against the access token
pub trait AccessTokenValidator: Send + Sync {
    /// Validate the access token; vacuously passes when `at_hash` is absent.
    fn validate(
        &self,
        id_token: &Jwt,
        access_token: &str,
    ) -> Result<(), AccessTokenValidationError>;
}

/// Validates the ID token's `ds_hash` claim against the device secret
pub trait DeviceSecretValidator: Send + Sync {
    /// Validate the device secret; vacuously passes when `ds_hash` is absent.
    fn validate(
        &self,
        id_token: &Jwt,
        device_secret: &str,
    ) -> Result<(), DeviceSecretValidationError>;
}

/// A failure anywhere in the validation pipeline
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    /// The ID token could not be parsed at all
    #[error("Malformed JWT: {0}")]
    MalformedJwt(String),

    /// JWKS were required but could not be fetched
    #[error("Failed to fetch JWKS: {0}")]
    JwksUnavailable(Box<crate::error::OAuth2Error>),

    /// Signature verification failed
    #[error(transparent)]
    Signature(#[from] JwksError),

    /// An ID-token claim rule failed
    #[error(transparent)]
    IdToken(#[from] IdTokenValidationError),

    /// The `at_hash` check failed
    #[error(transparent)]
    AccessToken(#[from] AccessTokenValidationError),

    /// The `ds_hash` check failed
    #[error(transparent)]
    DeviceSecret(#[from] DeviceSecretValidationError),
}

/// Left-half SHA-256 hash, base64url-encoded without padding.
///
/// OIDC Core defines `at_hash`/`ds_hash` as the left half of the hash of the
/// ASCII value, encoded base64url. RS256 pins the hash to SHA-256.
pub(crate) fn half_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}

#[cfg(test)]
mod tests {
    //! Unit tests for validator::half_hash.
    use super::*;

    /// Validates `half_hash` behavior for the fixture access token.
    ///
    /// Assertions:
    /// - Confirms the digest matches the value minted into the JWT fixtures.
    #[test]
    fn test_half_hash_matches_fixture() {
        assert_eq!(half_hash("fixture-access-token"), "3qUyxvVgISjN0hflYCCZBg");
        assert_eq!(half_hash("fixture-device-secret"), "J9JF_u9is2flVsxGoHeQKw");
    }
}
