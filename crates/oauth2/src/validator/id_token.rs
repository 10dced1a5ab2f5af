//! ID-token claims validation
//!
//! Implements the OIDC Core ID-token checks in a fixed order, failing fast
//! on the first violated rule. Signature verification happens separately
//! (before claims) in the client pipeline.

use url::Url;

use aegis_foundation::Jwt;
use thiserror::Error;

use super::{IdTokenValidator, ValidationParameters};

/// Error type for ID-token claim validation.
///
/// Display strings are stable API: sample apps render them directly and
/// tests assert on them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdTokenValidationError {
    /// `iss` does not match the resolved issuer
    #[error("Invalid issuer.")]
    InvalidIssuer,

    /// `aud` does not match the configured client id
    #[error("Invalid audience.")]
    InvalidAudience,

    /// The issuer is not an HTTPS URL
    #[error("Issuer must be an HTTPS URL.")]
    IssuerNotHttps,

    /// The token is not signed with RS256
    #[error("Invalid JWT algorithm.")]
    InvalidAlgorithm,

    /// `exp` is not in the future
    #[error("The current time MUST be before the time represented by the exp Claim.")]
    Expired,

    /// `iat` is too far from "now" in either direction
    #[error("Issued at time is not within the allowed threshold of now.")]
    IssuedAtThreshold,

    /// The nonce supplied to the flow does not match the `nonce` claim
    #[error("Nonce mismatch.")]
    NonceMismatch,

    /// A required claim is absent
    #[error("Required claim missing: {0}")]
    MissingClaim(&'static str),
}

/// Default [`IdTokenValidator`] implementing the OIDC Core rules
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIdTokenValidator;

impl IdTokenValidator for DefaultIdTokenValidator {
    fn validate(
        &self,
        id_token: &Jwt,
        parameters: &ValidationParameters<'_>,
    ) -> Result<(), IdTokenValidationError> {
        let issuer_claim = id_token
            .string_claim("iss")
            .ok_or(IdTokenValidationError::MissingClaim("iss"))?;
        // Compare parsed URLs so equivalent serializations (trailing slash)
        // do not produce spurious mismatches.
        let issuer_claim = Url::parse(issuer_claim)
            .map_err(|_| IdTokenValidationError::InvalidIssuer)?;
        if &issuer_claim != parameters.issuer {
            return Err(IdTokenValidationError::InvalidIssuer);
        }

        let audience = id_token
            .string_claim("aud")
            .ok_or(IdTokenValidationError::MissingClaim("aud"))?;
        if audience != parameters.client_id {
            return Err(IdTokenValidationError::InvalidAudience);
        }

        if issuer_claim.scheme() != "https" {
            return Err(IdTokenValidationError::IssuerNotHttps);
        }

        if id_token.algorithm() != "RS256" {
            return Err(IdTokenValidationError::InvalidAlgorithm);
        }

        let now = parameters.clock.epoch_seconds();

        let expiry = id_token
            .claim("exp")
            .and_then(serde_json::Value::as_i64)
            .ok_or(IdTokenValidationError::MissingClaim("exp"))?;
        if now >= expiry {
            return Err(IdTokenValidationError::Expired);
        }

        let issued_at = id_token
            .claim("iat")
            .and_then(serde_json::Value::as_i64)
            .ok_or(IdTokenValidationError::MissingClaim("iat"))?;
        if (now - issued_at).abs() > parameters.issued_at_grace_period_seconds {
            return Err(IdTokenValidationError::IssuedAtThreshold);
        }

        if let Some(expected_nonce) = parameters.nonce {
            if id_token.string_claim("nonce") != Some(expected_nonce) {
                return Err(IdTokenValidationError::NonceMismatch);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for validator::id_token.
    use aegis_foundation::testing::MockClock;

    use super::*;
    use crate::testing::fixtures;

    fn validate(
        raw_token: &str,
        clock: &MockClock,
        nonce: Option<&str>,
    ) -> Result<(), IdTokenValidationError> {
        let issuer = Url::parse(fixtures::ISSUER).unwrap();
        let parameters = ValidationParameters {
            client_id: fixtures::CLIENT_ID,
            issuer: &issuer,
            clock,
            issued_at_grace_period_seconds: 600,
            nonce,
        };
        let jwt = Jwt::parse(raw_token).unwrap();
        DefaultIdTokenValidator.validate(&jwt, &parameters)
    }

    /// Validates the full seven-rule pass for the valid fixture.
    ///
    /// Assertions:
    /// - Ensures validation succeeds with and without a supplied nonce.
    #[test]
    fn test_valid_token_passes() {
        let clock = MockClock::at_epoch(fixtures::FIXTURE_EPOCH);
        assert_eq!(validate(fixtures::ID_TOKEN_VALID, &clock, None), Ok(()));
        assert_eq!(validate(fixtures::ID_TOKEN_VALID, &clock, Some(fixtures::NONCE)), Ok(()));
    }

    /// Validates the issuer rule.
    ///
    /// Assertions:
    /// - Confirms a foreign issuer fails with "Invalid issuer.".
    #[test]
    fn test_wrong_issuer_fails() {
        let clock = MockClock::at_epoch(fixtures::FIXTURE_EPOCH);
        let result = validate(fixtures::ID_TOKEN_WRONG_ISSUER, &clock, None);
        assert_eq!(result, Err(IdTokenValidationError::InvalidIssuer));
        assert_eq!(result.unwrap_err().to_string(), "Invalid issuer.");
    }

    /// Validates the audience rule.
    ///
    /// Assertions:
    /// - Confirms a mismatched `aud` fails with "Invalid audience.".
    #[test]
    fn test_wrong_audience_fails() {
        let clock = MockClock::at_epoch(fixtures::FIXTURE_EPOCH);
        let result = validate(fixtures::ID_TOKEN_WRONG_AUDIENCE, &clock, None);
        assert_eq!(result, Err(IdTokenValidationError::InvalidAudience));
        assert_eq!(result.unwrap_err().to_string(), "Invalid audience.");
    }

    /// Validates the HTTPS-issuer rule.
    ///
    /// Assertions:
    /// - Confirms an `http` issuer fails once issuer equality holds.
    #[test]
    fn test_http_issuer_fails() {
        let clock = MockClock::at_epoch(fixtures::FIXTURE_EPOCH);
        let issuer = Url::parse(fixtures::HTTP_ISSUER).unwrap();
        let parameters = ValidationParameters {
            client_id: fixtures::CLIENT_ID,
            issuer: &issuer,
            clock: &clock,
            issued_at_grace_period_seconds: 600,
            nonce: None,
        };
        let jwt = Jwt::parse(fixtures::ID_TOKEN_HTTP_ISSUER).unwrap();
        assert_eq!(
            DefaultIdTokenValidator.validate(&jwt, &parameters),
            Err(IdTokenValidationError::IssuerNotHttps)
        );
    }

    /// Validates the algorithm rule.
    ///
    /// Assertions:
    /// - Confirms an HS256 token fails with "Invalid JWT algorithm.".
    #[test]
    fn test_non_rs256_fails() {
        let clock = MockClock::at_epoch(fixtures::FIXTURE_EPOCH);
        let result = validate(fixtures::ID_TOKEN_HS256, &clock, None);
        assert_eq!(result, Err(IdTokenValidationError::InvalidAlgorithm));
        assert_eq!(result.unwrap_err().to_string(), "Invalid JWT algorithm.");
    }

    /// Validates the expiry rule.
    ///
    /// Assertions:
    /// - Confirms a past `exp` fails with the exact OIDC message.
    /// - Confirms the valid token also fails once the clock passes its `exp`.
    #[test]
    fn test_expired_token_fails() {
        let clock = MockClock::at_epoch(fixtures::FIXTURE_EPOCH);
        let result = validate(fixtures::ID_TOKEN_EXPIRED, &clock, None);
        assert_eq!(result, Err(IdTokenValidationError::Expired));
        assert_eq!(
            result.unwrap_err().to_string(),
            "The current time MUST be before the time represented by the exp Claim."
        );

        clock.advance_seconds(7200);
        assert_eq!(
            validate(fixtures::ID_TOKEN_VALID, &clock, None),
            Err(IdTokenValidationError::Expired)
        );
    }

    /// Validates the issued-at grace window in both directions.
    ///
    /// Assertions:
    /// - Confirms a stale `iat` fails.
    /// - Confirms a future-dated `iat` (clock wound back) fails too.
    #[test]
    fn test_issued_at_threshold() {
        let clock = MockClock::at_epoch(fixtures::FIXTURE_EPOCH);
        assert_eq!(
            validate(fixtures::ID_TOKEN_STALE_IAT, &clock, None),
            Err(IdTokenValidationError::IssuedAtThreshold)
        );

        // Wind the clock far behind `iat`: too-far-future is rejected as well.
        clock.set_epoch(fixtures::FIXTURE_EPOCH - 3600);
        assert_eq!(
            validate(fixtures::ID_TOKEN_VALID, &clock, None),
            Err(IdTokenValidationError::IssuedAtThreshold)
        );
    }

    /// Validates the nonce rule.
    ///
    /// Assertions:
    /// - Confirms a mismatched supplied nonce fails with "Nonce mismatch.".
    #[test]
    fn test_nonce_mismatch_fails() {
        let clock = MockClock::at_epoch(fixtures::FIXTURE_EPOCH);
        let result = validate(fixtures::ID_TOKEN_VALID, &clock, Some("some-other-nonce"));
        assert_eq!(result, Err(IdTokenValidationError::NonceMismatch));
    }
}
