//! Access-token hash validation (`at_hash`)

use thiserror::Error;

use aegis_foundation::Jwt;

use super::{half_hash, AccessTokenValidator};

/// Error type for `at_hash` validation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessTokenValidationError {
    /// The ID token is not signed with RS256
    #[error("Unsupported algorithm")]
    UnsupportedAlgorithm,

    /// The computed hash does not match the claim
    #[error("ID Token at_hash didn't match the access token.")]
    HashMismatch,
}

/// Default [`AccessTokenValidator`].
///
/// `at_hash` is OPTIONAL for this flow shape, so an ID token without the
/// claim passes vacuously.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAccessTokenValidator;

impl AccessTokenValidator for DefaultAccessTokenValidator {
    fn validate(
        &self,
        id_token: &Jwt,
        access_token: &str,
    ) -> Result<(), AccessTokenValidationError> {
        let Some(expected) = id_token.string_claim("at_hash") else {
            return Ok(());
        };
        if id_token.algorithm() != "RS256" {
            return Err(AccessTokenValidationError::UnsupportedAlgorithm);
        }
        if half_hash(access_token) != expected {
            return Err(AccessTokenValidationError::HashMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for validator::access_token.
    use super::*;
    use crate::testing::fixtures;

    fn validate(raw_token: &str, access_token: &str) -> Result<(), AccessTokenValidationError> {
        let jwt = Jwt::parse(raw_token).unwrap();
        DefaultAccessTokenValidator.validate(&jwt, access_token)
    }

    /// Validates the matching-hash scenario.
    ///
    /// Assertions:
    /// - Ensures the fixture access token passes against its `at_hash`.
    #[test]
    fn test_matching_hash_passes() {
        assert_eq!(validate(fixtures::ID_TOKEN_VALID, fixtures::ACCESS_TOKEN), Ok(()));
    }

    /// Validates the tampered-hash scenario.
    ///
    /// Assertions:
    /// - Confirms the exact mismatch message.
    #[test]
    fn test_tampered_hash_fails() {
        let result = validate(fixtures::ID_TOKEN_TAMPERED_AT_HASH, fixtures::ACCESS_TOKEN);
        assert_eq!(result, Err(AccessTokenValidationError::HashMismatch));
        assert_eq!(
            result.unwrap_err().to_string(),
            "ID Token at_hash didn't match the access token."
        );
    }

    /// Validates the wrong-access-token scenario.
    ///
    /// Assertions:
    /// - Confirms a different access token no longer matches the claim.
    #[test]
    fn test_different_access_token_fails() {
        assert_eq!(
            validate(fixtures::ID_TOKEN_VALID, "some-other-access-token"),
            Err(AccessTokenValidationError::HashMismatch)
        );
    }

    /// Validates the absent-claim scenario.
    ///
    /// Assertions:
    /// - Ensures validation vacuously passes when `at_hash` is absent.
    #[test]
    fn test_absent_claim_passes() {
        assert_eq!(validate(fixtures::ID_TOKEN_NO_HASHES, "anything-at-all"), Ok(()));
    }

    /// Validates the algorithm guard.
    ///
    /// Assertions:
    /// - Confirms a non-RS256 token with an `at_hash` claim is rejected.
    #[test]
    fn test_non_rs256_fails() {
        let result = validate(fixtures::ID_TOKEN_HS256, fixtures::ACCESS_TOKEN);
        assert_eq!(result, Err(AccessTokenValidationError::UnsupportedAlgorithm));
        assert_eq!(result.unwrap_err().to_string(), "Unsupported algorithm");
    }
}
