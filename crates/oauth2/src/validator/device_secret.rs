//! Device-secret hash validation (`ds_hash`)

use thiserror::Error;

use aegis_foundation::Jwt;

use super::{half_hash, DeviceSecretValidator};

/// Error type for `ds_hash` validation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceSecretValidationError {
    /// The ID token is not signed with RS256
    #[error("Unsupported algorithm")]
    UnsupportedAlgorithm,

    /// The computed hash does not match the claim
    #[error("ID Token ds_hash didn't match the device secret.")]
    HashMismatch,
}

/// Default [`DeviceSecretValidator`].
///
/// Same construction as the access-token check, against `ds_hash` and the
/// device secret; an ID token without the claim passes vacuously.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDeviceSecretValidator;

impl DeviceSecretValidator for DefaultDeviceSecretValidator {
    fn validate(
        &self,
        id_token: &Jwt,
        device_secret: &str,
    ) -> Result<(), DeviceSecretValidationError> {
        let Some(expected) = id_token.string_claim("ds_hash") else {
            return Ok(());
        };
        if id_token.algorithm() != "RS256" {
            return Err(DeviceSecretValidationError::UnsupportedAlgorithm);
        }
        if half_hash(device_secret) != expected {
            return Err(DeviceSecretValidationError::HashMismatch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for validator::device_secret.
    use super::*;
    use crate::testing::fixtures;

    fn validate(raw_token: &str, device_secret: &str) -> Result<(), DeviceSecretValidationError> {
        let jwt = Jwt::parse(raw_token).unwrap();
        DefaultDeviceSecretValidator.validate(&jwt, device_secret)
    }

    /// Validates the matching-hash scenario.
    ///
    /// Assertions:
    /// - Ensures the fixture device secret passes against its `ds_hash`.
    #[test]
    fn test_matching_hash_passes() {
        assert_eq!(validate(fixtures::ID_TOKEN_VALID, fixtures::DEVICE_SECRET), Ok(()));
    }

    /// Validates the mismatch scenario.
    ///
    /// Assertions:
    /// - Confirms the exact mismatch message.
    #[test]
    fn test_wrong_secret_fails() {
        let result = validate(fixtures::ID_TOKEN_VALID, "some-other-secret");
        assert_eq!(result, Err(DeviceSecretValidationError::HashMismatch));
        assert_eq!(
            result.unwrap_err().to_string(),
            "ID Token ds_hash didn't match the device secret."
        );
    }

    /// Validates the absent-claim scenario.
    ///
    /// Assertions:
    /// - Ensures validation vacuously passes when `ds_hash` is absent.
    #[test]
    fn test_absent_claim_passes() {
        assert_eq!(validate(fixtures::ID_TOKEN_NO_HASHES, "anything-at-all"), Ok(()));
    }
}
