//! PKCE (Proof Key for Code Exchange) utilities
//!
//! Implements RFC 7636 for the authorization-code flow: the verifier is kept
//! secret until token exchange, the S256 challenge goes into the
//! authorization request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Generate a code verifier: 32 random bytes, base64url-encoded (43 chars).
///
/// Per RFC 7636, verifiers must be 43-128 characters from the unreserved
/// set.
pub fn generate_code_verifier() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Generate the S256 challenge for a verifier:
/// `BASE64URL(SHA256(ASCII(code_verifier)))`
pub fn generate_code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Generate a random state value for CSRF protection
pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// A PKCE verifier/challenge pair for one authorization request
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// The secret verifier, sent during token exchange
    pub code_verifier: String,

    /// The S256 challenge, sent in the authorization request
    pub code_challenge: String,
}

impl PkceChallenge {
    /// Generate a fresh verifier/challenge pair
    pub fn generate() -> Self {
        let code_verifier = generate_code_verifier();
        let code_challenge = generate_code_challenge(&code_verifier);
        Self { code_verifier, code_challenge }
    }

    /// The challenge method sent alongside the challenge
    pub const fn challenge_method() -> &'static str {
        "S256"
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for pkce.
    use super::*;

    /// Validates verifier format per RFC 7636.
    ///
    /// Assertions:
    /// - Confirms length bounds and the unreserved character set.
    /// - Confirms two verifiers differ.
    #[test]
    fn test_verifier_format() {
        let verifier = generate_code_verifier();
        assert!(verifier.len() >= 43 && verifier.len() <= 128);
        assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(verifier, generate_code_verifier());
    }

    /// Validates the S256 challenge construction.
    ///
    /// Assertions:
    /// - Confirms the challenge of a known verifier matches the RFC 7636
    ///   appendix example.
    #[test]
    fn test_challenge_matches_rfc_example() {
        let challenge = generate_code_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    /// Validates `PkceChallenge::generate` wiring.
    ///
    /// Assertions:
    /// - Confirms the pair is internally consistent and the method is S256.
    #[test]
    fn test_challenge_pair_consistency() {
        let pkce = PkceChallenge::generate();
        assert_eq!(pkce.code_challenge, generate_code_challenge(&pkce.code_verifier));
        assert_eq!(PkceChallenge::challenge_method(), "S256");
    }

    /// Validates state generation.
    ///
    /// Assertions:
    /// - Confirms states are long enough and unique.
    #[test]
    fn test_state_generation() {
        let state = generate_state();
        assert!(state.len() >= 32);
        assert_ne!(state, generate_state());
    }
}
