//! OIDC endpoint discovery
//!
//! Resolution prefers the configured [`Cache`] over the network: a cached
//! discovery document that still deserializes is used as is, anything else
//! falls through to a GET of the well-known URL. Successful responses are
//! written back to the cache verbatim. The factory itself is stateless; the
//! client wraps it in a coalescing orchestrator so concurrent resolutions
//! share one fetch and successes are pinned in memory.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;
use url::Url;

use aegis_foundation::Cache;

use crate::error::{http_response_error, OAuth2Result};

/// Endpoints resolved from an OIDC discovery document.
///
/// Immutable once resolved. Only the issuer and token endpoint are
/// mandatory; operations needing another endpoint fail with
/// [`crate::OAuth2Error::EndpointsNotAvailable`] when discovery omitted it.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcEndpoints {
    /// The issuer identifier; ID-token `iss` claims must match it
    pub issuer: Url,

    /// The token endpoint
    pub token_endpoint: Url,

    /// The authorization endpoint, when advertised
    #[serde(default)]
    pub authorization_endpoint: Option<Url>,

    /// The userinfo endpoint, when advertised
    #[serde(default)]
    pub userinfo_endpoint: Option<Url>,

    /// The JWKS endpoint, when advertised
    #[serde(default)]
    pub jwks_uri: Option<Url>,

    /// The introspection endpoint, when advertised
    #[serde(default)]
    pub introspection_endpoint: Option<Url>,

    /// The revocation endpoint, when advertised
    #[serde(default)]
    pub revocation_endpoint: Option<Url>,

    /// The RP-initiated-logout endpoint, when advertised
    #[serde(default)]
    pub end_session_endpoint: Option<Url>,

    /// The device-authorization endpoint, when advertised
    #[serde(default)]
    pub device_authorization_endpoint: Option<Url>,
}

/// Resolves [`OidcEndpoints`] for one discovery URL, cache first
pub struct EndpointsFactory {
    http: reqwest::Client,
    cache: Arc<dyn Cache>,
    discovery_url: Url,
}

impl EndpointsFactory {
    /// Create a factory for the given discovery URL
    pub fn new(http: reqwest::Client, cache: Arc<dyn Cache>, discovery_url: Url) -> Self {
        Self { http, cache, discovery_url }
    }

    fn cache_key(&self) -> String {
        format!("endpoints:{}", self.discovery_url)
    }

    /// Resolve the endpoints, preferring the cache over the network.
    ///
    /// A cached document that fails to deserialize is treated as a cache
    /// miss, not an error. Network failures and non-2xx statuses surface as
    /// typed errors; nothing is cached for them.
    pub async fn get(&self) -> OAuth2Result<Arc<OidcEndpoints>> {
        let key = self.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            match serde_json::from_str::<OidcEndpoints>(&cached) {
                Ok(endpoints) => {
                    debug!(discovery_url = %self.discovery_url, "discovery document served from cache");
                    return Ok(Arc::new(endpoints));
                }
                Err(err) => {
                    debug!(discovery_url = %self.discovery_url, "ignoring undecodable cached discovery document: {err}");
                }
            }
        }

        debug!(discovery_url = %self.discovery_url, "fetching discovery document");
        let response = self.http.get(self.discovery_url.clone()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(http_response_error(status.as_u16(), &body).into());
        }

        let endpoints: OidcEndpoints = serde_json::from_str(&body)?;
        self.cache.set(&key, body);
        Ok(Arc::new(endpoints))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for endpoints.
    use super::*;
    use crate::testing::fixtures;

    /// Validates `OidcEndpoints` deserialization of a full discovery
    /// document.
    ///
    /// Assertions:
    /// - Confirms required and optional endpoints decode.
    #[test]
    fn test_discovery_document_deserializes() {
        let endpoints: OidcEndpoints =
            serde_json::from_str(&fixtures::discovery_document("https://id.example.com")).unwrap();

        assert_eq!(endpoints.issuer.as_str(), fixtures::ISSUER);
        assert!(endpoints.jwks_uri.is_some());
        assert!(endpoints.introspection_endpoint.is_some());
        assert!(endpoints.device_authorization_endpoint.is_some());
    }

    /// Validates deserialization of a minimal document.
    ///
    /// Assertions:
    /// - Confirms absent optional endpoints read as `None`.
    /// - Confirms a document without a token endpoint is rejected.
    #[test]
    fn test_minimal_and_invalid_documents() {
        let minimal = r#"{"issuer":"https://id.example.com","token_endpoint":"https://id.example.com/token"}"#;
        let endpoints: OidcEndpoints = serde_json::from_str(minimal).unwrap();
        assert!(endpoints.jwks_uri.is_none());
        assert!(endpoints.userinfo_endpoint.is_none());

        let missing_token = r#"{"issuer":"https://id.example.com"}"#;
        assert!(serde_json::from_str::<OidcEndpoints>(missing_token).is_err());
    }
}
