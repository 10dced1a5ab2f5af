//! Client configuration
//!
//! Everything the client needs is injected here: identity (client id,
//! scopes, discovery URL) and infrastructure (HTTP client, clock, cache,
//! event coordinator, validators). There is no ambient global state; tests
//! substitute any seam they need.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use url::Url;

use aegis_foundation::{Cache, Clock, MemoryCache, SystemClock};

use crate::events::EventCoordinator;
use crate::validator::{
    AccessTokenValidator, DefaultAccessTokenValidator, DefaultDeviceSecretValidator,
    DefaultIdTokenValidator, DeviceSecretValidator, IdTokenValidator,
};

/// Default allowed distance of an ID token's `iat` claim from "now"
pub const DEFAULT_ISSUED_AT_GRACE_PERIOD_SECONDS: i64 = 600;

/// Configuration for an [`crate::OAuth2Client`]
#[derive(Clone)]
pub struct ClientConfiguration {
    client_id: String,
    discovery_url: Url,
    default_scopes: Vec<String>,
    issued_at_grace_period_seconds: i64,
    http: Client,
    clock: Arc<dyn Clock>,
    cache: Arc<dyn Cache>,
    events: Arc<EventCoordinator>,
    id_token_validator: Arc<dyn IdTokenValidator>,
    access_token_validator: Arc<dyn AccessTokenValidator>,
    device_secret_validator: Arc<dyn DeviceSecretValidator>,
}

impl ClientConfiguration {
    /// Create a configuration with production defaults.
    ///
    /// # Arguments
    /// * `client_id` - The OAuth client id registered with the authorization
    ///   server
    /// * `discovery_url` - Full URL of the well-known discovery document
    /// * `default_scopes` - Scopes requested when an operation supplies none
    pub fn new(client_id: String, discovery_url: Url, default_scopes: Vec<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client_id,
            discovery_url,
            default_scopes,
            issued_at_grace_period_seconds: DEFAULT_ISSUED_AT_GRACE_PERIOD_SECONDS,
            http,
            clock: Arc::new(SystemClock),
            cache: Arc::new(MemoryCache::new()),
            events: Arc::new(EventCoordinator::new()),
            id_token_validator: Arc::new(DefaultIdTokenValidator),
            access_token_validator: Arc::new(DefaultAccessTokenValidator),
            device_secret_validator: Arc::new(DefaultDeviceSecretValidator),
        }
    }

    /// Substitute the HTTP client
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Substitute the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Substitute the discovery-document cache
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    /// Substitute the event coordinator
    #[must_use]
    pub fn with_event_coordinator(mut self, events: Arc<EventCoordinator>) -> Self {
        self.events = events;
        self
    }

    /// Change the allowed `iat` distance from "now"
    #[must_use]
    pub fn with_issued_at_grace_period_seconds(mut self, seconds: i64) -> Self {
        self.issued_at_grace_period_seconds = seconds;
        self
    }

    /// Substitute the ID-token validator
    #[must_use]
    pub fn with_id_token_validator(mut self, validator: Arc<dyn IdTokenValidator>) -> Self {
        self.id_token_validator = validator;
        self
    }

    /// Substitute the access-token validator
    #[must_use]
    pub fn with_access_token_validator(mut self, validator: Arc<dyn AccessTokenValidator>) -> Self {
        self.access_token_validator = validator;
        self
    }

    /// Substitute the device-secret validator
    #[must_use]
    pub fn with_device_secret_validator(
        mut self,
        validator: Arc<dyn DeviceSecretValidator>,
    ) -> Self {
        self.device_secret_validator = validator;
        self
    }

    /// The configured client id
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The discovery-document URL
    pub fn discovery_url(&self) -> &Url {
        &self.discovery_url
    }

    /// The configured default scopes
    pub fn default_scopes(&self) -> &[String] {
        &self.default_scopes
    }

    /// Default scopes as the space-separated wire form
    pub fn scope_string(&self) -> String {
        self.default_scopes.join(" ")
    }

    /// The allowed `iat` distance from "now", in seconds
    pub fn issued_at_grace_period_seconds(&self) -> i64 {
        self.issued_at_grace_period_seconds
    }

    /// The HTTP client
    pub fn http_client(&self) -> &Client {
        &self.http
    }

    /// The clock
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The discovery-document cache
    pub fn cache(&self) -> Arc<dyn Cache> {
        Arc::clone(&self.cache)
    }

    /// The event coordinator
    pub fn events(&self) -> &EventCoordinator {
        &self.events
    }

    /// The ID-token validator
    pub fn id_token_validator(&self) -> &dyn IdTokenValidator {
        self.id_token_validator.as_ref()
    }

    /// The access-token validator
    pub fn access_token_validator(&self) -> &dyn AccessTokenValidator {
        self.access_token_validator.as_ref()
    }

    /// The device-secret validator
    pub fn device_secret_validator(&self) -> &dyn DeviceSecretValidator {
        self.device_secret_validator.as_ref()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for config.
    use super::*;

    /// Validates `ClientConfiguration::new` behavior for the defaults
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms identity fields and the scope string.
    /// - Confirms the issued-at grace default of 600 seconds.
    #[test]
    fn test_configuration_defaults() {
        let config = ClientConfiguration::new(
            "test-client-id".to_string(),
            Url::parse("https://id.example.com/.well-known/openid-configuration").unwrap(),
            vec!["openid".to_string(), "offline_access".to_string()],
        );

        assert_eq!(config.client_id(), "test-client-id");
        assert_eq!(config.scope_string(), "openid offline_access");
        assert_eq!(config.issued_at_grace_period_seconds(), 600);
    }

    /// Validates the builder-style overrides.
    ///
    /// Assertions:
    /// - Confirms the grace period override is visible through the getter.
    #[test]
    fn test_configuration_overrides() {
        let config = ClientConfiguration::new(
            "test-client-id".to_string(),
            Url::parse("https://id.example.com/.well-known/openid-configuration").unwrap(),
            vec![],
        )
        .with_issued_at_grace_period_seconds(30);

        assert_eq!(config.issued_at_grace_period_seconds(), 30);
        assert_eq!(config.scope_string(), "");
    }
}
