//! OAuth2 client
//!
//! [`OAuth2Client`] owns the network side of the token lifecycle: it
//! resolves discovery metadata and JWKS through per-client coalescing
//! orchestrators (one fetch shared by all concurrent callers, successes
//! pinned in memory), mints tokens, and runs every ID-token-bearing response
//! through the validation pipeline before anyone sees it.
//!
//! A single token request moves through `Requesting → Responded → Validating
//! → Valid`; any failed edge surfaces as a typed error, never a panic.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use aegis_foundation::{CoalescingOrchestrator, Jwks, Jwt};

use crate::config::ClientConfiguration;
use crate::endpoints::{EndpointsFactory, OidcEndpoints};
use crate::error::{http_response_error, OAuth2Error, OAuth2Result};
use crate::events::AuthEvent;
use crate::pkce::PkceChallenge;
use crate::token::{Token, TokenResponse};
use crate::validator::{ValidationError, ValidationParameters};

type EndpointsCacheResult = OAuth2Result<Arc<OidcEndpoints>>;
type JwksCacheResult = OAuth2Result<Arc<Jwks>>;

/// Parameters for exchanging an authorization code (with PKCE)
#[derive(Debug, Clone)]
pub struct AuthorizationCodeRequest {
    /// The authorization code from the redirect callback
    pub code: String,

    /// The PKCE verifier paired with the challenge sent at authorization
    pub code_verifier: String,

    /// The redirect URI used in the authorization request
    pub redirect_uri: String,

    /// The nonce sent in the authorization request, when one was used
    pub nonce: Option<String>,
}

/// Introspection response: `active` plus whatever claims the server returned
#[derive(Debug, Clone, Deserialize)]
pub struct TokenIntrospectionInfo {
    /// Whether the introspected token is active
    pub active: bool,

    /// The remaining response claims
    #[serde(flatten)]
    pub claims: serde_json::Map<String, serde_json::Value>,
}

/// Claims returned by the userinfo endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(flatten)]
    claims: serde_json::Map<String, serde_json::Value>,
}

impl UserInfo {
    /// Look up a string claim by name
    pub fn string_claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).and_then(serde_json::Value::as_str)
    }

    /// Deserialize the claims into a typed structure
    pub fn claims<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(self.claims.clone()))
    }
}

/// OIDC/OAuth2 client bound to one authorization server.
///
/// Cheap to clone; clones share the configuration and both caches.
#[derive(Clone)]
pub struct OAuth2Client {
    configuration: Arc<ClientConfiguration>,
    endpoints: Arc<CoalescingOrchestrator<EndpointsCacheResult>>,
    jwks: Arc<CoalescingOrchestrator<JwksCacheResult>>,
}

impl OAuth2Client {
    /// Create a client from its configuration
    pub fn new(configuration: ClientConfiguration) -> Self {
        let configuration = Arc::new(configuration);

        let factory = Arc::new(EndpointsFactory::new(
            configuration.http_client().clone(),
            configuration.cache(),
            configuration.discovery_url().clone(),
        ));
        let endpoints = Arc::new(CoalescingOrchestrator::new(
            move || {
                let factory = Arc::clone(&factory);
                async move { factory.get().await }
            },
            Result::is_ok,
        ));

        let jwks = {
            let configuration = Arc::clone(&configuration);
            let endpoints = Arc::clone(&endpoints);
            Arc::new(CoalescingOrchestrator::new(
                move || {
                    let configuration = Arc::clone(&configuration);
                    let endpoints = Arc::clone(&endpoints);
                    async move { fetch_jwks(configuration, endpoints).await }
                },
                Result::is_ok,
            ))
        };

        Self { configuration, endpoints, jwks }
    }

    /// The client's configuration
    pub fn configuration(&self) -> &ClientConfiguration {
        &self.configuration
    }

    /// Resolve the OIDC endpoints (cache → coalesced network fetch)
    pub async fn endpoints(&self) -> OAuth2Result<Arc<OidcEndpoints>> {
        self.endpoints.get().await
    }

    /// Fetch the authorization server's signing keys (coalesced, cached on
    /// success only)
    pub async fn jwks(&self) -> OAuth2Result<Arc<Jwks>> {
        self.jwks.get().await
    }

    /// Build the authorization URL for a browser-based login.
    ///
    /// # Errors
    /// Returns [`OAuth2Error::EndpointsNotAvailable`] when discovery
    /// advertises no authorization endpoint.
    pub async fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        pkce: &PkceChallenge,
        nonce: Option<&str>,
    ) -> OAuth2Result<String> {
        let endpoints = self.endpoints.get().await?;
        let authorization_endpoint = endpoints
            .authorization_endpoint
            .clone()
            .ok_or(OAuth2Error::EndpointsNotAvailable)?;

        let mut parameters = vec![
            ("response_type", "code".to_string()),
            ("client_id", self.configuration.client_id().to_string()),
            ("redirect_uri", redirect_uri.to_string()),
            ("scope", self.configuration.scope_string()),
            ("state", state.to_string()),
            ("code_challenge", pkce.code_challenge.clone()),
            ("code_challenge_method", PkceChallenge::challenge_method().to_string()),
        ];
        if let Some(nonce) = nonce {
            parameters.push(("nonce", nonce.to_string()));
        }

        let query = parameters
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        Ok(format!("{authorization_endpoint}?{query}"))
    }

    /// Exchange an authorization code for tokens (PKCE).
    ///
    /// The nonce supplied at authorization is validated against the ID
    /// token's `nonce` claim.
    pub async fn exchange_authorization_code(
        &self,
        request: AuthorizationCodeRequest,
    ) -> OAuth2Result<Token> {
        let form = vec![
            ("grant_type", "authorization_code".to_string()),
            ("client_id", self.configuration.client_id().to_string()),
            ("code", request.code.clone()),
            ("redirect_uri", request.redirect_uri.clone()),
            ("code_verifier", request.code_verifier.clone()),
        ];
        self.token_request(form, request.nonce.as_deref()).await
    }

    /// Mint a replacement token from a refresh token.
    ///
    /// `scope` defaults to the server's prior grant when `None`.
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        scope: Option<&str>,
    ) -> OAuth2Result<Token> {
        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("client_id", self.configuration.client_id().to_string()),
            ("refresh_token", refresh_token.to_string()),
        ];
        if let Some(scope) = scope {
            form.push(("scope", scope.to_string()));
        }
        self.token_request(form, None).await
    }

    /// Exchange an ID token + device secret for tokens (RFC 8693).
    ///
    /// Used for cross-device SSO; the device secret acts as the actor token.
    pub async fn token_exchange(
        &self,
        id_token: &str,
        device_secret: &str,
        audience: Option<&str>,
    ) -> OAuth2Result<Token> {
        let mut form = vec![
            ("grant_type", "urn:ietf:params:oauth:grant-type:token-exchange".to_string()),
            ("client_id", self.configuration.client_id().to_string()),
            ("subject_token", id_token.to_string()),
            ("subject_token_type", "urn:ietf:params:oauth:token-type:id_token".to_string()),
            ("actor_token", device_secret.to_string()),
            ("actor_token_type", "urn:x-oath:params:oauth:token-type:device-secret".to_string()),
            ("scope", self.configuration.scope_string()),
        ];
        if let Some(audience) = audience {
            form.push(("audience", audience.to_string()));
        }
        self.token_request(form, None).await
    }

    /// Introspect a token (RFC 7662).
    ///
    /// # Errors
    /// Returns [`OAuth2Error::EndpointsNotAvailable`] when discovery
    /// advertises no introspection endpoint.
    pub async fn introspect_token(
        &self,
        token_type_hint: &str,
        token: &str,
    ) -> OAuth2Result<TokenIntrospectionInfo> {
        let endpoints = self.endpoints.get().await?;
        let url = endpoints
            .introspection_endpoint
            .clone()
            .ok_or(OAuth2Error::EndpointsNotAvailable)?;
        let form = vec![
            ("client_id", self.configuration.client_id().to_string()),
            ("token", token.to_string()),
            ("token_type_hint", token_type_hint.to_string()),
        ];
        let body = self.post_form(url, &form).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Revoke a token (RFC 7009).
    ///
    /// # Errors
    /// Returns [`OAuth2Error::EndpointsNotAvailable`] when discovery
    /// advertises no revocation endpoint.
    pub async fn revoke_token(&self, token: &str) -> OAuth2Result<()> {
        let endpoints = self.endpoints.get().await?;
        let url = endpoints
            .revocation_endpoint
            .clone()
            .ok_or(OAuth2Error::EndpointsNotAvailable)?;
        let form = vec![
            ("client_id", self.configuration.client_id().to_string()),
            ("token", token.to_string()),
        ];
        self.post_form(url, &form).await?;
        info!("token revoked");
        Ok(())
    }

    /// Fetch the userinfo claims for an access token.
    ///
    /// # Errors
    /// Returns [`OAuth2Error::EndpointsNotAvailable`] when discovery
    /// advertises no userinfo endpoint.
    pub async fn get_user_info(&self, access_token: &str) -> OAuth2Result<UserInfo> {
        let endpoints = self.endpoints.get().await?;
        let url =
            endpoints.userinfo_endpoint.clone().ok_or(OAuth2Error::EndpointsNotAvailable)?;

        let response = self
            .configuration
            .http_client()
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(http_response_error(status.as_u16(), &body).into());
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// POST a form and return the body of a 2xx response
    async fn post_form(&self, url: Url, form: &[(&str, String)]) -> OAuth2Result<String> {
        let response = self.configuration.http_client().post(url).form(form).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(http_response_error(status.as_u16(), &body).into())
        }
    }

    /// Perform a token-endpoint call and validate the response.
    ///
    /// The JWKS fetch and the token HTTP call are independent, so when
    /// discovery advertises a `jwks_uri` they run concurrently; validation
    /// awaits both.
    async fn token_request(
        &self,
        form: Vec<(&'static str, String)>,
        nonce: Option<&str>,
    ) -> OAuth2Result<Token> {
        let endpoints = self.endpoints.get().await?;
        let http = self.configuration.http_client().clone();
        let token_endpoint = endpoints.token_endpoint.clone();

        debug!(%token_endpoint, "requesting tokens");
        let token_call = async move {
            let response = http.post(token_endpoint).form(&form).send().await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(OAuth2Error::from(http_response_error(status.as_u16(), &body)));
            }
            Ok(serde_json::from_str::<TokenResponse>(&body)?)
        };

        let (response, jwks) = if endpoints.jwks_uri.is_some() {
            let (response, jwks) = tokio::join!(token_call, self.jwks.get());
            (response?, Some(jwks))
        } else {
            (token_call.await?, None)
        };

        let token = self.validate_token_response(response, jwks, nonce, &endpoints)?;
        info!("token request succeeded");
        self.configuration.events().send(&AuthEvent::TokenCreated(token.clone()));
        Ok(token)
    }

    /// Run the validation pipeline over a token-endpoint response.
    ///
    /// No ID token means no validation. Otherwise: signature (when JWKS were
    /// fetchable) → ID-token claims → `at_hash` → `ds_hash`, failing fast.
    fn validate_token_response(
        &self,
        response: TokenResponse,
        jwks: Option<JwksCacheResult>,
        nonce: Option<&str>,
        endpoints: &OidcEndpoints,
    ) -> OAuth2Result<Token> {
        let configuration = &self.configuration;
        let token = Token::from_response(response, configuration.clock().as_ref());
        let Some(raw_id_token) = token.id_token.as_deref() else {
            return Ok(token);
        };

        let id_token =
            Jwt::parse(raw_id_token).map_err(|err| ValidationError::MalformedJwt(err.to_string()))?;

        if let Some(jwks) = jwks {
            let jwks = jwks.map_err(|err| ValidationError::JwksUnavailable(Box::new(err)))?;
            jwks.verify(&id_token).map_err(ValidationError::from)?;
        }

        let parameters = ValidationParameters {
            client_id: configuration.client_id(),
            issuer: &endpoints.issuer,
            clock: configuration.clock().as_ref(),
            issued_at_grace_period_seconds: configuration.issued_at_grace_period_seconds(),
            nonce,
        };
        configuration
            .id_token_validator()
            .validate(&id_token, &parameters)
            .map_err(ValidationError::from)?;
        configuration
            .access_token_validator()
            .validate(&id_token, &token.access_token)
            .map_err(ValidationError::from)?;
        if let Some(device_secret) = token.device_secret.as_deref() {
            configuration
                .device_secret_validator()
                .validate(&id_token, device_secret)
                .map_err(ValidationError::from)?;
        }

        Ok(token)
    }
}

/// Fetch the JWKS document advertised by discovery.
///
/// Runs inside the JWKS orchestrator's factory; errors are returned (and not
/// cached) so the next caller retries.
async fn fetch_jwks(
    configuration: Arc<ClientConfiguration>,
    endpoints: Arc<CoalescingOrchestrator<EndpointsCacheResult>>,
) -> JwksCacheResult {
    let endpoints = endpoints.get().await?;
    let mut url = endpoints.jwks_uri.clone().ok_or(OAuth2Error::EndpointsNotAvailable)?;
    url.query_pairs_mut().append_pair("client_id", configuration.client_id());

    debug!(%url, "fetching jwks");
    let response = configuration.http_client().get(url).send().await?;
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(http_response_error(status.as_u16(), &body).into());
    }
    let jwks: Jwks = serde_json::from_str(&body)?;
    Ok(Arc::new(jwks))
}
