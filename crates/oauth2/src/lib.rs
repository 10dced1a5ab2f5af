//! OIDC/OAuth2 client for the Aegis SDK.
//!
//! The crate is organized around the token lifecycle:
//!
//! - [`config`]: explicit, constructor-injected client configuration
//! - [`endpoints`]: OIDC discovery with cache-then-network resolution
//! - [`client`]: [`OAuth2Client`] for token minting, introspection,
//!   revocation, user info, and JWKS
//! - [`validator`]: the ID-token / access-token / device-secret validation
//!   pipeline
//! - [`token`]: the immutable [`Token`] value
//! - [`credential`] / [`data_source`]: persisted credentials with
//!   at-most-once-refresh guarantees
//! - [`storage`]: the pluggable persistence seam
//! - [`events`]: fire-and-forget observability hooks
//! - [`pkce`]: RFC 7636 challenge utilities for the authorization-code flow
//!
//! All public async operations return [`error::OAuth2Result`]; failures never
//! cross the API as panics.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod client;
pub mod config;
pub mod credential;
pub mod data_source;
pub mod endpoints;
pub mod error;
pub mod events;
pub mod pkce;
pub mod storage;
pub mod testing;
pub mod token;
pub mod validator;

// Re-export commonly used types for convenience
pub use client::{AuthorizationCodeRequest, OAuth2Client, TokenIntrospectionInfo, UserInfo};
pub use config::ClientConfiguration;
pub use credential::{Credential, RevokeTokenType};
pub use data_source::CredentialDataSource;
pub use endpoints::{EndpointsFactory, OidcEndpoints};
pub use error::{HttpResponseError, OAuth2Error, OAuth2Result, StateError};
pub use events::{AuthEvent, EventCoordinator, EventHandler};
pub use storage::{MemoryTokenStorage, StorageEntry, StorageError, TokenStorage};
pub use token::{Token, TokenResponse};
