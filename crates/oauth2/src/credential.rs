//! Credentials: persisted token state with serialized refresh
//!
//! A [`Credential`] owns one current token plus metadata, mirrored to a
//! [`TokenStorage`] entry under its identifier. Concurrent refresh attempts
//! on the same credential are coalesced into a single network round trip;
//! every caller receives the identical result. In-memory state changes only
//! after the storage write succeeds.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use aegis_foundation::CoalescingOrchestrator;

use crate::client::OAuth2Client;
use crate::data_source::DataSourceShared;
use crate::error::{OAuth2Result, StateError};
use crate::events::AuthEvent;
use crate::storage::{StorageEntry, TokenStorage};
use crate::token::Token;

/// Which of a credential's tokens to revoke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeTokenType {
    /// Revoke the access token
    AccessToken,

    /// Revoke the refresh token
    RefreshToken,

    /// Revoke the device secret
    DeviceSecret,
}

/// Mutable state guarded by the credential's single lock
struct CredentialState {
    token: Option<Token>,
    metadata: HashMap<String, String>,
    entry_exists: bool,
    removed: bool,
}

/// Which storage primitive a `store_token` call resolves to
#[derive(Debug, Clone, Copy)]
enum StorageOperation {
    Add,
    Replace,
    Remove,
}

/// One signed-in session's tokens, persisted under a storage identifier.
///
/// Constructed by [`crate::CredentialDataSource`]; shared as `Arc`.
pub struct Credential {
    identifier: String,
    client: OAuth2Client,
    storage: Arc<dyn TokenStorage>,
    data_source: Option<Weak<DataSourceShared>>,
    state: Mutex<CredentialState>,
    refresh_flight: CoalescingOrchestrator<OAuth2Result<Token>>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("identifier", &self.identifier).finish_non_exhaustive()
    }
}

impl Credential {
    /// Build a credential around an existing (or freshly added) storage
    /// entry.
    ///
    /// The refresh orchestrator keeps nothing in memory: every completed
    /// refresh clears the flight so the next call refreshes again, while
    /// concurrent callers join the one in progress.
    pub(crate) fn from_entry(
        entry: StorageEntry,
        client: OAuth2Client,
        storage: Arc<dyn TokenStorage>,
        data_source: Option<Weak<DataSourceShared>>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let refresh_flight = {
                let weak = weak.clone();
                CoalescingOrchestrator::new(
                    move || {
                        let weak = weak.clone();
                        async move {
                            match weak.upgrade() {
                                Some(credential) => credential.perform_refresh().await,
                                None => Err(StateError::CredentialRemoved.into()),
                            }
                        }
                    },
                    |_| false,
                )
            };
            Self {
                identifier: entry.identifier,
                client,
                storage,
                data_source,
                state: Mutex::new(CredentialState {
                    token: entry.token,
                    metadata: entry.metadata,
                    entry_exists: true,
                    removed: false,
                }),
                refresh_flight,
            }
        })
    }

    /// The credential's storage identifier
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The client this credential mints tokens through
    pub fn client(&self) -> &OAuth2Client {
        &self.client
    }

    /// The current token, if one has been issued
    pub async fn token(&self) -> Option<Token> {
        self.state.lock().await.token.clone()
    }

    /// A defensive copy of the credential's metadata
    pub async fn metadata(&self) -> HashMap<String, String> {
        self.state.lock().await.metadata.clone()
    }

    /// Replace the stored token and metadata.
    ///
    /// The storage primitive is chosen from prior/new token nullity: a new
    /// token replaces the existing entry (or re-adds one that was dropped),
    /// clearing a present token removes the entry, and a `None → None` call
    /// updates the empty entry's metadata in place. In-memory fields mutate
    /// only after the storage call succeeds.
    pub async fn store_token(
        &self,
        token: Option<Token>,
        metadata: HashMap<String, String>,
    ) -> OAuth2Result<()> {
        let mut state = self.state.lock().await;
        self.store_token_locked(&mut state, token, metadata).await
    }

    async fn store_token_locked(
        &self,
        state: &mut CredentialState,
        token: Option<Token>,
        metadata: HashMap<String, String>,
    ) -> OAuth2Result<()> {
        if state.removed {
            return Err(StateError::CredentialRemoved.into());
        }

        let operation = if token.is_some() {
            if state.entry_exists {
                StorageOperation::Replace
            } else {
                StorageOperation::Add
            }
        } else if state.entry_exists {
            if state.token.is_some() {
                StorageOperation::Remove
            } else {
                StorageOperation::Replace
            }
        } else {
            StorageOperation::Add
        };

        let entry = StorageEntry {
            identifier: self.identifier.clone(),
            token: token.clone(),
            metadata: metadata.clone(),
        };
        let result = match operation {
            StorageOperation::Add => self.storage.add(entry).await,
            StorageOperation::Replace => self.storage.replace(entry).await,
            StorageOperation::Remove => self.storage.remove(&self.identifier).await,
        };
        if let Err(err) = result {
            warn!(identifier = %self.identifier, "storage access failed: {err}");
            self.client.configuration().events().send(&AuthEvent::StorageAccessError(err.clone()));
            return Err(err.into());
        }

        state.entry_exists = !matches!(operation, StorageOperation::Remove);
        state.token = token;
        state.metadata = metadata;
        debug!(identifier = %self.identifier, ?operation, "token stored");
        Ok(())
    }

    /// Refresh the token, joining any refresh already in flight.
    ///
    /// Fails fast with `"No refresh token."` when the current token carries
    /// none. On success the previous device secret survives a response that
    /// omits one, and the replacement is persisted before being returned.
    pub async fn refresh_token(&self) -> OAuth2Result<Token> {
        debug!(identifier = %self.identifier, "refresh requested");
        self.refresh_flight.get().await
    }

    async fn perform_refresh(self: Arc<Self>) -> OAuth2Result<Token> {
        let (refresh_token, scope) = {
            let state = self.state.lock().await;
            if state.removed {
                return Err(StateError::CredentialRemoved.into());
            }
            let token = state.token.as_ref().ok_or(StateError::NoToken)?;
            let refresh_token = token.refresh_token.clone().ok_or(StateError::NoRefreshToken)?;
            (refresh_token, token.scope.clone())
        };
        let scope = scope.unwrap_or_else(|| self.client.configuration().scope_string());

        let minted = self.client.refresh_token(&refresh_token, Some(&scope)).await?;

        let mut state = self.state.lock().await;
        let replacement = minted.preserving_device_secret(state.token.as_ref());
        let metadata = state.metadata.clone();
        self.store_token_locked(&mut state, Some(replacement.clone()), metadata).await?;
        info!(identifier = %self.identifier, "token refreshed");
        Ok(replacement)
    }

    /// Return a non-expired access token, refreshing first when needed.
    ///
    /// Emits [`AuthEvent::NoAccessTokenAvailable`] when neither the stored
    /// token nor a refresh can produce one.
    pub async fn get_valid_access_token(&self) -> OAuth2Result<String> {
        {
            let state = self.state.lock().await;
            if state.removed {
                return Err(StateError::CredentialRemoved.into());
            }
            if let Some(token) = &state.token {
                if !token.is_access_token_expired(self.client.configuration().clock().as_ref()) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        match self.refresh_token().await {
            Ok(token) => Ok(token.access_token),
            Err(err) => {
                warn!(identifier = %self.identifier, "no valid access token available: {err}");
                self.client.configuration().events().send(&AuthEvent::NoAccessTokenAvailable {
                    identifier: self.identifier.clone(),
                });
                Err(err)
            }
        }
    }

    /// Revoke one of the credential's tokens.
    ///
    /// Local preconditions (`"No token."`, `"No refresh token."`,
    /// `"No device secret."`) fail before any network call.
    pub async fn revoke_token(&self, token_type: RevokeTokenType) -> OAuth2Result<()> {
        let value = {
            let state = self.state.lock().await;
            if state.removed {
                return Err(StateError::CredentialRemoved.into());
            }
            let token = state.token.as_ref().ok_or(StateError::NoToken)?;
            match token_type {
                RevokeTokenType::AccessToken => token.access_token.clone(),
                RevokeTokenType::RefreshToken => {
                    token.refresh_token.clone().ok_or(StateError::NoRefreshToken)?
                }
                RevokeTokenType::DeviceSecret => {
                    token.device_secret.clone().ok_or(StateError::NoDeviceSecret)?
                }
            }
        };
        self.client.revoke_token(&value).await
    }

    /// Remove the credential from storage and its data source.
    ///
    /// Idempotent: a second call is a no-op.
    pub async fn remove(&self) -> OAuth2Result<()> {
        let mut state = self.state.lock().await;
        if state.removed {
            debug!(identifier = %self.identifier, "credential already removed");
            return Ok(());
        }
        if state.entry_exists {
            if let Err(err) = self.storage.remove(&self.identifier).await {
                self.client
                    .configuration()
                    .events()
                    .send(&AuthEvent::StorageAccessError(err.clone()));
                return Err(err.into());
            }
        }
        state.removed = true;
        state.entry_exists = false;
        state.token = None;
        drop(state);

        if let Some(data_source) = self.data_source.as_ref().and_then(Weak::upgrade) {
            data_source.detach(&self.identifier).await;
        }
        self.client
            .configuration()
            .events()
            .send(&AuthEvent::CredentialRemoved { identifier: self.identifier.clone() });
        info!(identifier = %self.identifier, "credential removed");
        Ok(())
    }
}
