//! Credential data source
//!
//! Owns the authoritative list of [`Credential`]s for the process. The list
//! is populated exactly once from storage through a coalescing orchestrator:
//! all concurrent first callers await the same load, and a failed load is
//! retried by the next caller instead of being cached.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use aegis_foundation::CoalescingOrchestrator;

use crate::client::OAuth2Client;
use crate::credential::Credential;
use crate::error::{OAuth2Error, OAuth2Result};
use crate::events::AuthEvent;
use crate::storage::{StorageEntry, StorageError, TokenStorage};

type CredentialList = Arc<Mutex<Vec<Arc<Credential>>>>;
type ListResult = OAuth2Result<CredentialList>;

/// State shared between the data source handle and its credentials
pub(crate) struct DataSourceShared {
    client: OAuth2Client,
    storage: Arc<dyn TokenStorage>,
    list_flight: CoalescingOrchestrator<ListResult>,
}

impl DataSourceShared {
    /// Drop a removed credential from the in-memory list
    pub(crate) async fn detach(&self, identifier: &str) {
        let Ok(list) = self.list_flight.get().await else { return };
        let mut list = list.lock().await;
        list.retain(|credential| credential.identifier() != identifier);
        debug!(identifier, "credential detached");
    }
}

/// The process-wide collection of credentials backed by one storage.
///
/// Cheap to clone; clones share the list and its one-time load.
#[derive(Clone)]
pub struct CredentialDataSource {
    shared: Arc<DataSourceShared>,
}

impl CredentialDataSource {
    /// Create a data source over a client and a storage backend
    pub fn new(client: OAuth2Client, storage: Arc<dyn TokenStorage>) -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<DataSourceShared>| {
            let list_flight = {
                let weak = weak.clone();
                CoalescingOrchestrator::new(
                    move || {
                        let weak = weak.clone();
                        async move { load_credentials(weak).await }
                    },
                    Result::is_ok,
                )
            };
            DataSourceShared { client, storage, list_flight }
        });
        Self { shared }
    }

    /// All credentials, loading from storage on first access.
    ///
    /// Returns a snapshot; concurrent mutations do not invalidate it.
    pub async fn credentials(&self) -> OAuth2Result<Vec<Arc<Credential>>> {
        let list = self.shared.list_flight.get().await?;
        let list = list.lock().await;
        Ok(list.clone())
    }

    /// Find a credential by its storage identifier
    pub async fn credential_with_identifier(
        &self,
        identifier: &str,
    ) -> OAuth2Result<Option<Arc<Credential>>> {
        let list = self.shared.list_flight.get().await?;
        let list = list.lock().await;
        Ok(list.iter().find(|credential| credential.identifier() == identifier).cloned())
    }

    /// Create a credential, persisting an empty entry immediately.
    ///
    /// The entry reaches storage before the credential becomes visible in
    /// the list; a storage failure creates nothing.
    pub async fn create(&self, metadata: HashMap<String, String>) -> OAuth2Result<Arc<Credential>> {
        let list = self.shared.list_flight.get().await?;

        let identifier = Uuid::new_v4().to_string();
        let entry = StorageEntry { identifier: identifier.clone(), token: None, metadata };
        if let Err(err) = self.shared.storage.add(entry.clone()).await {
            self.shared
                .client
                .configuration()
                .events()
                .send(&AuthEvent::StorageAccessError(err.clone()));
            return Err(err.into());
        }

        let credential = Credential::from_entry(
            entry,
            self.shared.client.clone(),
            Arc::clone(&self.shared.storage),
            Some(Arc::downgrade(&self.shared)),
        );
        list.lock().await.push(Arc::clone(&credential));
        self.shared
            .client
            .configuration()
            .events()
            .send(&AuthEvent::CredentialCreated { identifier: identifier.clone() });
        info!(identifier, "credential created");
        Ok(credential)
    }
}

/// One-time load of all credentials from storage.
///
/// Runs inside the list orchestrator's factory; an error result is not
/// cached, so the next caller retries the load.
async fn load_credentials(weak: Weak<DataSourceShared>) -> ListResult {
    let Some(shared) = weak.upgrade() else {
        return Err(OAuth2Error::Storage(StorageError::Backend(
            "credential data source was dropped".to_string(),
        )));
    };

    debug!("loading credentials from storage");
    let entries = match shared.storage.entries().await {
        Ok(entries) => entries,
        Err(err) => {
            shared
                .client
                .configuration()
                .events()
                .send(&AuthEvent::StorageAccessError(err.clone()));
            return Err(err.into());
        }
    };

    let credentials: Vec<Arc<Credential>> = entries
        .into_iter()
        .map(|entry| {
            Credential::from_entry(
                entry,
                shared.client.clone(),
                Arc::clone(&shared.storage),
                Some(Arc::downgrade(&shared)),
            )
        })
        .collect();
    info!(count = credentials.len(), "credentials loaded");
    Ok(Arc::new(Mutex::new(credentials)))
}
