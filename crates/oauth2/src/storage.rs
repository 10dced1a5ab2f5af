//! Pluggable token persistence
//!
//! The SDK persists credentials through this seam; platform adapters
//! (encrypted preferences, SQLite, keychains) implement it outside the core.
//! `add`/`remove`/`replace` are the only mutation primitives, and each must
//! be atomic with respect to concurrent accessors of the same backing store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::token::Token;

/// One persisted credential: a token (absent until first issuance) plus
/// application metadata, keyed by the credential's storage identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    /// The credential's storage identifier
    pub identifier: String,

    /// The current token; `None` marks a not-yet-populated credential
    pub token: Option<Token>,

    /// Application metadata attached to the credential
    pub metadata: HashMap<String, String>,
}

/// Error type for storage operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// No entry exists for the identifier
    #[error("Storage entry not found: {0}")]
    NotFound(String),

    /// An entry already exists for the identifier
    #[error("Storage entry already exists: {0}")]
    AlreadyExists(String),

    /// The backing store failed
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Persistence seam for credentials.
///
/// Implementations accessing shared backing stores must hold a lock spanning
/// each read-modify-write so mutations are atomic for concurrent accessors.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// All persisted entries
    async fn entries(&self) -> Result<Vec<StorageEntry>, StorageError>;

    /// Persist a new entry; fails when the identifier is already present
    async fn add(&self, entry: StorageEntry) -> Result<(), StorageError>;

    /// Delete the entry for an identifier; absent entries are a no-op
    async fn remove(&self, identifier: &str) -> Result<(), StorageError>;

    /// Replace the entry matching `entry.identifier`
    async fn replace(&self, entry: StorageEntry) -> Result<(), StorageError>;
}

/// In-memory [`TokenStorage`].
///
/// The default store when no platform adapter is supplied, and the reference
/// implementation of the atomicity contract: one lock spans every
/// read-modify-write.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    entries: Mutex<Vec<StorageEntry>>,
}

impl MemoryTokenStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn entries(&self) -> Result<Vec<StorageEntry>, StorageError> {
        Ok(self.entries.lock().await.clone())
    }

    async fn add(&self, entry: StorageEntry) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        if entries.iter().any(|existing| existing.identifier == entry.identifier) {
            return Err(StorageError::AlreadyExists(entry.identifier));
        }
        entries.push(entry);
        Ok(())
    }

    async fn remove(&self, identifier: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        entries.retain(|existing| existing.identifier != identifier);
        Ok(())
    }

    async fn replace(&self, entry: StorageEntry) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        match entries.iter_mut().find(|existing| existing.identifier == entry.identifier) {
            Some(existing) => {
                *existing = entry;
                Ok(())
            }
            None => Err(StorageError::NotFound(entry.identifier)),
        }
    }
}
