//! Pluggable string cache
//!
//! The SDK caches OIDC discovery documents by URL so repeated client startup
//! does not hit the network. The backing store is deployment-specific
//! (encrypted preferences, a database row, plain memory), so the core only
//! consumes this minimal interface.

use std::collections::HashMap;

use parking_lot::RwLock;

/// Minimal key/value cache consumed by endpoint discovery.
///
/// Implementations must be safe for concurrent use. Values are opaque to the
/// SDK; discovery stores raw response bodies verbatim.
pub trait Cache: Send + Sync {
    /// Look up a previously stored value
    fn get(&self, key: &str) -> Option<String>;

    /// Store a value, replacing any previous entry for the key
    fn set(&self, key: &str, value: String);
}

/// In-memory [`Cache`] implementation.
///
/// The default cache when no platform-backed store is supplied. Entries live
/// for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries.write().insert(key.to_string(), value);
    }
}
