//! Mock implementations for tests
//!
//! Provides deterministic stand-ins for the injectable seams of this crate.
//! Shipped in the library (not behind `cfg(test)`) so downstream crates can
//! drive their own tests with them.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::{Mutex, RwLock};

use crate::cache::Cache;
use crate::clock::Clock;

/// Mock clock for deterministic testing
///
/// Pins "now" to an explicit instant and lets tests advance it without real
/// delays. Fixtures minted for a fixed epoch validate reproducibly.
#[derive(Debug, Clone)]
pub struct MockClock {
    now: std::sync::Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a clock pinned to the given epoch second
    pub fn at_epoch(epoch_seconds: i64) -> Self {
        let now = Utc.timestamp_opt(epoch_seconds, 0).single().unwrap_or_else(Utc::now);
        Self { now: std::sync::Arc::new(Mutex::new(now)) }
    }

    /// Create a clock pinned to the current system time
    pub fn new() -> Self {
        Self { now: std::sync::Arc::new(Mutex::new(Utc::now())) }
    }

    /// Move the clock forward by whole seconds (negative moves it back)
    pub fn advance_seconds(&self, seconds: i64) {
        let mut now = self.now.lock();
        *now = *now + chrono::Duration::seconds(seconds);
    }

    /// Pin the clock to a specific epoch second
    pub fn set_epoch(&self, epoch_seconds: i64) {
        if let Some(instant) = Utc.timestamp_opt(epoch_seconds, 0).single() {
            *self.now.lock() = instant;
        }
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// In-memory [`Cache`] that records lookups for assertions
#[derive(Debug, Default)]
pub struct RecordingCache {
    entries: RwLock<HashMap<String, String>>,
    hits: Mutex<Vec<String>>,
    misses: Mutex<Vec<String>>,
}

impl RecordingCache {
    /// Create an empty recording cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry without recording a write
    pub fn seed(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
    }

    /// Number of lookups that found a value
    pub fn hit_count(&self) -> usize {
        self.hits.lock().len()
    }

    /// Number of lookups that found nothing
    pub fn miss_count(&self) -> usize {
        self.misses.lock().len()
    }

    /// The value currently stored under a key, if any
    pub fn stored(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }
}

impl Cache for RecordingCache {
    fn get(&self, key: &str) -> Option<String> {
        let value = self.entries.read().get(key).cloned();
        if value.is_some() {
            self.hits.lock().push(key.to_string());
        } else {
            self.misses.lock().push(key.to_string());
        }
        value
    }

    fn set(&self, key: &str, value: String) {
        self.entries.write().insert(key.to_string(), value);
    }
}
