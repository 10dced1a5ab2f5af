//! Time abstraction for testable token lifecycles
//!
//! Token expiry and `iat`/`exp` claim validation are all relative to "now".
//! Production code uses [`SystemClock`]; tests inject
//! [`crate::testing::MockClock`] to pin time to the instant their fixtures
//! were minted for.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time.
///
/// Implementations must be cheap to call; the SDK reads the clock on every
/// validation and expiry check.
pub trait Clock: Send + Sync {
    /// Get the current time (UTC)
    fn now(&self) -> DateTime<Utc>;

    /// Get seconds since the UNIX epoch
    fn epoch_seconds(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Implement Clock for Arc<T> where T: Clock for convenient sharing
impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
