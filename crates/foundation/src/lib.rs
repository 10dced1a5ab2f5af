//! Runtime primitives shared across the Aegis SDK crates.
//!
//! This crate has no OAuth knowledge. It provides the building blocks the
//! protocol layer is assembled from:
//!
//! - [`clock`]: injectable wall-clock time for testable token lifecycles
//! - [`coalesce`]: the single-flight async value cache
//!   ([`CoalescingOrchestrator`])
//! - [`cache`]: a pluggable string cache used for discovery documents
//! - [`jwt`]: compact-JWT parsing and JWKS-based RS256 signature verification
//! - [`testing`]: mock implementations for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod cache;
pub mod clock;
pub mod coalesce;
pub mod jwt;
pub mod testing;

// Re-export commonly used types for convenience
pub use cache::{Cache, MemoryCache};
pub use clock::{Clock, SystemClock};
pub use coalesce::CoalescingOrchestrator;
pub use jwt::{Jwk, Jwks, JwksError, Jwt, JwtParseError};
