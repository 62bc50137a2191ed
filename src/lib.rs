//! ttlcache - In-process TTL caching
//!
//! This library provides a "compute once, reuse until expiry" caching
//! facility built from three cooperating pieces:
//! - [`Store`]: an expiring key-value store holding untyped payloads under
//!   string keys, with per-entry TTL and a background sweep of expired
//!   entries
//! - [`TypedCache`]: a typed view over one store key, narrowing the untyped
//!   payload to a concrete value type and reporting `NotFound` /
//!   `TypeMismatch`
//! - [`CacheBroker`]: a cache-aside wrapper that collapses the
//!   lookup-miss-fetch-store sequence into a single `exec` call
//!
//! The cache supports:
//! - Per-entry TTLs with a configurable default
//! - Lazy expiration on read (authoritative) plus a periodic physical sweep
//! - Concurrent access from any number of tasks; the store is the single
//!   synchronization point
//! - Pluggable fetch backends via the [`Fetch`] trait or plain async
//!   closures
//!
//! Concurrent `exec` calls on the same absent key are NOT deduplicated:
//! every caller that observes a miss runs its own fetch and the last write
//! wins. Callers that need single-flight semantics must layer that on
//! themselves.

mod broker;
mod config;
mod error;
mod store;
mod typed;

pub use broker::{CacheBroker, Fetch};
pub use config::CacheConfig;
pub use error::{BoxError, CacheError};
pub use store::Store;
pub use typed::{Cacheable, TypedCache};

// Re-export async_trait for convenience
pub use async_trait::async_trait;
