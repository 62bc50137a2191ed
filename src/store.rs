//! Expiring key-value store
//!
//! A process-wide keyed container mapping string keys to untyped payloads
//! with an absolute expiry time. Expiration is lazy: a lookup compares the
//! entry's deadline against the current time and treats expired entries as
//! absent whether or not the background sweep has physically removed them
//! yet. The sweep is garbage collection only.
//!
//! The store is a cheap handle; cloning it shares the underlying map. All
//! synchronization happens here, behind a single `RwLock`.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::CacheConfig;

/// An untyped payload plus its expiry deadline.
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

struct StoreInner {
    entries: RwLock<HashMap<String, Entry>>,
    config: CacheConfig,
    shutdown_tx: watch::Sender<bool>,
}

/// Shared expiring key-value store.
///
/// Values are stored untyped; use [`TypedCache`](crate::TypedCache) for a
/// type-checked view over a single key. Construct one store per logical
/// cache domain and pass handles to it explicitly rather than relying on
/// process-global state, so tests get isolated stores.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create a store with the default configuration (10s TTL, 60s sweep).
    ///
    /// Must be called from within a Tokio runtime: the background sweep
    /// task is spawned here.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Create a store with the given configuration.
    ///
    /// A zero `sweep_interval` disables the background sweep entirely;
    /// lazy expiration on read still applies.
    pub fn with_config(config: CacheConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let store = Self {
            inner: Arc::new(StoreInner {
                entries: RwLock::new(HashMap::new()),
                config,
                shutdown_tx,
            }),
        };
        if !store.inner.config.sweep_interval.is_zero() {
            store.spawn_sweeper(shutdown_rx);
        }
        store
    }

    /// Spawn the periodic sweep task. The task holds only a weak reference
    /// to the store, so it winds down on its own once every handle is
    /// dropped; `shutdown` stops it promptly.
    fn spawn_sweeper(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so the
            // first sweep happens one full interval after construction.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown_rx.changed() => break,
                }
                let Some(inner) = weak.upgrade() else { break };
                let removed = Self::purge(&inner).await;
                if removed > 0 {
                    debug!("Sweep removed {} expired entries", removed);
                }
            }
            trace!("Sweep task stopped");
        });
    }

    /// Store `value` under `key` with the given TTL, overwriting any
    /// existing entry for that key.
    ///
    /// A zero `ttl` means "use the configured default TTL".
    pub async fn insert<V>(&self, key: impl Into<String>, value: V, ttl: Duration)
    where
        V: Any + Send + Sync,
    {
        let ttl = if ttl.is_zero() {
            self.inner.config.default_ttl
        } else {
            ttl
        };
        let key = key.into();
        let entry = Entry {
            value: Arc::new(value),
            expires_at: Instant::now() + ttl,
        };
        let mut entries = self.inner.entries.write().await;
        entries.insert(key, entry);
    }

    /// Store `value` under `key` with the configured default TTL.
    pub async fn insert_default<V>(&self, key: impl Into<String>, value: V)
    where
        V: Any + Send + Sync,
    {
        self.insert(key, value, self.inner.config.default_ttl).await;
    }

    /// Retrieve the payload stored under `key`, or `None` if the key is
    /// absent or its entry has expired.
    ///
    /// The liveness check happens here, under the same lock that guards
    /// inserts and deletes; it does not wait for the background sweep.
    pub async fn lookup(&self, key: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        let entries = self.inner.entries.read().await;
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            debug!("Cache miss (expired) for key: {}", key);
            return None;
        }
        trace!("Cache hit for key: {}", key);
        Some(Arc::clone(&entry.value))
    }

    /// Remove any entry for `key`; no-op if absent.
    pub async fn remove(&self, key: &str) {
        let mut entries = self.inner.entries.write().await;
        entries.remove(key);
    }

    /// Remove every entry, live or expired.
    pub async fn clear(&self) {
        let mut entries = self.inner.entries.write().await;
        entries.clear();
    }

    /// Physically remove all expired entries now, returning how many were
    /// dropped. The background sweep calls this on its interval.
    pub async fn purge_expired(&self) -> usize {
        Self::purge(&self.inner).await
    }

    async fn purge(inner: &StoreInner) -> usize {
        let now = Instant::now();
        let mut entries = inner.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of entries physically present, including expired entries the
    /// sweep has not removed yet.
    pub async fn entry_count(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    /// The TTL applied when an insert does not specify one.
    pub fn default_ttl(&self) -> Duration {
        self.inner.config.default_ttl
    }

    /// Stop the background sweep task. Entries remain readable; only the
    /// periodic physical cleanup stops. Intended for test teardown.
    pub fn shutdown(&self) {
        let _ = self.inner.shutdown_tx.send(true);
    }
}
