//! Cache-aside broker
//!
//! Wraps a caller-supplied fetch operation in the usual cache-aside
//! sequence: return the cached value when live, otherwise fetch, store the
//! result under the broker's key, and return it.
//!
//! Concurrent `exec` calls on the same absent key are NOT deduplicated.
//! Every caller that observes the miss runs its own fetch and the last
//! write wins; this keeps the broker stateless and the fetch path free of
//! per-key locks, at the cost of duplicate fetches under contention.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::{BoxError, CacheError, Store, TypedCache};
use crate::typed::Cacheable;

/// Trait for fetching a value from a backing source on cache miss.
///
/// Implementations can use a database, HTTP, or any other data source.
/// Closures passed to [`CacheBroker::exec`] cover the common case; this
/// trait is for callers that carry a backend object instead.
#[async_trait]
pub trait Fetch<T>: Send + Sync {
    /// Produce a fresh value, or fail with an error the broker will
    /// propagate unchanged.
    async fn fetch(&self) -> Result<T, BoxError>;
}

/// Cache-aside wrapper binding a key and a TTL to a shared [`Store`].
///
/// The broker owns no cached state of its own; every call goes through the
/// shared store via a typed view.
pub struct CacheBroker<T> {
    cache: TypedCache<T>,
    ttl: Duration,
}

impl<T: Cacheable> CacheBroker<T> {
    /// Create a broker for `key` that stores fetched values with `ttl`.
    pub fn new(store: Store, key: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache: TypedCache::new(store, key),
            ttl,
        }
    }

    /// Create a broker that stores fetched values with the store's
    /// default TTL.
    pub fn with_default_ttl(store: Store, key: impl Into<String>) -> Self {
        let ttl = store.default_ttl();
        Self::new(store, key, ttl)
    }

    /// Get the cached value for this broker's key, or compute it.
    ///
    /// On a live cache entry, `fetch` is not invoked. On a miss (absent,
    /// expired, or a type-mismatched entry left by a colliding key) the
    /// value is fetched, stored with the broker's TTL, and returned. A
    /// fetch failure is returned unchanged and nothing is stored, so the
    /// next call fetches again.
    pub async fn exec<F, Fut>(&self, fetch: F) -> Result<T, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        match self.cache.get().await {
            Ok(value) => return Ok(value),
            Err(CacheError::NotFound) => {
                debug!("Cache miss for key: {}", self.cache.key());
            }
            Err(CacheError::TypeMismatch) => {
                // A differently-typed view wrote this key; refetching
                // overwrites the colliding entry.
                debug!("Replacing mismatched entry for key: {}", self.cache.key());
            }
            Err(err) => return Err(err),
        }

        let value = fetch().await.map_err(CacheError::Fetch)?;
        self.cache.set(value.clone(), self.ttl).await;
        Ok(value)
    }

    /// Like [`exec`](Self::exec), but fetching through a [`Fetch`]
    /// implementation.
    pub async fn exec_with<F>(&self, fetcher: &F) -> Result<T, CacheError>
    where
        F: Fetch<T> + ?Sized,
    {
        self.exec(|| fetcher.fetch()).await
    }

    /// Remove the broker's key from the store. Administrative/test
    /// operation, not part of the request path.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// The key this broker is bound to.
    pub fn key(&self) -> &str {
        self.cache.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CacheConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Barrier;
    use tokio::time;

    fn store() -> Store {
        Store::with_config(CacheConfig::default().with_sweep_interval(Duration::ZERO))
    }

    #[tokio::test]
    async fn miss_invokes_fetch_and_returns_its_result() {
        let broker = CacheBroker::<u64>::new(store(), "stats", Duration::from_secs(10));
        let calls = Arc::new(AtomicUsize::new(0));

        let value = broker
            .exec(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                }
            })
            .await
            .expect("fetch succeeds");

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn hit_suppresses_fetch() {
        let broker = CacheBroker::<u64>::new(store(), "stats", Duration::from_secs(1000));
        broker.exec(|| async { Ok(7) }).await.unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let value = broker
            .exec(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(8)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_triggers_a_fresh_fetch() {
        let broker = CacheBroker::<u64>::new(store(), "stats", Duration::from_secs(1));
        broker.exec(|| async { Ok(1) }).await.unwrap();

        time::advance(Duration::from_secs(2)).await;

        let value = broker.exec(|| async { Ok(2) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn default_ttl_broker_uses_store_default() {
        let store = store();
        let broker = CacheBroker::<u64>::with_default_ttl(store, "stats");
        broker.exec(|| async { Ok(1) }).await.unwrap();

        time::advance(Duration::from_secs(9)).await;
        assert_eq!(broker.exec(|| async { Ok(2) }).await.unwrap(), 1);

        time::advance(Duration::from_secs(2)).await;
        assert_eq!(broker.exec(|| async { Ok(2) }).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_propagates_and_stores_nothing() {
        let store = store();
        let broker =
            CacheBroker::<u64>::new(store.clone(), "stats", Duration::from_secs(10));

        let err = broker
            .exec(|| async { Err("origin unavailable".into()) })
            .await
            .expect_err("fetch error should propagate");
        assert!(matches!(err, CacheError::Fetch(_)));
        assert!(err.to_string().contains("origin unavailable"));

        // Nothing was cached; a direct read still misses.
        let cache = TypedCache::<u64>::new(store.clone(), "stats");
        assert!(matches!(cache.get().await, Err(CacheError::NotFound)));
        assert_eq!(store.entry_count().await, 0);
    }

    #[tokio::test]
    async fn clear_cache_forces_the_next_exec_to_fetch() {
        let broker = CacheBroker::<u64>::new(store(), "stats", Duration::from_secs(1000));
        broker.exec(|| async { Ok(1) }).await.unwrap();

        broker.clear_cache().await;

        let calls = Arc::new(AtomicUsize::new(0));
        let value = broker
            .exec(|| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(2)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn mismatched_entry_is_refetched_and_overwritten() {
        let store = store();
        let strings = TypedCache::<String>::new(store.clone(), "stats");
        strings.set_default("colliding".to_owned()).await;

        let broker =
            CacheBroker::<u64>::new(store.clone(), "stats", Duration::from_secs(10));
        let value = broker.exec(|| async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);

        // The colliding entry has been healed in place.
        let numbers = TypedCache::<u64>::new(store, "stats");
        assert_eq!(numbers.get().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn exec_with_goes_through_the_fetch_trait() {
        struct Origin;

        #[async_trait]
        impl Fetch<u64> for Origin {
            async fn fetch(&self) -> Result<u64, BoxError> {
                Ok(99)
            }
        }

        let broker = CacheBroker::<u64>::new(store(), "stats", Duration::from_secs(10));
        assert_eq!(broker.exec_with(&Origin).await.unwrap(), 99);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_each_fetch_and_last_write_wins() {
        const TASKS: usize = 8;

        let store = store();
        let calls = Arc::new(AtomicUsize::new(0));
        // No task can store a result until every task has entered its
        // fetch, so all of them are guaranteed to observe the miss.
        let barrier = Arc::new(Barrier::new(TASKS));

        let mut handles = Vec::new();
        for i in 0..TASKS as u64 {
            let store = store.clone();
            let calls = Arc::clone(&calls);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                let broker =
                    CacheBroker::<u64>::new(store, "stats", Duration::from_secs(1000));
                broker
                    .exec(|| async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        barrier.wait().await;
                        Ok(i)
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        // Every caller fetched; nobody was deduplicated.
        assert_eq!(calls.load(Ordering::SeqCst), TASKS);
        for value in &results {
            assert!((*value as usize) < TASKS);
        }

        // The surviving entry is exactly one of the fetched values, never
        // a corrupted mix.
        let cache = TypedCache::<u64>::new(store, "stats");
        let stored = cache.get().await.unwrap();
        assert!((stored as usize) < TASKS);
    }
}
