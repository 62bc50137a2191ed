//! Typed accessor over a single store key
//!
//! The store holds untyped payloads; `TypedCache` narrows one key to a
//! concrete value type and turns the store's outcomes into the three-way
//! result callers care about: found, not found, or wrong type.

use std::any::Any;
use std::marker::PhantomData;
use std::time::Duration;

use tracing::debug;

use crate::{CacheError, Store};

/// Trait for values that can be cached
pub trait Cacheable: Any + Clone + Send + Sync {}
impl<T> Cacheable for T where T: Any + Clone + Send + Sync {}

/// A typed view over one key of a shared [`Store`].
///
/// The accessor is stateless beyond the key it is bound to and a reference
/// to the shared store; it never touches other keys. Two accessors bound to
/// the same key but different value types collide: whichever reads after
/// the other wrote sees [`CacheError::TypeMismatch`].
pub struct TypedCache<T> {
    store: Store,
    key: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Cacheable> TypedCache<T> {
    /// Bind a typed view to `key` on the given store.
    pub fn new(store: Store, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _marker: PhantomData,
        }
    }

    /// Retrieve the cached value for this key.
    ///
    /// Returns [`CacheError::NotFound`] when the store has no live entry
    /// and [`CacheError::TypeMismatch`] when the entry's payload is not a
    /// `T`.
    pub async fn get(&self) -> Result<T, CacheError> {
        let raw = self
            .store
            .lookup(&self.key)
            .await
            .ok_or(CacheError::NotFound)?;
        match raw.downcast::<T>() {
            Ok(value) => Ok((*value).clone()),
            Err(_) => {
                debug!("Type mismatch for key: {}", self.key);
                Err(CacheError::TypeMismatch)
            }
        }
    }

    /// Cache `value` under this key with the given TTL.
    /// A zero `ttl` means the store's default TTL.
    pub async fn set(&self, value: T, ttl: Duration) {
        self.store.insert(self.key.clone(), value, ttl).await;
    }

    /// Cache `value` under this key with the store's default TTL.
    pub async fn set_default(&self, value: T) {
        self.store.insert_default(self.key.clone(), value).await;
    }

    /// Remove this key's entry from the store.
    pub async fn clear(&self) {
        self.store.remove(&self.key).await;
    }

    /// The key this accessor is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }
}
