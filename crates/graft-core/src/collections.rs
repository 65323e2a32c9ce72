//! Shared collection abstractions used throughout graft-core.
//!
//! The default build uses `dashmap::DashMap` for concurrency.

use dashmap::DashMap;
use std::hash::Hash;

pub struct ConcurrentMap<K, V> {
    inner: DashMap<K, V>,
}

impl<K, V> Default for ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ConcurrentMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: dashmap::DashMap::new(),
        }
    }

    pub fn get_cloned(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.get(key).map(|entry| entry.value().clone())
    }

    /// Returns the value stored under `key`, building it with `init` when absent.
    ///
    /// The shard holding `key` stays locked while `init` runs, so concurrent
    /// callers racing on the same key observe a single build. `init` must not
    /// touch this map. The flag is `true` when this call performed the build.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, init: F) -> Result<(V, bool), E>
    where
        V: Clone,
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(existing) = self.get_cloned(&key) {
            return Ok((existing, false));
        }
        let mut built = false;
        let entry = self.inner.entry(key).or_try_insert_with(|| {
            built = true;
            init()
        })?;
        Ok((entry.value().clone(), built))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
