// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory local tier implementation using moka.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use nearcache_tier::{Capacity, LocalTier, VersionedValue};
use thread_aware::{Arc, PerProcess, ThreadAware};

use crate::builder::InMemoryTierBuilder;

struct Inner<K, V> {
    cache: Cache<K, VersionedValue<V>>,
    evictions: std::sync::Arc<AtomicU64>,
}

impl<K, V> fmt::Debug for Inner<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inner")
            .field("name", &self.cache.name())
            .field("evictions", &self.evictions.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<K, V> Clone for Inner<K, V> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            evictions: std::sync::Arc::clone(&self.evictions),
        }
    }
}

/// A bounded in-memory local tier backed by moka.
///
/// Eviction is least recently used. Eviction bookkeeping runs lazily; [`len`](LocalTier::len)
/// runs it before counting, so the reported size never exceeds the bound.
///
/// # Examples
///
/// ```
/// use nearcache_memory::InMemoryTier;
/// use nearcache_tier::{LocalTier, Version, VersionedValue};
///
/// let tier = InMemoryTier::<String, i32>::with_capacity(2);
/// for (i, key) in ["a", "b", "c"].into_iter().enumerate() {
///     tier.put(key.to_string(), VersionedValue::new(i as i32, Version::new(1)));
/// }
///
/// assert!(tier.len() <= 2);
/// ```
#[derive(Debug, Clone, ThreadAware)]
pub struct InMemoryTier<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Inner<K, V>, PerProcess>,
}

impl<K, V> Default for InMemoryTier<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> InMemoryTier<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a new unbounded tier.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new tier holding at most `max_capacity` entries.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a new builder for configuring an in-memory tier.
    #[must_use]
    pub fn builder() -> InMemoryTierBuilder<K, V> {
        InMemoryTierBuilder::new()
    }

    /// Returns the configured bound.
    #[must_use]
    pub fn capacity(&self) -> Capacity {
        self.inner
            .cache
            .policy()
            .max_capacity()
            .map_or(Capacity::Unbounded, Capacity::Bounded)
    }

    pub(crate) fn from_builder(builder: &InMemoryTierBuilder<K, V>) -> Self {
        let evictions = std::sync::Arc::new(AtomicU64::new(0));
        let counter = std::sync::Arc::clone(&evictions);

        let mut moka_builder = Cache::builder()
            .eviction_policy(EvictionPolicy::lru())
            .eviction_listener(move |_key, _value, cause| {
                if cause == RemovalCause::Size {
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            });

        if let Some(max) = builder.capacity.bound() {
            moka_builder = moka_builder.max_capacity(max);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: Arc::from_unaware(Inner {
                cache: moka_builder.build(),
                evictions,
            }),
        }
    }
}

impl<K, V> LocalTier<K, V> for InMemoryTier<K, V>
where
    K: Clone + Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn get(&self, key: &K) -> Option<VersionedValue<V>> {
        self.inner.cache.get(key)
    }

    fn put(&self, key: K, value: VersionedValue<V>) {
        self.inner.cache.insert(key, value);
    }

    fn put_if_absent(&self, key: K, value: VersionedValue<V>) -> bool {
        self.inner.cache.entry(key).or_insert_with(|| value).is_fresh()
    }

    fn remove(&self, key: &K) -> bool {
        self.inner.cache.remove(key).is_some()
    }

    fn clear(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks();
    }

    fn len(&self) -> u64 {
        self.inner.cache.run_pending_tasks();
        self.inner.cache.entry_count()
    }

    fn keys(&self) -> Vec<K> {
        self.inner.cache.iter().map(|(key, _)| K::clone(&key)).collect()
    }

    fn evictions(&self) -> u64 {
        self.inner.evictions.load(Ordering::Relaxed)
    }
}
