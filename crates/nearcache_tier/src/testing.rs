// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock local tier for testing.
//!
//! This module provides [`MockLocalTier`], an unbounded in-memory tier that records every
//! operation so tests can verify exactly what a near cache did locally.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use crate::{LocalTier, VersionedValue};

/// Recorded local tier operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOp<K> {
    /// A lookup for the given key.
    Get(K),
    /// An unconditional insert for the given key.
    Put(K),
    /// A conditional insert for the given key, with whether it took effect.
    PutIfAbsent {
        /// The key that was offered.
        key: K,
        /// Whether the value was inserted.
        inserted: bool,
    },
    /// A removal for the given key.
    Remove(K),
    /// A clear of every entry.
    Clear,
}

/// A recording local tier for tests.
///
/// # Examples
///
/// ```
/// use nearcache_tier::testing::{LocalOp, MockLocalTier};
/// use nearcache_tier::{LocalTier, Version, VersionedValue};
///
/// let tier = MockLocalTier::<String, i32>::new();
/// tier.put_if_absent("k".to_string(), VersionedValue::new(1, Version::new(1)));
/// tier.remove(&"k".to_string());
///
/// assert_eq!(
///     tier.operations(),
///     vec![
///         LocalOp::PutIfAbsent { key: "k".to_string(), inserted: true },
///         LocalOp::Remove("k".to_string()),
///     ]
/// );
/// ```
pub struct MockLocalTier<K, V> {
    data: Arc<Mutex<HashMap<K, VersionedValue<V>>>>,
    operations: Arc<Mutex<Vec<LocalOp<K>>>>,
}

impl<K, V> std::fmt::Debug for MockLocalTier<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLocalTier")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .finish()
    }
}

impl<K, V> Clone for MockLocalTier<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
        }
    }
}

impl<K, V> Default for MockLocalTier<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockLocalTier<K, V> {
    /// Creates a new empty mock tier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<K, V> MockLocalTier<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Returns true if the tier holds the given key, without recording an operation.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<LocalOp<K>> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: LocalOp<K>) {
        self.operations.lock().push(op);
    }
}

impl<K, V> LocalTier<K, V> for MockLocalTier<K, V>
where
    K: Clone + Eq + Hash + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<VersionedValue<V>> {
        self.record(LocalOp::Get(key.clone()));
        self.data.lock().get(key).cloned()
    }

    fn put(&self, key: K, value: VersionedValue<V>) {
        self.record(LocalOp::Put(key.clone()));
        self.data.lock().insert(key, value);
    }

    fn put_if_absent(&self, key: K, value: VersionedValue<V>) -> bool {
        let inserted = {
            let mut data = self.data.lock();
            if data.contains_key(&key) {
                false
            } else {
                data.insert(key.clone(), value);
                true
            }
        };
        self.record(LocalOp::PutIfAbsent { key, inserted });
        inserted
    }

    fn remove(&self, key: &K) -> bool {
        self.record(LocalOp::Remove(key.clone()));
        self.data.lock().remove(key).is_some()
    }

    fn clear(&self) {
        self.record(LocalOp::Clear);
        self.data.lock().clear();
    }

    fn len(&self) -> u64 {
        self.data.lock().len() as u64
    }

    fn keys(&self) -> Vec<K> {
        self.data.lock().keys().cloned().collect()
    }
}
