// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The trait for near cache local storage.
//!
//! [`LocalTier`] is synchronous: invalidation events are applied from transport threads
//! that may not run inside an async runtime, and every operation is an in-memory map
//! access.

use std::sync::Arc;

use crate::VersionedValue;

/// A bounded local store with per-key atomic operations.
///
/// Implementations must make [`put_if_absent`](LocalTier::put_if_absent) atomic with
/// respect to concurrent [`remove`](LocalTier::remove) calls on the same key, and must
/// never hold more entries than their configured bound once pending maintenance has run.
///
/// Only `is_empty` and `evictions` have default implementations.
pub trait LocalTier<K, V>: Send + Sync {
    /// Returns the current value for `key`, if held.
    fn get(&self, key: &K) -> Option<VersionedValue<V>>;

    /// Inserts or replaces the value for `key`.
    fn put(&self, key: K, value: VersionedValue<V>);

    /// Inserts the value only if `key` is absent.
    ///
    /// Returns `true` if the value was inserted.
    fn put_if_absent(&self, key: K, value: VersionedValue<V>) -> bool;

    /// Removes the value for `key`.
    ///
    /// Returns `true` if a value was removed.
    fn remove(&self, key: &K) -> bool;

    /// Removes every entry.
    fn clear(&self);

    /// Returns the number of entries held.
    fn len(&self) -> u64;

    /// Returns `true` if no entries are held.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the keys currently held.
    ///
    /// The result is a weakly consistent snapshot under concurrent modification.
    fn keys(&self) -> Vec<K>;

    /// Returns how many entries were evicted to honour the bound.
    ///
    /// Returns `0` for implementations that do not track evictions.
    fn evictions(&self) -> u64 {
        0
    }
}

impl<K, V, T> LocalTier<K, V> for Box<T>
where
    T: LocalTier<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<VersionedValue<V>> {
        (**self).get(key)
    }

    fn put(&self, key: K, value: VersionedValue<V>) {
        (**self).put(key, value);
    }

    fn put_if_absent(&self, key: K, value: VersionedValue<V>) -> bool {
        (**self).put_if_absent(key, value)
    }

    fn remove(&self, key: &K) -> bool {
        (**self).remove(key)
    }

    fn clear(&self) {
        (**self).clear();
    }

    fn len(&self) -> u64 {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn keys(&self) -> Vec<K> {
        (**self).keys()
    }

    fn evictions(&self) -> u64 {
        (**self).evictions()
    }
}

impl<K, V, T> LocalTier<K, V> for Arc<T>
where
    T: LocalTier<K, V> + ?Sized,
{
    fn get(&self, key: &K) -> Option<VersionedValue<V>> {
        (**self).get(key)
    }

    fn put(&self, key: K, value: VersionedValue<V>) {
        (**self).put(key, value);
    }

    fn put_if_absent(&self, key: K, value: VersionedValue<V>) -> bool {
        (**self).put_if_absent(key, value)
    }

    fn remove(&self, key: &K) -> bool {
        (**self).remove(key)
    }

    fn clear(&self) {
        (**self).clear();
    }

    fn len(&self) -> u64 {
        (**self).len()
    }

    fn is_empty(&self) -> bool {
        (**self).is_empty()
    }

    fn keys(&self) -> Vec<K> {
        (**self).keys()
    }

    fn evictions(&self) -> u64 {
        (**self).evictions()
    }
}
