// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The remote cache facade decorated by near caches.

use std::future::{Future, ready};

use crate::{Error, FilterSnapshot, Version, VersionedValue};

/// Operations of a remote, authoritative cache.
///
/// A near cache wraps an implementation of this trait and adds local read caching. The
/// remote side is the source of truth: every write is issued here, and every read miss is
/// served from here.
///
/// All methods except [`update_membership_filter`](RemoteCache::update_membership_filter)
/// are required. The default for that method completes immediately, which is the correct
/// behaviour for caches that have no near cache attached.
pub trait RemoteCache<K, V>: Send + Sync {
    /// Reads the current value and its version.
    fn get(&self, key: &K) -> impl Future<Output = Result<Option<VersionedValue<V>>, Error>> + Send;

    /// Writes a value unconditionally.
    fn put(&self, key: K, value: V) -> impl Future<Output = Result<(), Error>> + Send;

    /// Writes a value only if the key is absent on the server.
    ///
    /// Returns `true` if the write took effect.
    fn put_if_absent(&self, key: K, value: V) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Replaces the value only if the key is present on the server.
    ///
    /// Returns `true` if the write took effect.
    fn replace(&self, key: K, value: V) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Replaces the value only if the server version equals `expected`.
    ///
    /// Returns `true` if the write took effect.
    fn replace_with_version(
        &self,
        key: K,
        value: V,
        expected: Version,
    ) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Removes the key.
    ///
    /// Returns `true` if the key was present.
    fn remove(&self, key: &K) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Removes the key only if the server version equals `expected`.
    ///
    /// Returns `true` if the removal took effect.
    fn remove_with_version(&self, key: &K, expected: Version) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Removes every key.
    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Publishes the client's membership filter so the server can suppress events for keys
    /// the client does not hold.
    fn update_membership_filter(&self, snapshot: FilterSnapshot) -> impl Future<Output = Result<(), Error>> + Send {
        drop(snapshot);
        ready(Ok(()))
    }
}
