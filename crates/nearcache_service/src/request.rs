// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Request and response types for remote cache operations exposed through the Service trait.

use nearcache_tier::{FilterSnapshot, Version, VersionedValue};

/// A remote cache operation request.
///
/// This enum represents every operation a near cache issues against its remote cache,
/// which lets the remote side be composed from middleware like retry, timeout, and
/// circuit breakers.
#[derive(Debug, Clone)]
pub enum RemoteOperation<K, V> {
    /// Read the current value and version
    Get(GetRequest<K>),
    /// Write unconditionally
    Put(PutRequest<K, V>),
    /// Write if the key is absent
    PutIfAbsent(PutRequest<K, V>),
    /// Write if the key is present
    Replace(PutRequest<K, V>),
    /// Write if the server version matches
    ReplaceWithVersion(VersionedPutRequest<K, V>),
    /// Remove the key
    Remove(RemoveRequest<K>),
    /// Remove the key if the server version matches
    RemoveWithVersion(VersionedRemoveRequest<K>),
    /// Remove every key
    Clear,
    /// Publish the client's membership filter
    UpdateMembershipFilter(FilterSnapshot),
}

impl<K, V> RemoteOperation<K, V> {
    /// Returns a stable name for the operation, suitable for logs and metrics.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get(_) => "remote.get",
            Self::Put(_) => "remote.put",
            Self::PutIfAbsent(_) => "remote.put_if_absent",
            Self::Replace(_) => "remote.replace",
            Self::ReplaceWithVersion(_) => "remote.replace_with_version",
            Self::Remove(_) => "remote.remove",
            Self::RemoveWithVersion(_) => "remote.remove_with_version",
            Self::Clear => "remote.clear",
            Self::UpdateMembershipFilter(_) => "remote.update_membership_filter",
        }
    }

    /// Returns the key the operation targets, if it targets one.
    #[must_use]
    pub fn key(&self) -> Option<&K> {
        match self {
            Self::Get(req) => Some(&req.key),
            Self::Put(req) | Self::PutIfAbsent(req) | Self::Replace(req) => Some(&req.key),
            Self::ReplaceWithVersion(req) => Some(&req.key),
            Self::Remove(req) => Some(&req.key),
            Self::RemoveWithVersion(req) => Some(&req.key),
            Self::Clear | Self::UpdateMembershipFilter(_) => None,
        }
    }

    /// Returns `true` for operations that change server state for a key or the whole cache.
    #[must_use]
    pub fn is_write(&self) -> bool {
        !matches!(self, Self::Get(_) | Self::UpdateMembershipFilter(_))
    }
}

/// Request to read a value.
#[derive(Debug, Clone)]
pub struct GetRequest<K> {
    /// The key to read
    pub key: K,
}

impl<K> GetRequest<K> {
    /// Creates a new get request for the given key.
    #[must_use]
    pub fn new(key: K) -> Self {
        Self { key }
    }
}

/// Request to write a value.
#[derive(Debug, Clone)]
pub struct PutRequest<K, V> {
    /// The key to write
    pub key: K,
    /// The value to store
    pub value: V,
}

impl<K, V> PutRequest<K, V> {
    /// Creates a new write request.
    #[must_use]
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// Request to write a value conditioned on the server version.
#[derive(Debug, Clone)]
pub struct VersionedPutRequest<K, V> {
    /// The key to write
    pub key: K,
    /// The value to store
    pub value: V,
    /// The version the server must currently hold
    pub expected: Version,
}

impl<K, V> VersionedPutRequest<K, V> {
    /// Creates a new versioned write request.
    #[must_use]
    pub fn new(key: K, value: V, expected: Version) -> Self {
        Self { key, value, expected }
    }
}

/// Request to remove a key.
#[derive(Debug, Clone)]
pub struct RemoveRequest<K> {
    /// The key to remove
    pub key: K,
}

impl<K> RemoveRequest<K> {
    /// Creates a new remove request.
    #[must_use]
    pub fn new(key: K) -> Self {
        Self { key }
    }
}

/// Request to remove a key conditioned on the server version.
#[derive(Debug, Clone)]
pub struct VersionedRemoveRequest<K> {
    /// The key to remove
    pub key: K,
    /// The version the server must currently hold
    pub expected: Version,
}

impl<K> VersionedRemoveRequest<K> {
    /// Creates a new versioned remove request.
    #[must_use]
    pub fn new(key: K, expected: Version) -> Self {
        Self { key, expected }
    }
}

/// Response from a remote cache operation.
#[derive(Debug, Clone)]
pub enum RemoteResponse<V> {
    /// Response from a get
    Get(Option<VersionedValue<V>>),
    /// Response from an unconditional put
    Put,
    /// Response from a conditional write or a remove: whether it took effect
    Applied(bool),
    /// Response from a clear
    Clear,
    /// Response from a membership filter update
    FilterUpdated,
}

impl<V> RemoteResponse<V> {
    /// Returns `true` if this response is a get that found a value.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Get(Some(_)))
    }

    /// Returns `true` if this response is a get that found nothing.
    #[must_use]
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Get(None))
    }

    /// Extracts the value from a get response, if present.
    #[must_use]
    pub fn into_value(self) -> Option<VersionedValue<V>> {
        match self {
            Self::Get(value) => value,
            _ => None,
        }
    }
}
