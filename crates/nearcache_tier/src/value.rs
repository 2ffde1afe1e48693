// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    fmt,
    ops::Deref,
    time::{Duration, SystemTime},
};

/// A version token issued by the authoritative server.
///
/// Versions are comparable and grow monotonically per key on the server. The near cache
/// only uses them for diagnostics and versioned remote writes, never for conflict
/// resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// Creates a version from its raw server representation.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw server representation.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for Version {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A value paired with the version the server issued for it.
///
/// # Examples
///
/// ```
/// use nearcache_tier::{Version, VersionedValue};
///
/// let value = VersionedValue::new("v1".to_string(), Version::new(7));
/// assert_eq!(value.value(), "v1");
/// assert_eq!(value.version(), Version::new(7));
/// assert!(value.cached_at().is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedValue<V> {
    value: V,
    version: Version,
    /// When the local tier admitted the value. Diagnostic only.
    cached_at: Option<SystemTime>,
}

impl<V> VersionedValue<V> {
    /// Creates a new versioned value.
    pub fn new(value: V, version: Version) -> Self {
        Self {
            value,
            version,
            cached_at: None,
        }
    }

    /// Returns a reference to the value.
    #[must_use]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the pair and returns the value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }

    /// Returns the server-issued version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Returns when the value was admitted into a local tier, if it was.
    #[must_use]
    pub fn cached_at(&self) -> Option<SystemTime> {
        self.cached_at
    }

    /// Records the admission timestamp.
    pub fn set_cached_at(&mut self, cached_at: SystemTime) {
        self.cached_at = Some(cached_at);
    }

    /// Records the admission timestamp unless one is already present.
    pub fn ensure_cached_at(&mut self, now: SystemTime) {
        self.cached_at.get_or_insert(now);
    }

    /// Returns how long the value has been held locally as of `now`.
    ///
    /// Returns `None` when the value was never admitted or `now` precedes the admission.
    #[must_use]
    pub fn age(&self, now: SystemTime) -> Option<Duration> {
        self.cached_at.and_then(|at| now.duration_since(at).ok())
    }

    /// Returns `true` if this value is older than `other` according to the server versions.
    #[must_use]
    pub fn is_older_than(&self, other: &Self) -> bool {
        self.version < other.version
    }
}

impl<V> Deref for VersionedValue<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
