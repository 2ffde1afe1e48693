// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// A server-pushed notification that locally held state may be out of date.
///
/// Events carry no value. Applying one only ever removes local state, so delivering the
/// same event twice, or an event for a key that is not held, is harmless.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InvalidationEvent<K> {
    /// The value of the key changed on the server.
    Modified(K),
    /// The key was removed on the server.
    Removed(K),
    /// Every locally held entry must be dropped.
    ///
    /// Sent on a bulk clear, when the event listener reconnects, and synthesized on failover.
    Cleared,
}

impl<K> InvalidationEvent<K> {
    /// Returns the key the event concerns, or `None` for [`InvalidationEvent::Cleared`].
    #[must_use]
    pub fn key(&self) -> Option<&K> {
        match self {
            Self::Modified(key) | Self::Removed(key) => Some(key),
            Self::Cleared => None,
        }
    }

    /// Returns `true` for [`InvalidationEvent::Cleared`].
    #[must_use]
    pub fn is_clear(&self) -> bool {
        matches!(self, Self::Cleared)
    }

    /// Returns a short name for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Modified(_) => "modified",
            Self::Removed(_) => "removed",
            Self::Cleared => "cleared",
        }
    }
}
