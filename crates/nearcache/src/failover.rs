// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{fmt, hash::Hash, sync::Weak};

use nearcache_tier::KeyBytes;

use crate::{ConnectionListener, NearCacheService, service::ServiceInner};

/// Drops all local state of a near cache when its event stream is interrupted.
///
/// Events lost during an outage cannot be replayed, so every entry held when the
/// connection dropped, or when the listener came back on another server, may be stale.
/// Both transitions trigger a full reset. Admissions continue while disconnected; the
/// connected flag is informational.
///
/// A handler is registered automatically when a service is built. It holds the service
/// weakly and does nothing once the service is gone.
pub struct FailoverHandler<K, V> {
    service: Weak<ServiceInner<K, V>>,
}

impl<K, V> FailoverHandler<K, V> {
    /// Creates a handler resetting `service`.
    #[must_use]
    pub fn new(service: &NearCacheService<K, V>) -> Self
    where
        K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        Self::from_weak(service.downgrade())
    }

    pub(crate) const fn from_weak(service: Weak<ServiceInner<K, V>>) -> Self {
        Self { service }
    }
}

impl<K, V> fmt::Debug for FailoverHandler<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailoverHandler")
            .field("alive", &(self.service.strong_count() > 0))
            .finish()
    }
}

impl<K, V> ConnectionListener for FailoverHandler<K, V>
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn on_connection_lost(&self) {
        if let Some(service) = self.service.upgrade() {
            service.connection_lost();
        }
    }

    fn on_listener_reconnected(&self) {
        if let Some(service) = self.service.upgrade() {
            service.listener_reconnected();
        }
    }
}

#[cfg(test)]
mod tests {
    use nearcache_tier::{Capacity, Version, VersionedValue, testing::MockLocalTier};
    use tick::Clock;

    use super::*;
    use crate::{ListenerRegistry, NearCacheConfig, NearCacheMode};

    fn service(local: MockLocalTier<u32, u32>) -> NearCacheService<u32, u32> {
        let config = NearCacheConfig::builder()
            .mode(NearCacheMode::Invalidated)
            .max_entries(Capacity::Bounded(8))
            .bloom_filter(true)
            .build();
        NearCacheService::builder("failover", config, Clock::new_frozen())
            .local_tier(local)
            .registry(ListenerRegistry::new())
            .build()
            .unwrap()
    }

    #[test]
    fn connection_lost_resets_and_disconnects() {
        let local = MockLocalTier::new();
        let service = service(local.clone());
        nearcache_tier::LocalTier::put(&local, 1, VersionedValue::new(10, Version::new(1)));

        let handler = FailoverHandler::new(&service);
        handler.on_connection_lost();

        assert!(!service.is_connected());
        assert!(!local.contains_key(&1));
        assert!(service.needs_filter_sync());
        assert_eq!(service.stats().full_resets, 1);

        handler.on_listener_reconnected();
        assert!(service.is_connected());
        assert_eq!(service.stats().full_resets, 2);
    }

    #[test]
    fn dropped_service_is_ignored() {
        let handler = FailoverHandler::new(&service(MockLocalTier::new()));
        handler.on_connection_lost();
        handler.on_listener_reconnected();
        assert!(format!("{handler:?}").contains("alive: false"));
    }
}
