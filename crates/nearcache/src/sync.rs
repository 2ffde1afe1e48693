// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Background membership filter sync.

use std::{
    hash::Hash,
    sync::{Arc, Weak},
    time::Duration,
};

use anyspawn::{JoinHandle, Spawner};
use futures::{Stream, StreamExt};
use nearcache_tier::{KeyBytes, RemoteCache};
use tick::{Clock, PeriodicTimer};

use crate::{NearCacheService, service::ServiceInner};

impl<K, V> NearCacheService<K, V>
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Starts a task that republishes the membership filter whenever it goes stale.
    ///
    /// Every `period` the task checks [`needs_filter_sync`](Self::needs_filter_sync) and
    /// pushes a fresh filter to `remote` if needed. Failed pushes are retried on the next
    /// tick. The task holds the service weakly and exits once the service is dropped or
    /// shut down; dropping the handle detaches it.
    pub fn spawn_filter_sync<R>(&self, remote: Arc<R>, spawner: &Spawner, clock: &Clock, period: Duration) -> JoinHandle<()>
    where
        R: RemoteCache<K, V> + 'static,
    {
        let ticks = PeriodicTimer::new(clock, period);
        spawner.spawn(run_filter_sync(self.downgrade(), remote, ticks))
    }
}

pub(crate) async fn run_filter_sync<K, V, R, T>(service: Weak<ServiceInner<K, V>>, remote: Arc<R>, ticks: T)
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    R: RemoteCache<K, V>,
    T: Stream<Item = ()> + Send,
{
    let mut ticks = std::pin::pin!(ticks);
    while ticks.next().await.is_some() {
        let Some(service) = service.upgrade() else {
            break;
        };
        if service.is_shut_down() {
            break;
        }
        if service.needs_filter_sync()
            && let Err(error) = service.force_filter_sync(remote.as_ref()).await
        {
            // Counted and logged by the service; retried on the next tick.
            tracing::debug!(%error, "membership filter sync will be retried");
        }
    }
    tracing::debug!("membership filter sync stopped");
}

#[cfg(test)]
mod tests {
    use futures::stream;
    use nearcache_tier::{Capacity, Error};
    use tick::Clock;

    use super::*;
    use crate::{ListenerRegistry, NearCacheConfig, NearCacheMode, testing::MockRemote};

    fn service(registry: &ListenerRegistry) -> NearCacheService<u32, u32> {
        let config = NearCacheConfig::builder()
            .mode(NearCacheMode::Invalidated)
            .max_entries(Capacity::Bounded(32))
            .bloom_filter(true)
            .build();
        NearCacheService::builder("sync", config, Clock::new_frozen())
            .registry(registry.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn pushes_filter_once_when_stale() {
        let registry = ListenerRegistry::new();
        let remote = Arc::new(MockRemote::new(&registry, "sync"));
        let service = service(&registry);

        futures::executor::block_on(run_filter_sync(
            service.downgrade(),
            Arc::clone(&remote),
            stream::iter([(), (), ()]),
        ));

        assert_eq!(remote.filter_updates(), 1);
        assert!(!service.needs_filter_sync());
        assert_eq!(service.stats().filter_syncs, 1);
    }

    #[test]
    fn failed_push_is_retried_on_next_tick() {
        let registry = ListenerRegistry::new();
        let remote = Arc::new(MockRemote::new(&registry, "sync"));
        remote.fail_next_filter_update(Error::from_message("server unavailable"));
        let service = service(&registry);

        futures::executor::block_on(run_filter_sync(
            service.downgrade(),
            Arc::clone(&remote),
            stream::iter([(), ()]),
        ));

        let stats = service.stats();
        assert_eq!(stats.failed_filter_syncs, 1);
        assert_eq!(stats.filter_syncs, 1);
    }

    #[test]
    fn stops_once_service_is_gone() {
        let registry = ListenerRegistry::new();
        let remote = Arc::new(MockRemote::new(&registry, "sync"));
        let weak = service(&registry).downgrade();

        futures::executor::block_on(run_filter_sync(weak, Arc::clone(&remote), stream::repeat(())));

        assert_eq!(remote.filter_updates(), 0);
    }
}
