// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{future::Future, hash::Hash, sync::Arc, time::Duration};

use anyspawn::{JoinHandle, Spawner};
use nearcache_tier::{Error, FilterSnapshot, KeyBytes, RemoteCache, Version, VersionedValue};
use tick::Clock;

use crate::{ClientNearCacheConfig, ConfigError, NearCacheService, NearCacheStats};

/// A remote cache decorated with a near cache.
///
/// Reads are served locally when possible. Writes remove the key locally as soon as they
/// are issued, then go to the remote cache unchanged. With near caching disabled every
/// call goes straight to the remote cache.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "test-util")]
/// # fn main() -> Result<(), Box<dyn std::error::Error>> { futures::executor::block_on(async {
/// use nearcache::{ListenerRegistry, NearCacheConfig, NearCacheMode, NearCacheService, NearRemoteCache, testing::MockRemote};
/// use nearcache_tier::{Capacity, RemoteCache};
/// use tick::Clock;
///
/// let registry = ListenerRegistry::new();
/// let config = NearCacheConfig::builder()
///     .mode(NearCacheMode::Invalidated)
///     .max_entries(Capacity::Bounded(1_000))
///     .build();
/// let service = NearCacheService::builder("orders", config, Clock::new_frozen())
///     .registry(registry.clone())
///     .build()?;
/// let cache = NearRemoteCache::new(MockRemote::new(&registry, "orders"), service);
///
/// cache.put(1_u32, "first".to_string()).await?;
/// assert_eq!(cache.get_value(&1).await?.as_deref(), Some("first"));
/// assert_eq!(cache.size(), 1);
/// # Ok(())
/// # }) }
/// # #[cfg(not(feature = "test-util"))]
/// # fn main() {}
/// ```
pub struct NearRemoteCache<K, V, R> {
    remote: Arc<R>,
    service: Option<NearCacheService<K, V>>,
}

impl<K, V, R> std::fmt::Debug for NearRemoteCache<K, V, R>
where
    R: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NearRemoteCache")
            .field("remote", &self.remote)
            .field("service", &self.service)
            .finish()
    }
}

impl<K, V, R> Clone for NearRemoteCache<K, V, R> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            service: self.service.clone(),
        }
    }
}

impl<K, V, R> NearRemoteCache<K, V, R>
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    R: RemoteCache<K, V>,
{
    /// Decorates `remote` with `service`.
    #[must_use]
    pub fn new(remote: R, service: NearCacheService<K, V>) -> Self {
        Self {
            remote: Arc::new(remote),
            service: Some(service),
        }
    }

    /// Wraps `remote` without a near cache.
    #[must_use]
    pub fn disabled(remote: R) -> Self {
        Self {
            remote: Arc::new(remote),
            service: None,
        }
    }

    /// Decorates `remote` as configured for `cache_name` in the client configuration.
    ///
    /// The cache gets a near cache only if its resolved configuration enables one. The
    /// service registers in the global [`ListenerRegistry`](crate::ListenerRegistry) on the
    /// default connection; use [`NearCacheService::builder`] for anything else.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved configuration is invalid.
    pub fn from_config(remote: R, cache_name: &str, config: &ClientNearCacheConfig, clock: Clock) -> Result<Self, ConfigError> {
        let resolved = config.resolve(cache_name);
        if !resolved.mode().enabled() {
            tracing::debug!(near_cache.name = cache_name, "near cache disabled");
            return Ok(Self::disabled(remote));
        }

        let service = NearCacheService::builder(cache_name, resolved, clock).build()?;
        Ok(Self::new(remote, service))
    }

    /// Returns the decorated remote cache.
    #[must_use]
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Returns the near cache service, or `None` if near caching is disabled.
    #[must_use]
    pub fn service(&self) -> Option<&NearCacheService<K, V>> {
        self.service.as_ref()
    }

    /// Returns `true` while the near cache's event listener is connected.
    ///
    /// Always `false` when near caching is disabled.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.service.as_ref().is_some_and(NearCacheService::is_connected)
    }

    /// Returns the number of locally held entries.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.service.as_ref().map_or(0, NearCacheService::size)
    }

    /// Returns the near cache counters, or `None` if near caching is disabled.
    #[must_use]
    pub fn stats(&self) -> Option<NearCacheStats> {
        self.service.as_ref().map(NearCacheService::stats)
    }

    /// Publishes a freshly rebuilt membership filter to the remote cache.
    ///
    /// Does nothing without a near cache or without a membership filter.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the server did not accept the filter.
    pub async fn force_filter_sync(&self) -> Result<(), Error> {
        match &self.service {
            Some(service) => service.force_filter_sync(self.remote.as_ref()).await,
            None => Ok(()),
        }
    }

    /// Starts the periodic membership filter sync. See
    /// [`NearCacheService::spawn_filter_sync`].
    ///
    /// Returns `None` if there is no membership filter to keep in sync.
    pub fn spawn_filter_sync(&self, spawner: &Spawner, clock: &Clock, period: Duration) -> Option<JoinHandle<()>>
    where
        R: 'static,
    {
        let service = self.service.as_ref().filter(|service| service.has_filter())?;
        Some(service.spawn_filter_sync(Arc::clone(&self.remote), spawner, clock, period))
    }

    /// Reads `key` and returns just the value.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the read missed locally and the fetch failed.
    pub async fn get_value(&self, key: &K) -> Result<Option<V>, Error> {
        Ok(self.get(key).await?.map(VersionedValue::into_value))
    }

    fn preempt(&self, key: &K) {
        if let Some(service) = &self.service {
            service.preempt(key);
        }
    }

    fn reset(&self) {
        if let Some(service) = &self.service {
            service.reset();
        }
    }
}

// The write methods remove the key before returning the remote future, so the removal
// happens when the write is issued even if the caller polls it later.
impl<K, V, R> RemoteCache<K, V> for NearRemoteCache<K, V, R>
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    R: RemoteCache<K, V>,
{
    async fn get(&self, key: &K) -> Result<Option<VersionedValue<V>>, Error> {
        match &self.service {
            Some(service) => service.get(self.remote.as_ref(), key).await,
            None => self.remote.get(key).await,
        }
    }

    fn put(&self, key: K, value: V) -> impl Future<Output = Result<(), Error>> + Send {
        self.preempt(&key);
        self.remote.put(key, value)
    }

    fn put_if_absent(&self, key: K, value: V) -> impl Future<Output = Result<bool, Error>> + Send {
        self.preempt(&key);
        self.remote.put_if_absent(key, value)
    }

    fn replace(&self, key: K, value: V) -> impl Future<Output = Result<bool, Error>> + Send {
        self.preempt(&key);
        self.remote.replace(key, value)
    }

    fn replace_with_version(&self, key: K, value: V, expected: Version) -> impl Future<Output = Result<bool, Error>> + Send {
        self.preempt(&key);
        self.remote.replace_with_version(key, value, expected)
    }

    fn remove(&self, key: &K) -> impl Future<Output = Result<bool, Error>> + Send {
        self.preempt(key);
        self.remote.remove(key)
    }

    fn remove_with_version(&self, key: &K, expected: Version) -> impl Future<Output = Result<bool, Error>> + Send {
        self.preempt(key);
        self.remote.remove_with_version(key, expected)
    }

    fn clear(&self) -> impl Future<Output = Result<(), Error>> + Send {
        self.reset();
        self.remote.clear()
    }

    fn update_membership_filter(&self, snapshot: FilterSnapshot) -> impl Future<Output = Result<(), Error>> + Send {
        self.remote.update_membership_filter(snapshot)
    }
}

#[cfg(feature = "service")]
mod service_impl {
    use std::{future::Future, hash::Hash};

    use layered::Service;
    use nearcache_service::{RemoteOperation, RemoteResponse};
    use nearcache_tier::{Error, KeyBytes, RemoteCache};

    use super::NearRemoteCache;

    /// Executes remote operations through the near cache.
    ///
    /// Lets a near cache sit in a `layered` middleware stack. Write operations remove their
    /// key locally when `execute` is called, before the returned future is polled.
    impl<K, V, R> Service<RemoteOperation<K, V>> for NearRemoteCache<K, V, R>
    where
        K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        R: RemoteCache<K, V>,
    {
        type Out = Result<RemoteResponse<V>, Error>;

        fn execute(&self, input: RemoteOperation<K, V>) -> impl Future<Output = Self::Out> + Send {
            if input.is_write() {
                match input.key() {
                    Some(key) => self.preempt(key),
                    None => self.reset(),
                }
            }

            async move {
                let remote = self.remote.as_ref();
                match input {
                    RemoteOperation::Get(request) => self.get(&request.key).await.map(RemoteResponse::Get),
                    RemoteOperation::Put(request) => remote.put(request.key, request.value).await.map(|()| RemoteResponse::Put),
                    RemoteOperation::PutIfAbsent(request) => {
                        remote.put_if_absent(request.key, request.value).await.map(RemoteResponse::Applied)
                    }
                    RemoteOperation::Replace(request) => remote.replace(request.key, request.value).await.map(RemoteResponse::Applied),
                    RemoteOperation::ReplaceWithVersion(request) => remote
                        .replace_with_version(request.key, request.value, request.expected)
                        .await
                        .map(RemoteResponse::Applied),
                    RemoteOperation::Remove(request) => remote.remove(&request.key).await.map(RemoteResponse::Applied),
                    RemoteOperation::RemoveWithVersion(request) => remote
                        .remove_with_version(&request.key, request.expected)
                        .await
                        .map(RemoteResponse::Applied),
                    RemoteOperation::Clear => remote.clear().await.map(|()| RemoteResponse::Clear),
                    RemoteOperation::UpdateMembershipFilter(snapshot) => {
                        remote.update_membership_filter(snapshot).await.map(|()| RemoteResponse::FilterUpdated)
                    }
                }
            }
        }
    }
}
