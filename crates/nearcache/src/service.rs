// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The near cache consistency protocol.
//!
//! Per key, a client observes one of two states: *unknown* (nothing held locally) and
//! *cached*. The only way into *cached* is a successful remote fetch followed by
//! `put_if_absent` on the local tier. Every other transition is an unconditional removal:
//! ahead of a remote write, on an invalidation event, on eviction, and on a full reset.
//!
//! A fetch can race with a removal of the same key. Before going remote, the service
//! records an admission token made of the reset epoch and the key's invalidation stamp.
//! Every removal bumps one of the two before touching the local tier, so an admission that
//! finds its token moved knows it may carry a stale value and backs out. With stampede
//! protection, concurrent misses only share a fetch when they captured the same token, so
//! a read issued after a removal never receives the result of a fetch that began before it.
//!
//! The membership filter never loses a held key. Admissions add to it and insert while
//! holding a read lock on the filter state. A resync builds the new bits off to the side and
//! publishes them under the write lock, and the live bits are only zeroed together with a
//! clear of the local tier.

use std::{
    fmt,
    hash::Hash,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use futures::{Stream, StreamExt};
use nearcache_bloom::{MembershipFilter, Xxh3HashFamily};
use nearcache_memory::InMemoryTier;
use nearcache_tier::{Capacity, Error, HashFamily, KeyBytes, LocalTier, RemoteCache, VersionedValue};
use parking_lot::{Mutex, RwLock};
use tick::Clock;
use uniflight::Merger;

use crate::{
    ConfigError, ConnectionId, InvalidationEvent, InvalidationListener, ListenerRegistry, NearCacheConfig, NearCacheStats,
    Registration,
    failover::FailoverHandler,
    stamps::Stamps,
    stats::StatsRecorder,
    telemetry::{Activity, Telemetry, TelemetryConfig},
};

type Fetched<V> = Result<Option<VersionedValue<V>>, Error>;

/// Snapshot of the state an admission must still observe for its value to be trusted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct AdmissionToken {
    epoch: u64,
    stamp: u64,
}

/// Fetches are merged per key and admission token.
type FlightKey<K> = (K, AdmissionToken);

struct FilterState {
    live: MembershipFilter,
    // Present while a resync collects the held keys; admissions add to both.
    rebuild: Option<MembershipFilter>,
}

impl FilterState {
    fn add(&self, bytes: &[u8]) {
        self.live.add(bytes);
        if let Some(rebuild) = &self.rebuild {
            rebuild.add(bytes);
        }
    }
}

pub(crate) struct ServiceInner<K, V> {
    name: Arc<str>,
    capacity: Capacity,
    local: Box<dyn LocalTier<K, V>>,
    filter: Option<RwLock<FilterState>>,
    stamps: Stamps,
    // Bumped by full resets and filter resyncs.
    epoch: AtomicU64,
    connected: AtomicBool,
    shut_down: AtomicBool,
    needs_sync: AtomicBool,
    syncing: AtomicBool,
    churn: AtomicU64,
    evictions_at_sync: AtomicU64,
    resync_threshold: Option<u64>,
    stats: StatsRecorder,
    clock: Clock,
    flights: Option<Merger<FlightKey<K>, Fetched<V>>>,
    telemetry: Telemetry,
    registry: ListenerRegistry,
    registration: Mutex<Option<Registration>>,
}

/// The consistency service of one near cache.
///
/// Owns the local tier and the optional membership filter, decorates reads and writes,
/// and applies invalidation events. Handles are cheap to clone and share one state. The
/// state is dropped, and the cache deregistered, when the last handle goes away.
///
/// Most applications use [`NearRemoteCache`](crate::NearRemoteCache), which wires a
/// service to a remote cache. The service is exposed for transports that deliver events
/// directly and for diagnostics.
pub struct NearCacheService<K, V> {
    pub(crate) inner: Arc<ServiceInner<K, V>>,
}

impl<K, V> Clone for NearCacheService<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for NearCacheService<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NearCacheService")
            .field("name", &self.inner.name)
            .field("capacity", &self.inner.capacity)
            .field("bloom_filter", &self.inner.filter.is_some())
            .field("connected", &self.inner.connected.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<K, V> NearCacheService<K, V>
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a builder for a near cache named `name`.
    ///
    /// `clock` stamps admissions and drives background filter sync.
    #[must_use]
    pub fn builder(name: impl Into<String>, config: NearCacheConfig, clock: Clock) -> NearCacheServiceBuilder<K, V> {
        NearCacheServiceBuilder::new(name.into(), config, clock)
    }

    /// Returns the cache name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns the local entry bound.
    #[must_use]
    pub fn capacity(&self) -> Capacity {
        self.inner.capacity
    }

    /// Returns `true` while the event listener is believed to be connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Acquire)
    }

    /// Returns the number of entries held locally.
    #[must_use]
    pub fn size(&self) -> u64 {
        let size = self.inner.local.len();
        self.inner.telemetry.record_size(&self.inner.name, size);
        size
    }

    /// Returns the counters collected so far.
    #[must_use]
    pub fn stats(&self) -> NearCacheStats {
        self.inner.stats.snapshot(self.inner.local.evictions())
    }

    /// Returns `true` if the service maintains a membership filter.
    #[must_use]
    pub fn has_filter(&self) -> bool {
        self.inner.filter.is_some()
    }

    /// Returns the generation of the membership filter, if there is one.
    #[must_use]
    pub fn filter_generation(&self) -> Option<u64> {
        self.inner.filter.as_ref().map(|filter| filter.read().live.generation())
    }

    /// Returns `false` only if `key` is definitely not held locally.
    ///
    /// Without a membership filter this is always `true`.
    #[must_use]
    pub fn might_hold(&self, key: &K) -> bool {
        self.inner.might_hold(key)
    }

    /// Returns `true` if the server's copy of the membership filter should be refreshed.
    ///
    /// That is the case after a reset or a failed push, and once the churn since the last
    /// successful push exceeds the resync threshold. Always `false` without a filter.
    #[must_use]
    pub fn needs_filter_sync(&self) -> bool {
        self.inner.needs_filter_sync()
    }

    /// Returns the locally held value without counting a hit or a miss.
    #[must_use]
    pub fn peek(&self, key: &K) -> Option<VersionedValue<V>> {
        if self.inner.is_shut_down() {
            return None;
        }
        self.inner.local.get(key)
    }

    /// Reads through the near cache.
    ///
    /// A local hit returns immediately. On a miss the value is fetched from `remote` and
    /// admitted locally unless the key was invalidated while the fetch was in flight.
    ///
    /// # Errors
    ///
    /// Returns the remote error unchanged. Nothing is admitted on failure.
    pub async fn get<R>(&self, remote: &R, key: &K) -> Result<Option<VersionedValue<V>>, Error>
    where
        R: RemoteCache<K, V> + ?Sized,
    {
        if let Some(value) = self.inner.lookup(key) {
            return Ok(Some(value));
        }
        self.inner.load(remote, key).await
    }

    /// Removes `key` locally ahead of a remote write.
    ///
    /// Must be called when the write is issued, before its future is first polled, so a
    /// read on the same task can never observe the value being replaced.
    pub fn preempt(&self, key: &K) {
        self.inner.preempt(key);
    }

    /// Applies one invalidation event.
    pub fn apply(&self, event: InvalidationEvent<K>) {
        self.inner.apply(event);
    }

    /// Applies events from `events` in order until the stream ends.
    pub async fn consume<S>(&self, events: S)
    where
        S: Stream<Item = InvalidationEvent<K>>,
    {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            self.inner.apply(event);
        }
    }

    /// Drops every locally held entry and resets the membership filter.
    pub fn reset(&self) {
        self.inner.full_reset("requested");
    }

    /// Rebuilds the membership filter from the local keys and publishes it to `remote`.
    ///
    /// Returns immediately if there is no filter or a sync is already running.
    ///
    /// # Errors
    ///
    /// Returns the remote error if the server did not accept the filter. The service then
    /// keeps reporting [`needs_filter_sync`](Self::needs_filter_sync).
    pub async fn force_filter_sync<R>(&self, remote: &R) -> Result<(), Error>
    where
        R: RemoteCache<K, V> + ?Sized,
    {
        self.inner.force_filter_sync(remote).await
    }

    /// Moves the listener registration to `connection` and marks the service connected.
    ///
    /// Used after a failover once the transport re-established the event listener on a new
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns an error if another cache of the same name is already registered on
    /// `connection`, or if the service was shut down. The service then stays registered
    /// where it was.
    pub fn rebind(&self, connection: ConnectionId) -> Result<(), Error> {
        if self.inner.is_shut_down() {
            return Err(Error::from_message(format!("near cache '{}' is shut down", self.inner.name)));
        }

        let mut registration = self.inner.registration.lock();
        if registration.as_ref().is_none_or(|current| current.connection() != connection) {
            let rebound = register(&self.inner, &self.inner.registry, connection)?;
            drop(registration.replace(rebound));
        }
        self.inner.connected.store(true, Ordering::Release);
        tracing::info!(near_cache.name = %self.inner.name, %connection, "near cache listener rebound");
        Ok(())
    }

    /// Returns the connection the service is registered on.
    #[must_use]
    pub fn connection(&self) -> Option<ConnectionId> {
        self.inner.registration.lock().as_ref().map(Registration::connection)
    }

    /// Deregisters the service and drops the local state.
    ///
    /// Afterwards reads and writes pass straight through to the remote cache.
    pub fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        drop(self.inner.registration.lock().take());
        self.inner.connected.store(false, Ordering::Release);
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.local.clear();
        tracing::info!(near_cache.name = %self.inner.name, "near cache shut down");
    }

    /// Returns `true` after [`shutdown`](Self::shutdown).
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.is_shut_down()
    }

    pub(crate) fn downgrade(&self) -> Weak<ServiceInner<K, V>> {
        Arc::downgrade(&self.inner)
    }
}

impl<K, V> ServiceInner<K, V>
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    fn token(&self, key: &K) -> AdmissionToken {
        AdmissionToken {
            epoch: self.epoch.load(Ordering::Acquire),
            stamp: self.stamps.current(key),
        }
    }

    fn might_hold(&self, key: &K) -> bool {
        self.filter
            .as_ref()
            .is_none_or(|filter| filter.read().live.test(&key.key_bytes()))
    }

    fn lookup(&self, key: &K) -> Option<VersionedValue<V>> {
        if self.is_shut_down() {
            return None;
        }

        let value = self.local.get(key);
        if value.is_some() {
            StatsRecorder::increment(&self.stats.hits);
            self.telemetry.record(&self.name, Activity::Hit);
        } else {
            StatsRecorder::increment(&self.stats.misses);
            self.telemetry.record(&self.name, Activity::Miss);
        }
        value
    }

    async fn load<R>(&self, remote: &R, key: &K) -> Fetched<V>
    where
        R: RemoteCache<K, V> + ?Sized,
    {
        let token = self.token(key);
        let Some(flights) = &self.flights else {
            return self.fetch_and_admit(remote, key, token).await;
        };

        flights
            .execute(&(key.clone(), token), || self.fetch_and_admit(remote, key, token))
            .await
            .unwrap_or_else(|panicked| {
                Err(Error::from_message(format!(
                    "shared fetch for near cache '{}' panicked: {}",
                    self.name,
                    panicked.message()
                )))
            })
    }

    async fn fetch_and_admit<R>(&self, remote: &R, key: &K, token: AdmissionToken) -> Fetched<V>
    where
        R: RemoteCache<K, V> + ?Sized,
    {
        let fetched = remote.get(key).await?;
        if let Some(value) = &fetched {
            self.admit(key, value.clone(), token);
        }
        Ok(fetched)
    }

    fn admit(&self, key: &K, mut value: VersionedValue<V>, token: AdmissionToken) {
        if self.is_shut_down() {
            return;
        }

        if self.token(key) != token {
            self.abandon();
            return;
        }

        value.ensure_cached_at(self.clock.system_time());

        // The filter must know the key before the value becomes visible, and a rebuild or
        // reset must not slip between the two.
        let _filter = self.filter.as_ref().map(|filter| {
            let state = filter.read();
            state.add(&key.key_bytes());
            state
        });
        let inserted = self.local.put_if_absent(key.clone(), value);

        if self.token(key) != token {
            if inserted {
                self.local.remove(key);
            }
            self.abandon();
            return;
        }

        if inserted {
            StatsRecorder::increment(&self.stats.admissions);
            self.telemetry.record(&self.name, Activity::Admitted);
        }
    }

    fn abandon(&self) {
        StatsRecorder::increment(&self.stats.abandoned_admissions);
        self.telemetry.record(&self.name, Activity::Abandoned);
    }

    pub(crate) fn preempt(&self, key: &K) {
        if self.is_shut_down() {
            return;
        }

        self.stamps.bump(key);
        self.local.remove(key);
        self.churn.fetch_add(1, Ordering::Relaxed);
        StatsRecorder::increment(&self.stats.preemptive_removes);
        self.telemetry.record(&self.name, Activity::PreemptiveRemove);
    }

    pub(crate) fn apply(&self, event: InvalidationEvent<K>) {
        match event {
            InvalidationEvent::Modified(key) | InvalidationEvent::Removed(key) => {
                self.stamps.bump(&key);
                self.local.remove(&key);
                self.churn.fetch_add(1, Ordering::Relaxed);
                StatsRecorder::increment(&self.stats.invalidations);
                self.telemetry.record(&self.name, Activity::Invalidated);
            }
            InvalidationEvent::Cleared => self.full_reset("cleared by server"),
        }
    }

    pub(crate) fn full_reset(&self, reason: &'static str) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        match &self.filter {
            Some(filter) => {
                let state = filter.write();
                self.local.clear();
                state.live.reset();
                if let Some(rebuild) = &state.rebuild {
                    rebuild.reset();
                }
                drop(state);
                self.needs_sync.store(true, Ordering::SeqCst);
            }
            None => self.local.clear(),
        }

        StatsRecorder::increment(&self.stats.full_resets);
        self.telemetry.record(&self.name, Activity::FullReset);
        tracing::info!(near_cache.name = %self.name, reason, "near cache reset");
    }

    pub(crate) fn connection_lost(&self) {
        self.full_reset("connection lost");
        self.connected.store(false, Ordering::Release);
        self.telemetry.record(&self.name, Activity::ConnectionLost);
    }

    pub(crate) fn listener_reconnected(&self) {
        self.full_reset("listener reconnected");
        self.connected.store(true, Ordering::Release);
        self.telemetry.record(&self.name, Activity::Reconnected);
    }

    pub(crate) fn needs_filter_sync(&self) -> bool {
        if self.filter.is_none() || self.is_shut_down() {
            return false;
        }
        if self.needs_sync.load(Ordering::SeqCst) {
            return true;
        }

        let evicted = self
            .local
            .evictions()
            .saturating_sub(self.evictions_at_sync.load(Ordering::Relaxed));
        let churn = self.churn.load(Ordering::Relaxed).saturating_add(evicted);
        self.resync_threshold.is_some_and(|threshold| churn > threshold)
    }

    pub(crate) async fn force_filter_sync<R>(&self, remote: &R) -> Result<(), Error>
    where
        R: RemoteCache<K, V> + ?Sized,
    {
        let Some(filter) = &self.filter else {
            return Ok(());
        };
        if self.is_shut_down() || self.syncing.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let _syncing = SyncGuard(&self.syncing);

        // Fetches that started before the rebuild may land after the snapshot.
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        {
            let mut state = filter.write();
            state.rebuild = Some(state.live.empty_like());
        }
        let keys = self.local.keys();
        {
            let state = filter.read();
            if let Some(rebuild) = &state.rebuild {
                for key in &keys {
                    rebuild.add(&key.key_bytes());
                }
            }
        }
        let (snapshot, family) = {
            let mut state = filter.write();
            if let Some(rebuilt) = state.rebuild.take() {
                state.live.publish(&rebuilt);
            }
            (state.live.snapshot(), Arc::clone(state.live.family()))
        };

        match remote.update_membership_filter(snapshot.clone()).await {
            Ok(()) => {
                // A reset while the push was in flight leaves the server with a filter from
                // before it, so the pending push it requested must survive.
                self.needs_sync.store(false, Ordering::SeqCst);
                // Admissions of fetches served before the server saw the snapshot are
                // abandoned; those that already landed outside it are swept.
                let reset_during_push = self.epoch.fetch_add(1, Ordering::SeqCst) != epoch;
                if reset_during_push {
                    self.needs_sync.store(true, Ordering::SeqCst);
                }

                let mut swept = 0_usize;
                for key in self.local.keys() {
                    if !snapshot.might_contain(&key.key_bytes(), family.as_ref()) {
                        self.stamps.bump(&key);
                        self.local.remove(&key);
                        swept += 1;
                    }
                }

                if !reset_during_push {
                    self.churn.store(0, Ordering::Relaxed);
                    self.evictions_at_sync.store(self.local.evictions(), Ordering::Relaxed);
                }
                StatsRecorder::increment(&self.stats.filter_syncs);
                self.telemetry.record(&self.name, Activity::FilterSync);
                tracing::info!(
                    near_cache.name = %self.name,
                    keys = keys.len(),
                    swept,
                    reset_during_push,
                    generation = snapshot.generation(),
                    set_bits = snapshot.set_bits(),
                    "membership filter published"
                );
                Ok(())
            }
            Err(error) => {
                self.needs_sync.store(true, Ordering::SeqCst);
                StatsRecorder::increment(&self.stats.failed_filter_syncs);
                self.telemetry.record(&self.name, Activity::FilterSyncFailed);
                tracing::warn!(near_cache.name = %self.name, %error, "membership filter push failed");
                Err(error)
            }
        }
    }
}

struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Forwards invalidation events to a service without keeping it alive.
struct EventSink<K, V> {
    service: Weak<ServiceInner<K, V>>,
}

impl<K, V> InvalidationListener<K> for EventSink<K, V>
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn on_event(&self, event: InvalidationEvent<K>) {
        if let Some(service) = self.service.upgrade() {
            service.apply(event);
        }
    }
}

fn register<K, V>(inner: &Arc<ServiceInner<K, V>>, registry: &ListenerRegistry, connection: ConnectionId) -> Result<Registration, Error>
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let sink: Arc<dyn InvalidationListener<K>> = Arc::new(EventSink {
        service: Arc::downgrade(inner),
    });
    let failover = Arc::new(FailoverHandler::from_weak(Arc::downgrade(inner)));
    registry.register(connection, &inner.name, sink, failover)
}

/// Builder for [`NearCacheService`].
pub struct NearCacheServiceBuilder<K, V> {
    name: String,
    config: NearCacheConfig,
    clock: Clock,
    local: Option<Box<dyn LocalTier<K, V>>>,
    hash_family: Option<Arc<dyn HashFamily>>,
    registry: Option<ListenerRegistry>,
    connection: ConnectionId,
    telemetry: TelemetryConfig,
}

impl<K, V> fmt::Debug for NearCacheServiceBuilder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NearCacheServiceBuilder")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("custom_local_tier", &self.local.is_some())
            .field("hash_family", &self.hash_family)
            .field("connection", &self.connection)
            .finish_non_exhaustive()
    }
}

impl<K, V> NearCacheServiceBuilder<K, V>
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn new(name: String, config: NearCacheConfig, clock: Clock) -> Self {
        Self {
            name,
            config,
            clock,
            local: None,
            hash_family: None,
            registry: None,
            connection: ConnectionId::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Uses `local` instead of an [`InMemoryTier`] sized from the configuration.
    ///
    /// The tier must honour the configured capacity itself.
    #[must_use]
    pub fn local_tier(mut self, local: impl LocalTier<K, V> + 'static) -> Self {
        self.local = Some(Box::new(local));
        self
    }

    /// Sets the hash family of the membership filter.
    ///
    /// The server must evaluate the same family. Defaults to [`Xxh3HashFamily`].
    #[must_use]
    pub fn hash_family(mut self, family: Arc<dyn HashFamily>) -> Self {
        self.hash_family = Some(family);
        self
    }

    /// Registers the service in `registry` instead of [`ListenerRegistry::global`].
    #[must_use]
    pub fn registry(mut self, registry: ListenerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the connection whose events the service receives.
    #[must_use]
    pub fn connection(mut self, connection: ConnectionId) -> Self {
        self.connection = connection;
        self
    }

    /// Sets the telemetry configuration.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Validates the configuration, builds the service and registers its listeners.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, if near caching is disabled for
    /// this cache, or if the cache is already registered on the connection.
    pub fn build(self) -> Result<NearCacheService<K, V>, ConfigError> {
        let name = self.name;
        self.config.validate(&name)?;

        let capacity = match (self.config.mode().enabled(), self.config.max_entries()) {
            (true, Some(capacity)) => capacity,
            _ => return Err(ConfigError::caused_by(name, "the near cache is disabled")),
        };

        let local = self.local.unwrap_or_else(|| {
            Box::new(
                InMemoryTier::<K, V>::builder()
                    .capacity(capacity)
                    .name(name.clone())
                    .build(),
            )
        });

        let filter = match capacity.bound() {
            Some(bound) if self.config.bloom_filter() => {
                let family = self
                    .hash_family
                    .unwrap_or_else(|| Arc::new(Xxh3HashFamily::default()));
                Some(RwLock::new(FilterState {
                    live: MembershipFilter::for_capacity(bound, family),
                    rebuild: None,
                }))
            }
            _ => None,
        };

        let registry = self.registry.unwrap_or_else(|| ListenerRegistry::global().clone());
        let needs_sync = filter.is_some();

        let inner = Arc::new(ServiceInner {
            name: Arc::from(name.as_str()),
            capacity,
            local,
            filter,
            stamps: Stamps::new(),
            epoch: AtomicU64::new(0),
            connected: AtomicBool::new(true),
            shut_down: AtomicBool::new(false),
            needs_sync: AtomicBool::new(needs_sync),
            syncing: AtomicBool::new(false),
            churn: AtomicU64::new(0),
            evictions_at_sync: AtomicU64::new(0),
            resync_threshold: self.config.filter_resync_threshold(),
            stats: StatsRecorder::default(),
            clock: self.clock,
            flights: self.config.stampede_protection().then(Merger::new),
            telemetry: self.telemetry.build(),
            registry: registry.clone(),
            registration: Mutex::new(None),
        });

        let registration = register(&inner, &registry, self.connection).map_err(|error| ConfigError::caused_by(name.clone(), error))?;
        *inner.registration.lock() = Some(registration);

        tracing::info!(
            near_cache.name = %name,
            %capacity,
            bloom_filter = inner.filter.is_some(),
            connection = %self.connection,
            "near cache started"
        );

        Ok(NearCacheService { inner })
    }
}
