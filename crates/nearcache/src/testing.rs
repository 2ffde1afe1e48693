// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test doubles for near cache users.
//!
//! [`MockRemote`] is an in-memory stand-in for a remote cache server. It versions every
//! write, records the operations it serves, and pushes invalidation events to the near
//! cache registered for it, honouring the published membership filter the way a server
//! does.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    hash::Hash,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};

use nearcache_bloom::Xxh3HashFamily;
use nearcache_tier::{Error, FilterSnapshot, HashFamily, KeyBytes, RemoteCache, Version, VersionedValue};
use parking_lot::Mutex;

use crate::{ConnectionId, InvalidationEvent, ListenerRegistry};

/// An operation served by a [`MockRemote`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteOp<K> {
    /// A read.
    Get(K),
    /// An unconditional write.
    Put(K),
    /// A conditional insert.
    PutIfAbsent(K),
    /// A replace of a present key.
    Replace(K),
    /// A versioned replace.
    ReplaceWithVersion(K),
    /// A removal.
    Remove(K),
    /// A versioned removal.
    RemoveWithVersion(K),
    /// A bulk clear.
    Clear,
    /// A membership filter push, with the filter generation.
    UpdateMembershipFilter(u64),
}

type GetHook<K, V> = Arc<dyn Fn(&MockRemote<K, V>, &K) + Send + Sync>;
type FilterHook<K, V> = Arc<dyn Fn(&MockRemote<K, V>, &FilterSnapshot) + Send + Sync>;

/// An in-memory remote cache that pushes invalidation events.
///
/// Events go to whatever near cache is registered under the mock's cache name on its
/// connection in the given [`ListenerRegistry`]. When a membership filter was published, a
/// key produces an event only if the filter might contain it or if the key was served
/// since the filter arrived.
///
/// # Examples
///
/// ```
/// use nearcache::{ListenerRegistry, testing::MockRemote};
/// use nearcache_tier::RemoteCache;
///
/// # futures::executor::block_on(async {
/// let registry = ListenerRegistry::new();
/// let remote = MockRemote::<String, i32>::new(&registry, "orders");
///
/// remote.put("a".to_string(), 1).await?;
/// let value = remote.get(&"a".to_string()).await?;
/// assert_eq!(value.map(|v| *v.value()), Some(1));
/// # Ok::<(), nearcache_tier::Error>(())
/// # }).unwrap();
/// ```
pub struct MockRemote<K, V> {
    registry: ListenerRegistry,
    cache_name: String,
    connection: Mutex<ConnectionId>,
    family: Arc<dyn HashFamily>,
    data: Mutex<HashMap<K, VersionedValue<V>>>,
    next_version: AtomicU64,
    operations: Mutex<Vec<RemoteOp<K>>>,
    filter: Mutex<Option<FilterSnapshot>>,
    served_since_filter: Mutex<HashSet<K>>,
    filter_updates: AtomicUsize,
    holding: AtomicBool,
    pending: Mutex<Vec<InvalidationEvent<K>>>,
    fail_next: Mutex<Option<Error>>,
    fail_next_filter_update: Mutex<Option<Error>>,
    get_hook: Mutex<Option<GetHook<K, V>>>,
    filter_hook: Mutex<Option<FilterHook<K, V>>>,
}

impl<K, V> fmt::Debug for MockRemote<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockRemote")
            .field("cache_name", &self.cache_name)
            .field("connection", &*self.connection.lock())
            .field("entries", &self.data.lock().len())
            .field("filter_updates", &self.filter_updates.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<K, V> MockRemote<K, V>
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates an empty server sending events for `cache_name` on the default connection.
    #[must_use]
    pub fn new(registry: &ListenerRegistry, cache_name: impl Into<String>) -> Self {
        Self::with_hash_family(registry, cache_name, Arc::new(Xxh3HashFamily::default()))
    }

    /// Creates an empty server evaluating published filters with `family`.
    #[must_use]
    pub fn with_hash_family(registry: &ListenerRegistry, cache_name: impl Into<String>, family: Arc<dyn HashFamily>) -> Self {
        Self {
            registry: registry.clone(),
            cache_name: cache_name.into(),
            connection: Mutex::new(ConnectionId::default()),
            family,
            data: Mutex::new(HashMap::new()),
            next_version: AtomicU64::new(1),
            operations: Mutex::new(Vec::new()),
            filter: Mutex::new(None),
            served_since_filter: Mutex::new(HashSet::new()),
            filter_updates: AtomicUsize::new(0),
            holding: AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            fail_next_filter_update: Mutex::new(None),
            get_hook: Mutex::new(None),
            filter_hook: Mutex::new(None),
        }
    }

    /// Returns the operations served so far.
    #[must_use]
    pub fn operations(&self) -> Vec<RemoteOp<K>> {
        self.operations.lock().clone()
    }

    /// Forgets the recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Returns how many reads were served.
    #[must_use]
    pub fn get_count(&self) -> usize {
        self.operations
            .lock()
            .iter()
            .filter(|op| matches!(op, RemoteOp::Get(_)))
            .count()
    }

    /// Returns how many membership filters were accepted.
    #[must_use]
    pub fn filter_updates(&self) -> usize {
        self.filter_updates.load(Ordering::Relaxed)
    }

    /// Returns the last accepted membership filter.
    #[must_use]
    pub fn filter(&self) -> Option<FilterSnapshot> {
        self.filter.lock().clone()
    }

    /// Returns the value stored on the server, without recording a read.
    #[must_use]
    pub fn stored(&self, key: &K) -> Option<VersionedValue<V>> {
        self.data.lock().get(key).cloned()
    }

    /// Fails the next data operation with `error`.
    pub fn fail_next(&self, error: Error) {
        *self.fail_next.lock() = Some(error);
    }

    /// Rejects the next membership filter push with `error`.
    pub fn fail_next_filter_update(&self, error: Error) {
        *self.fail_next_filter_update.lock() = Some(error);
    }

    /// Runs `hook` after each read took its value and before the read completes.
    ///
    /// Lets tests interleave a concurrent writer with an in-flight fetch.
    pub fn on_get(&self, hook: impl Fn(&Self, &K) + Send + Sync + 'static) {
        *self.get_hook.lock() = Some(Arc::new(hook));
    }

    /// Runs `hook` after each accepted membership filter and before the push completes.
    pub fn on_filter_update(&self, hook: impl Fn(&Self, &FilterSnapshot) + Send + Sync + 'static) {
        *self.filter_hook.lock() = Some(Arc::new(hook));
    }

    /// Stops delivering events. They queue until [`deliver_pending`](Self::deliver_pending).
    pub fn hold_events(&self) {
        self.holding.store(true, Ordering::Release);
    }

    /// Delivers queued events in order and resumes immediate delivery.
    pub fn deliver_pending(&self) {
        self.holding.store(false, Ordering::Release);
        let pending = std::mem::take(&mut *self.pending.lock());
        for event in pending {
            self.dispatch(event);
        }
    }

    /// Returns how many events are queued.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.pending.lock().len()
    }

    /// Writes a value as another client would, sending the resulting event.
    pub fn server_put(&self, key: K, value: V) {
        self.store(key.clone(), value);
        self.publish(InvalidationEvent::Modified(key));
    }

    /// Removes a key as another client would, sending the resulting event.
    pub fn server_remove(&self, key: &K) {
        if self.data.lock().remove(key).is_some() {
            self.publish(InvalidationEvent::Removed(key.clone()));
        }
    }

    /// Clears the server as another client would, sending the resulting event.
    pub fn server_clear(&self) {
        self.data.lock().clear();
        self.publish(InvalidationEvent::Cleared);
    }

    /// Simulates the loss of the connection carrying the event listener.
    ///
    /// Queued events are lost and every near cache on the connection is told.
    pub fn simulate_connection_lost(&self) -> usize {
        self.pending.lock().clear();
        let connection = *self.connection.lock();
        self.registry.connection_lost(connection)
    }

    /// Simulates the event listener being re-established on `connection`.
    ///
    /// Subsequent events are sent on `connection`. The previously published filter is
    /// forgotten, since the new server never received it.
    pub fn simulate_listener_reconnected(&self, connection: ConnectionId) -> bool {
        *self.connection.lock() = connection;
        *self.filter.lock() = None;
        self.served_since_filter.lock().clear();
        self.registry.listener_reconnected(connection, &self.cache_name)
    }

    fn record(&self, op: RemoteOp<K>) {
        self.operations.lock().push(op);
    }

    fn check_failure(&self) -> Result<(), Error> {
        self.fail_next.lock().take().map_or(Ok(()), Err)
    }

    fn version(&self) -> Version {
        Version::new(self.next_version.fetch_add(1, Ordering::Relaxed))
    }

    fn store(&self, key: K, value: V) {
        let version = self.version();
        self.data.lock().insert(key, VersionedValue::new(value, version));
    }

    fn should_notify(&self, key: &K) -> bool {
        let filter = self.filter.lock();
        filter.as_ref().is_none_or(|filter| {
            filter.might_contain(&key.key_bytes(), self.family.as_ref()) || self.served_since_filter.lock().contains(key)
        })
    }

    fn publish(&self, event: InvalidationEvent<K>) {
        if let Some(key) = event.key()
            && !self.should_notify(key)
        {
            return;
        }

        if self.holding.load(Ordering::Acquire) {
            self.pending.lock().push(event);
        } else {
            self.dispatch(event);
        }
    }

    fn dispatch(&self, event: InvalidationEvent<K>) {
        let connection = *self.connection.lock();
        // Nobody listening is not an error for the server.
        let _ = self.registry.dispatch(connection, &self.cache_name, event);
    }
}

impl<K, V> RemoteCache<K, V> for MockRemote<K, V>
where
    K: Clone + Eq + Hash + KeyBytes + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Result<Option<VersionedValue<V>>, Error> {
        self.record(RemoteOp::Get(key.clone()));
        self.check_failure()?;

        let value = self.data.lock().get(key).cloned();
        if value.is_some() && self.filter.lock().is_some() {
            self.served_since_filter.lock().insert(key.clone());
        }

        let hook = self.get_hook.lock().clone();
        if let Some(hook) = hook {
            hook(self, key);
        }
        Ok(value)
    }

    async fn put(&self, key: K, value: V) -> Result<(), Error> {
        self.record(RemoteOp::Put(key.clone()));
        self.check_failure()?;
        self.server_put(key, value);
        Ok(())
    }

    async fn put_if_absent(&self, key: K, value: V) -> Result<bool, Error> {
        self.record(RemoteOp::PutIfAbsent(key.clone()));
        self.check_failure()?;
        if self.data.lock().contains_key(&key) {
            return Ok(false);
        }
        self.server_put(key, value);
        Ok(true)
    }

    async fn replace(&self, key: K, value: V) -> Result<bool, Error> {
        self.record(RemoteOp::Replace(key.clone()));
        self.check_failure()?;
        if !self.data.lock().contains_key(&key) {
            return Ok(false);
        }
        self.server_put(key, value);
        Ok(true)
    }

    async fn replace_with_version(&self, key: K, value: V, expected: Version) -> Result<bool, Error> {
        self.record(RemoteOp::ReplaceWithVersion(key.clone()));
        self.check_failure()?;
        let current = self.data.lock().get(&key).map(VersionedValue::version);
        if current != Some(expected) {
            return Ok(false);
        }
        self.server_put(key, value);
        Ok(true)
    }

    async fn remove(&self, key: &K) -> Result<bool, Error> {
        self.record(RemoteOp::Remove(key.clone()));
        self.check_failure()?;
        let removed = self.data.lock().remove(key).is_some();
        if removed {
            self.publish(InvalidationEvent::Removed(key.clone()));
        }
        Ok(removed)
    }

    async fn remove_with_version(&self, key: &K, expected: Version) -> Result<bool, Error> {
        self.record(RemoteOp::RemoveWithVersion(key.clone()));
        self.check_failure()?;
        let removed = {
            let mut data = self.data.lock();
            if data.get(key).map(VersionedValue::version) == Some(expected) {
                data.remove(key);
                true
            } else {
                false
            }
        };
        if removed {
            self.publish(InvalidationEvent::Removed(key.clone()));
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), Error> {
        self.record(RemoteOp::Clear);
        self.check_failure()?;
        self.server_clear();
        Ok(())
    }

    async fn update_membership_filter(&self, snapshot: FilterSnapshot) -> Result<(), Error> {
        self.record(RemoteOp::UpdateMembershipFilter(snapshot.generation()));
        if let Some(error) = self.fail_next_filter_update.lock().take() {
            return Err(error);
        }
        *self.filter.lock() = Some(snapshot.clone());
        self.served_since_filter.lock().clear();
        self.filter_updates.fetch_add(1, Ordering::Relaxed);

        let hook = self.filter_hook.lock().clone();
        if let Some(hook) = hook {
            hook(self, &snapshot);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn writes_bump_versions() {
        let remote = MockRemote::<u32, u32>::new(&ListenerRegistry::new(), "versions");
        block_on(remote.put(1, 10)).unwrap();
        let first = remote.stored(&1).unwrap().version();
        block_on(remote.put(1, 11)).unwrap();
        assert!(remote.stored(&1).unwrap().version() > first);
    }

    #[test]
    fn versioned_writes_check_the_version() {
        let remote = MockRemote::<u32, u32>::new(&ListenerRegistry::new(), "versions");
        block_on(remote.put(1, 10)).unwrap();
        let version = remote.stored(&1).unwrap().version();

        assert!(!block_on(remote.replace_with_version(1, 20, Version::new(version.get() + 1))).unwrap());
        assert!(block_on(remote.replace_with_version(1, 20, version)).unwrap());
        assert!(!block_on(remote.remove_with_version(&1, version)).unwrap());
        assert_eq!(*remote.stored(&1).unwrap().value(), 20);
    }

    #[test]
    fn injected_failure_fails_once() {
        let remote = MockRemote::<u32, u32>::new(&ListenerRegistry::new(), "failures");
        remote.fail_next(Error::from_message("boom"));
        block_on(remote.get(&1)).unwrap_err();
        assert_eq!(block_on(remote.get(&1)).unwrap(), None);
        assert_eq!(remote.get_count(), 2);
    }

    #[test]
    fn filter_suppresses_events_for_unknown_keys() {
        let remote = MockRemote::<u32, u32>::new(&ListenerRegistry::new(), "filter");
        let filter = nearcache_bloom::MembershipFilter::for_capacity(64, Arc::new(Xxh3HashFamily::default()));
        filter.add(&1_u32.key_bytes());
        block_on(remote.update_membership_filter(filter.snapshot())).unwrap();

        assert!(remote.should_notify(&1));
        assert_eq!(remote.should_notify(&2), filter.test(&2_u32.key_bytes()));

        remote.server_put(3, 30);
        block_on(remote.get(&3)).unwrap();
        assert!(remote.should_notify(&3));
    }

    #[test]
    fn held_events_queue_until_delivered() {
        let remote = MockRemote::<u32, u32>::new(&ListenerRegistry::new(), "held");
        remote.hold_events();
        remote.server_put(1, 1);
        remote.server_remove(&1);
        assert_eq!(remote.pending_events(), 2);

        remote.deliver_pending();
        assert_eq!(remote.pending_events(), 0);
    }
}
