// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Routing of transport notifications to near caches.
//!
//! A transport knows connections and cache names, not near cache instances. The
//! [`ListenerRegistry`] maps `(connection, cache name)` to the listeners a near cache
//! registered, so invalidation events and connection loss reach the right instance.

use std::{
    any::Any,
    collections::HashMap,
    fmt,
    sync::{
        Arc, LazyLock,
        atomic::{AtomicU64, Ordering},
    },
};

use nearcache_tier::Error;
use parking_lot::RwLock;

use crate::InvalidationEvent;

static GLOBAL: LazyLock<ListenerRegistry> = LazyLock::new(ListenerRegistry::new);

/// Identifies one server connection of a client.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a connection id from its raw form.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw form.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection-{}", self.0)
    }
}

/// Receives the invalidation events of one cache.
///
/// Called from transport threads. Implementations must not block.
pub trait InvalidationListener<K>: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: InvalidationEvent<K>);
}

/// Receives connection state changes.
pub trait ConnectionListener: Send + Sync {
    /// The connection was lost and its server may be gone.
    ///
    /// Must complete its local effects before returning.
    fn on_connection_lost(&self);

    /// The server-side event listener was re-established.
    ///
    /// Events may have been missed in between. The default does nothing.
    fn on_listener_reconnected(&self) {}
}

struct Entry {
    id: u64,
    // Holds an `Arc<dyn InvalidationListener<K>>` for the key type the cache was registered with.
    invalidation: Arc<dyn Any + Send + Sync>,
    connection: Arc<dyn ConnectionListener>,
}

#[derive(Default)]
struct RegistryInner {
    entries: RwLock<HashMap<ConnectionId, HashMap<Arc<str>, Entry>>>,
    next_id: AtomicU64,
}

/// A table of near cache listeners keyed by connection and cache name.
///
/// [`ListenerRegistry::global`] is the process-wide instance transports use. Separate
/// instances can be created for isolation, which is what tests do.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use nearcache::{ConnectionId, ConnectionListener, InvalidationEvent, InvalidationListener, ListenerRegistry};
///
/// struct Printer;
///
/// impl InvalidationListener<String> for Printer {
///     fn on_event(&self, event: InvalidationEvent<String>) {
///         println!("{event:?}");
///     }
/// }
///
/// impl ConnectionListener for Printer {
///     fn on_connection_lost(&self) {}
/// }
///
/// let registry = ListenerRegistry::new();
/// let listener = Arc::new(Printer);
/// let registration = registry.register::<String>(ConnectionId::new(1), "orders", listener.clone(), listener)?;
///
/// registry.dispatch(ConnectionId::new(1), "orders", InvalidationEvent::Removed("k".to_string()))?;
/// drop(registration);
/// assert!(registry.is_empty());
/// # Ok::<(), nearcache_tier::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<RegistryInner>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry").field("len", &self.len()).finish()
    }
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Registers the listeners of `cache_name` on `connection`.
    ///
    /// The entry stays until the returned [`Registration`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is already registered on that connection.
    pub fn register<K: 'static>(
        &self,
        connection: ConnectionId,
        cache_name: &str,
        invalidation: Arc<dyn InvalidationListener<K>>,
        connection_listener: Arc<dyn ConnectionListener>,
    ) -> Result<Registration, Error> {
        let cache_name: Arc<str> = Arc::from(cache_name);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        let mut entries = self.inner.entries.write();
        let caches = entries.entry(connection).or_default();
        if caches.contains_key(&cache_name) {
            return Err(Error::from_message(format!(
                "cache '{cache_name}' is already registered on {connection}"
            )));
        }

        caches.insert(
            Arc::clone(&cache_name),
            Entry {
                id,
                invalidation: Arc::new(invalidation),
                connection: connection_listener,
            },
        );

        Ok(Registration {
            registry: self.clone(),
            connection,
            cache_name,
            id,
        })
    }

    /// Delivers `event` to the invalidation listener of `cache_name` on `connection`.
    ///
    /// The listener runs on the calling thread, outside the registry lock.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing is registered for the target, or if it was registered
    /// with a different key type.
    pub fn dispatch<K: 'static>(&self, connection: ConnectionId, cache_name: &str, event: InvalidationEvent<K>) -> Result<(), Error> {
        let listener = {
            let entries = self.inner.entries.read();
            let entry = entries
                .get(&connection)
                .and_then(|caches| caches.get(cache_name))
                .ok_or_else(|| Error::from_message(format!("no near cache '{cache_name}' registered on {connection}")))?;

            entry
                .invalidation
                .downcast_ref::<Arc<dyn InvalidationListener<K>>>()
                .map(Arc::clone)
                .ok_or_else(|| Error::from_message(format!("near cache '{cache_name}' uses a different key type")))?
        };

        listener.on_event(event);
        Ok(())
    }

    /// Notifies every listener registered on `connection` that it was lost.
    ///
    /// Returns how many listeners were notified.
    pub fn connection_lost(&self, connection: ConnectionId) -> usize {
        let listeners = self.connection_listeners(connection, None);
        for listener in &listeners {
            listener.on_connection_lost();
        }
        listeners.len()
    }

    /// Notifies the listener of `cache_name` on `connection` that its server-side event
    /// listener was re-established.
    ///
    /// Returns `false` if nothing is registered for the target.
    pub fn listener_reconnected(&self, connection: ConnectionId, cache_name: &str) -> bool {
        let listeners = self.connection_listeners(connection, Some(cache_name));
        for listener in &listeners {
            listener.on_listener_reconnected();
        }
        !listeners.is_empty()
    }

    /// Returns `true` if `cache_name` is registered on `connection`.
    #[must_use]
    pub fn contains(&self, connection: ConnectionId, cache_name: &str) -> bool {
        self.inner
            .entries
            .read()
            .get(&connection)
            .is_some_and(|caches| caches.contains_key(cache_name))
    }

    /// Returns the number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.read().values().map(HashMap::len).sum()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn connection_listeners(&self, connection: ConnectionId, cache_name: Option<&str>) -> Vec<Arc<dyn ConnectionListener>> {
        let entries = self.inner.entries.read();
        let Some(caches) = entries.get(&connection) else {
            return Vec::new();
        };

        caches
            .iter()
            .filter(|(name, _)| cache_name.is_none_or(|wanted| &***name == wanted))
            .map(|(_, entry)| Arc::clone(&entry.connection))
            .collect()
    }

    fn deregister(&self, connection: ConnectionId, cache_name: &str, id: u64) {
        let mut entries = self.inner.entries.write();
        if let Some(caches) = entries.get_mut(&connection) {
            if caches.get(cache_name).is_some_and(|entry| entry.id == id) {
                caches.remove(cache_name);
            }
            if caches.is_empty() {
                entries.remove(&connection);
            }
        }
    }
}

/// Keeps a registry entry alive. Dropping it deregisters the entry.
#[derive(Debug)]
pub struct Registration {
    registry: ListenerRegistry,
    connection: ConnectionId,
    cache_name: Arc<str>,
    id: u64,
}

impl Registration {
    /// Returns the connection the entry is registered on.
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Returns the registered cache name.
    #[must_use]
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    /// Returns the registry holding the entry.
    #[must_use]
    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.deregister(self.connection, &self.cache_name, self.id);
    }
}
