// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Client-side near caching for remote caches.
//!
//! A near cache keeps a bounded local copy of recently read entries and stays consistent
//! with the remote cache through invalidation events pushed by the server. Reads are served
//! locally when possible; writes always go to the server and remove the key locally the
//! moment they are issued.
//!
//! The crate provides:
//! - [`NearRemoteCache`]: a [`RemoteCache`] decorator, and the usual entry point
//! - [`NearCacheService`]: the consistency protocol behind it, for transports that deliver
//!   events themselves
//! - [`FailoverHandler`]: drops local state when the event stream is interrupted
//! - [`ListenerRegistry`]: routes events and connection changes to the right near cache
//! - [`NearCacheConfig`] and [`ClientNearCacheConfig`]: per-cache and client-wide settings,
//!   including parsing from client properties
//!
//! # Consistency
//!
//! A key is held locally only after a successful remote read, and only if nothing
//! invalidated the key while the read was in flight. Every event, local write, eviction,
//! failover and bulk clear removes state; none of them ever writes a value. A client
//! therefore never serves a value older than its own last write, and never serves a value
//! older than the last event it processed for the key.
//!
//! # Configuration
//!
//! ```
//! use nearcache::{ClientNearCacheConfig, NearCacheMode};
//! use nearcache_tier::Capacity;
//!
//! let config = ClientNearCacheConfig::from_properties([
//!     ("infinispan.client.hotrod.near_cache.mode", "INVALIDATED"),
//!     ("infinispan.client.hotrod.near_cache.max_entries", "1000"),
//!     ("infinispan.client.hotrod.near_cache.name_pattern", "orders-.*"),
//!     ("infinispan.client.hotrod.near_cache.bloom_filter", "true"),
//! ])?;
//!
//! let orders = config.resolve("orders-eu");
//! assert_eq!(orders.mode(), NearCacheMode::Invalidated);
//! assert_eq!(orders.max_entries(), Some(Capacity::Bounded(1000)));
//! assert!(orders.bloom_filter());
//!
//! assert!(!config.resolve("sessions").mode().enabled());
//! # Ok::<(), nearcache::ConfigError>(())
//! ```
//!
//! # Features
//!
//! - `logs`: emit every protocol activity as a structured `tracing` event
//! - `metrics`: record activity counts and local size with OpenTelemetry
//! - `service`: use a near cache as a `layered::Service` over remote operations
//! - `test-util`: the [`testing::MockRemote`] server double

pub mod config;
mod error;
mod event;
mod failover;
mod near;
pub mod registry;
mod service;
mod stamps;
mod stats;
mod sync;
mod telemetry;

#[cfg(any(feature = "test-util", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod testing;

#[doc(inline)]
pub use config::{ClientNearCacheConfig, NearCacheConfig, NearCacheConfigBuilder, NearCacheMode};
#[doc(inline)]
pub use error::ConfigError;
#[doc(inline)]
pub use event::InvalidationEvent;
#[doc(inline)]
pub use failover::FailoverHandler;
#[doc(inline)]
pub use near::NearRemoteCache;
#[doc(inline)]
pub use nearcache_bloom::{MembershipFilter, Xxh3HashFamily};
#[doc(inline)]
pub use nearcache_memory::InMemoryTier;
#[cfg(feature = "service")]
#[doc(inline)]
pub use nearcache_service::{RemoteOperation, RemoteResponse, ServiceRemote};
#[doc(inline)]
pub use nearcache_tier::{Capacity, Error, FilterSnapshot, HashFamily, KeyBytes, LocalTier, RemoteCache, Version, VersionedValue};
#[doc(inline)]
pub use registry::{ConnectionId, ConnectionListener, InvalidationListener, ListenerRegistry, Registration};
#[doc(inline)]
pub use service::{NearCacheService, NearCacheServiceBuilder};
#[doc(inline)]
pub use stats::NearCacheStats;
#[doc(inline)]
pub use telemetry::TelemetryConfig;
