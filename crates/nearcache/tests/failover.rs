// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for failover handling.

use nearcache::{
    Capacity, ConnectionId, Error, ListenerRegistry, NearCacheConfig, NearCacheMode, NearCacheService, NearRemoteCache,
    RemoteCache, testing::MockRemote,
};
use nearcache_tier::testing::{LocalOp, MockLocalTier};
use tick::Clock;

type TestResult = Result<(), Error>;
type Near = NearRemoteCache<String, u64, MockRemote<String, u64>>;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

fn near(registry: &ListenerRegistry, local: MockLocalTier<String, u64>, bloom: bool) -> Near {
    let config = NearCacheConfig::builder()
        .mode(NearCacheMode::Invalidated)
        .max_entries(Capacity::Bounded(128))
        .bloom_filter(bloom)
        .build();
    let service = NearCacheService::builder("accounts", config, Clock::new_frozen())
        .local_tier(local)
        .registry(registry.clone())
        .build()
        .unwrap();
    NearRemoteCache::new(MockRemote::new(registry, "accounts"), service)
}

fn key(n: u32) -> String {
    format!("account:{n}")
}

#[test]
fn failover_clears_then_readmits_on_next_read() -> TestResult {
    let registry = ListenerRegistry::new();
    let local = MockLocalTier::new();
    let cache = near(&registry, local.clone(), false);

    block_on(async {
        for n in 0..5 {
            cache.remote().server_put(key(n), u64::from(n));
            cache.get(&key(n)).await?;
        }
        Ok::<_, Error>(())
    })?;
    assert_eq!(cache.size(), 5);
    local.clear_operations();

    assert_eq!(cache.remote().simulate_connection_lost(), 1);
    assert_eq!(cache.size(), 0);
    assert!(!cache.is_connected());

    // Reads keep populating the near cache while disconnected.
    assert_eq!(block_on(cache.get_value(&key(1)))?, Some(1));

    assert_eq!(
        local.operations(),
        vec![
            LocalOp::Clear,
            LocalOp::Get(key(1)),
            LocalOp::PutIfAbsent { key: key(1), inserted: true },
        ]
    );
    assert_eq!(cache.stats().unwrap().full_resets, 1);
    Ok(())
}

#[test]
fn events_lost_during_outage_cannot_leave_stale_entries() -> TestResult {
    let registry = ListenerRegistry::new();
    let cache = near(&registry, MockLocalTier::new(), false);

    block_on(async {
        cache.remote().server_put(key(1), 1);
        assert_eq!(cache.get_value(&key(1)).await?, Some(1));
        Ok::<_, Error>(())
    })?;

    // The update happens while the event is stuck, and the event is then lost.
    cache.remote().hold_events();
    cache.remote().server_put(key(1), 2);
    cache.remote().simulate_connection_lost();
    assert_eq!(cache.remote().pending_events(), 0);

    assert_eq!(block_on(cache.get_value(&key(1)))?, Some(2));
    Ok(())
}

#[test]
fn rebind_and_reconnect_restore_connected_state() -> TestResult {
    let registry = ListenerRegistry::new();
    let cache = near(&registry, MockLocalTier::new(), true);
    let service = cache.service().unwrap();

    block_on(async {
        cache.remote().server_put(key(1), 1);
        cache.get(&key(1)).await?;
        cache.force_filter_sync().await?;
        Ok::<_, Error>(())
    })?;
    assert!(!service.needs_filter_sync());

    cache.remote().simulate_connection_lost();
    assert!(!cache.is_connected());
    assert!(service.needs_filter_sync());

    let replacement = ConnectionId::new(7);
    service.rebind(replacement)?;
    assert_eq!(service.connection(), Some(replacement));
    assert!(registry.contains(replacement, "accounts"));
    assert!(!registry.contains(ConnectionId::default(), "accounts"));

    block_on(cache.get(&key(1)))?;
    assert_eq!(cache.size(), 1);

    assert!(cache.remote().simulate_listener_reconnected(replacement));
    assert!(cache.is_connected());
    assert_eq!(cache.size(), 0);
    assert_eq!(service.stats().full_resets, 2);

    // Events now flow on the new connection.
    block_on(cache.get(&key(1)))?;
    cache.remote().server_put(key(1), 3);
    assert_eq!(cache.size(), 0);
    assert_eq!(block_on(cache.get_value(&key(1)))?, Some(3));
    Ok(())
}

#[test]
fn failed_rebind_keeps_the_current_registration() -> TestResult {
    let registry = ListenerRegistry::new();
    let cache = near(&registry, MockLocalTier::new(), false);
    let service = cache.service().unwrap();

    let taken = ConnectionId::new(2);
    let config = NearCacheConfig::builder()
        .mode(NearCacheMode::Invalidated)
        .max_entries(Capacity::Bounded(8))
        .build();
    let _other = NearCacheService::<String, u64>::builder("accounts", config, Clock::new_frozen())
        .registry(registry.clone())
        .connection(taken)
        .build()
        .unwrap();

    service.rebind(taken).unwrap_err();

    assert_eq!(service.connection(), Some(ConnectionId::default()));
    assert!(registry.contains(ConnectionId::default(), "accounts"));

    // Invalidations keep arriving on the original connection.
    block_on(async {
        cache.remote().server_put(key(1), 1);
        cache.get(&key(1)).await?;
        Ok::<_, Error>(())
    })?;
    cache.remote().server_put(key(1), 2);
    assert_eq!(cache.size(), 0);
    Ok(())
}

#[test]
fn rebind_to_the_current_connection_is_a_noop() -> TestResult {
    let registry = ListenerRegistry::new();
    let cache = near(&registry, MockLocalTier::new(), false);
    let service = cache.service().unwrap();

    service.rebind(ConnectionId::default())?;

    assert_eq!(service.connection(), Some(ConnectionId::default()));
    assert_eq!(registry.len(), 1);
    Ok(())
}

#[test]
fn failover_reaches_every_cache_on_the_connection() -> TestResult {
    let registry = ListenerRegistry::new();
    let config = NearCacheConfig::builder()
        .mode(NearCacheMode::Invalidated)
        .max_entries(Capacity::Unbounded)
        .build();
    let services: Vec<NearCacheService<u32, u32>> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            NearCacheService::builder(name, config.clone(), Clock::new_frozen())
                .registry(registry.clone())
                .build()
                .unwrap()
        })
        .collect();

    assert_eq!(registry.connection_lost(ConnectionId::default()), 3);
    assert!(services.iter().all(|service| !service.is_connected()));
    assert!(services.iter().all(|service| service.stats().full_resets == 1));
    Ok(())
}

#[test]
fn dropping_the_cache_deregisters_it() {
    let registry = ListenerRegistry::new();
    let cache = near(&registry, MockLocalTier::new(), false);
    assert!(registry.contains(ConnectionId::default(), "accounts"));

    drop(cache);

    assert!(registry.is_empty());
}

#[test]
fn duplicate_registration_is_rejected() {
    let registry = ListenerRegistry::new();
    let _first = near(&registry, MockLocalTier::new(), false);

    let config = NearCacheConfig::builder()
        .mode(NearCacheMode::Invalidated)
        .max_entries(Capacity::Bounded(8))
        .build();
    let error = NearCacheService::<String, u64>::builder("accounts", config, Clock::new_frozen())
        .registry(registry.clone())
        .build()
        .unwrap_err();
    assert_eq!(error.cache_name(), "accounts");
}
