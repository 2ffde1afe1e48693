// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for using near caches with `layered` services.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use layered::Service;
use nearcache::{
    Capacity, Error, ListenerRegistry, NearCacheConfig, NearCacheMode, NearCacheService, NearRemoteCache, RemoteOperation,
    RemoteResponse, ServiceRemote, Version, VersionedValue, testing::MockRemote,
};
use nearcache_service::{GetRequest, PutRequest, RemoveRequest};
use parking_lot::Mutex;
use tick::Clock;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

fn service(registry: &ListenerRegistry, name: &str) -> NearCacheService<String, i32> {
    let config = NearCacheConfig::builder()
        .mode(NearCacheMode::Invalidated)
        .max_entries(Capacity::Bounded(32))
        .build();
    NearCacheService::builder(name, config, Clock::new_frozen())
        .registry(registry.clone())
        .build()
        .unwrap()
}

#[test]
fn execute_serves_repeated_gets_locally() -> Result<(), Error> {
    let registry = ListenerRegistry::new();
    let cache = NearRemoteCache::new(MockRemote::new(&registry, "svc"), service(&registry, "svc"));
    cache.remote().server_put("k".to_string(), 5);

    block_on(async {
        for _ in 0..3 {
            let response = cache.execute(RemoteOperation::Get(GetRequest::new("k".to_string()))).await?;
            assert_eq!(response.into_value().map(VersionedValue::into_value), Some(5));
        }
        Ok::<_, Error>(())
    })?;

    assert_eq!(cache.remote().get_count(), 1);
    Ok(())
}

#[test]
fn execute_write_removes_before_polling() -> Result<(), Error> {
    let registry = ListenerRegistry::new();
    let cache = NearRemoteCache::new(MockRemote::new(&registry, "svc-write"), service(&registry, "svc-write"));
    cache.remote().server_put("k".to_string(), 1);
    block_on(cache.execute(RemoteOperation::Get(GetRequest::new("k".to_string()))))?;
    assert_eq!(cache.size(), 1);

    let pending = cache.execute(RemoteOperation::Put(PutRequest::new("k".to_string(), 2)));
    assert_eq!(cache.size(), 0);

    assert!(matches!(block_on(pending)?, RemoteResponse::Put));
    let response = block_on(cache.execute(RemoteOperation::Get(GetRequest::new("k".to_string()))))?;
    assert_eq!(response.into_value().map(VersionedValue::into_value), Some(2));
    Ok(())
}

#[test]
fn execute_clear_resets_immediately() -> Result<(), Error> {
    let registry = ListenerRegistry::new();
    let cache = NearRemoteCache::new(MockRemote::new(&registry, "svc-clear"), service(&registry, "svc-clear"));
    cache.remote().server_put("k".to_string(), 1);
    block_on(cache.execute(RemoteOperation::Get(GetRequest::new("k".to_string()))))?;

    let pending = cache.execute(RemoteOperation::Clear);
    assert_eq!(cache.size(), 0);
    assert!(matches!(block_on(pending)?, RemoteResponse::Clear));

    let removed = block_on(cache.execute(RemoteOperation::Remove(RemoveRequest::new("k".to_string()))))?;
    assert!(matches!(removed, RemoteResponse::Applied(false)));
    Ok(())
}

/// A backend speaking remote operations, as a transport would.
#[derive(Default)]
struct Backend {
    data: Mutex<HashMap<String, i32>>,
    gets: AtomicUsize,
}

impl Service<RemoteOperation<String, i32>> for Backend {
    type Out = Result<RemoteResponse<i32>, Error>;

    async fn execute(&self, input: RemoteOperation<String, i32>) -> Self::Out {
        let mut data = self.data.lock();
        Ok(match input {
            RemoteOperation::Get(request) => {
                self.gets.fetch_add(1, Ordering::Relaxed);
                RemoteResponse::Get(data.get(&request.key).map(|value| VersionedValue::new(*value, Version::new(1))))
            }
            RemoteOperation::Put(request) => {
                data.insert(request.key, request.value);
                RemoteResponse::Put
            }
            RemoteOperation::Remove(request) => RemoteResponse::Applied(data.remove(&request.key).is_some()),
            RemoteOperation::Clear => {
                data.clear();
                RemoteResponse::Clear
            }
            RemoteOperation::UpdateMembershipFilter(_) => RemoteResponse::FilterUpdated,
            _ => RemoteResponse::Applied(false),
        })
    }
}

#[test]
fn service_backend_can_be_decorated() -> Result<(), Error> {
    use nearcache::RemoteCache;

    let registry = ListenerRegistry::new();
    let remote = ServiceRemote::new(Backend::default());
    let cache = NearRemoteCache::new(remote, service(&registry, "svc-backend"));

    block_on(async {
        cache.put("a".to_string(), 1).await?;
        assert_eq!(cache.get_value(&"a".to_string()).await?, Some(1));
        assert_eq!(cache.get_value(&"a".to_string()).await?, Some(1));

        cache.put("a".to_string(), 2).await?;
        assert_eq!(cache.get_value(&"a".to_string()).await?, Some(2));
        Ok::<_, Error>(())
    })?;

    assert_eq!(cache.remote().inner().gets.load(Ordering::Relaxed), 2);
    Ok(())
}
