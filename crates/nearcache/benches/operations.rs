// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Benchmarks for the near cache read, write and invalidation paths.

#![allow(missing_docs, reason = "Benchmark code")]

use std::{hint::black_box, time::Instant};

use criterion::{Criterion, criterion_group, criterion_main};
use futures::executor::block_on;
use nearcache::{
    Capacity, InvalidationEvent, ListenerRegistry, NearCacheConfig, NearCacheMode, NearCacheService, NearRemoteCache,
    RemoteCache, testing::MockRemote,
};
use tick::Clock;

const KEYS: u64 = 1000;

fn near(name: &str, bloom: bool) -> NearRemoteCache<u64, String, MockRemote<u64, String>> {
    let registry = ListenerRegistry::new();
    let config = NearCacheConfig::builder()
        .mode(NearCacheMode::Invalidated)
        .max_entries(Capacity::Bounded(KEYS * 2))
        .bloom_filter(bloom)
        .build();
    let service = NearCacheService::builder(name, config, Clock::new_frozen())
        .registry(registry.clone())
        .build()
        .expect("valid configuration");
    let cache = NearRemoteCache::new(MockRemote::new(&registry, name), service);
    for key in 0..KEYS {
        cache.remote().server_put(key, format!("value_{key}"));
    }
    cache
}

fn bench_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("reads");

    for (label, bloom) in [("get_hit", false), ("get_hit_bloom", true)] {
        group.bench_function(label, |b| {
            let cache = near(label, bloom);
            block_on(async {
                for key in 0..KEYS {
                    cache.get(&key).await.expect("remote is healthy");
                }
            });

            b.iter_custom(|iters| {
                block_on(async {
                    let start = Instant::now();
                    for i in 0..iters {
                        black_box(cache.get(&(i % KEYS)).await.expect("remote is healthy"));
                    }
                    start.elapsed()
                })
            });
        });
    }

    group.bench_function("get_miss_and_admit", |b| {
        let cache = near("get_miss", false);
        let service = cache.service().expect("near cache enabled").clone();

        b.iter_custom(|iters| {
            block_on(async {
                let start = Instant::now();
                for i in 0..iters {
                    let key = i % KEYS;
                    service.apply(InvalidationEvent::Removed(key));
                    black_box(cache.get(&key).await.expect("remote is healthy"));
                }
                start.elapsed()
            })
        });
    });

    group.finish();
}

fn bench_invalidation(c: &mut Criterion) {
    let mut group = c.benchmark_group("invalidation");

    group.bench_function("preempt", |b| {
        let cache = near("preempt", true);
        let service = cache.service().expect("near cache enabled").clone();
        b.iter(|| service.preempt(black_box(&42)));
    });

    group.bench_function("apply_modified", |b| {
        let cache = near("apply", true);
        let service = cache.service().expect("near cache enabled").clone();
        b.iter(|| service.apply(InvalidationEvent::Modified(black_box(7))));
    });

    group.bench_function("full_reset", |b| {
        let cache = near("reset", true);
        let service = cache.service().expect("near cache enabled").clone();
        b.iter(|| service.reset());
    });

    group.finish();
}

criterion_group!(benches, bench_reads, bench_invalidation);
criterion_main!(benches);
