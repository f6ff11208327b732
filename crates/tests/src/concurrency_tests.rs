//! Concurrency tests for the shared pool, cache, and coordinator.
//!
//! The dispatcher pool and session cache are shared by every in-flight relay, so their
//! size bounds must hold when many tasks mutate them at once.

use crate::mock_infrastructure::{test_dispatcher, test_nodes, test_request, TestHarness};
use relay_core::{
    config::ConfigurationOptions,
    dispatch::{DispatcherPool, PoolCapacity},
    session::{Session, SessionCache, SessionHeader},
};
use std::{num::NonZeroUsize, sync::Arc};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_bound_holds_under_concurrent_adds() {
    let capacity = NonZeroUsize::new(8).unwrap();
    let pool = DispatcherPool::new([test_dispatcher(0)], PoolCapacity::Bounded(capacity)).unwrap();
    let pool = Arc::new(pool);

    let tasks: Vec<_> = (0..16)
        .map(|task| {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                for i in 0..50 {
                    pool.add(test_dispatcher(task * 100 + i));
                    assert!(pool.len() <= 8);
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(pool.len(), 8);
    let sample = pool.random_n(8).unwrap();
    let distinct: std::collections::HashSet<_> = sample.iter().collect();
    assert_eq!(distinct.len(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cache_bound_holds_under_concurrent_puts() {
    let cache = Arc::new(SessionCache::new(NonZeroUsize::new(5).unwrap()));
    let nodes = test_nodes(1);

    let tasks: Vec<_> = (0..8u64)
        .map(|task| {
            let cache = Arc::clone(&cache);
            let nodes = nodes.clone();
            tokio::spawn(async move {
                for height in 0..100u64 {
                    let header = SessionHeader::new("app", "0021", task * 1000 + height);
                    let session = Session::new(header.clone(), b"key".to_vec(), nodes.clone());
                    cache.put(header, Arc::new(session.unwrap()));
                    assert!(cache.len() <= 5);
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(cache.len(), 5);
    assert_eq!(cache.headers().len(), 5);
    assert_eq!(cache.stats().evictions, 800 - 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_relays_share_one_session() {
    let harness = Arc::new(TestHarness::new(ConfigurationOptions::default(), 3, test_nodes(4)));
    harness.transport.set_height(42);

    // Warm the cache so concurrent relays all hit it.
    harness.coordinator.send_relay(test_request("{}")).await.unwrap();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let harness = Arc::clone(&harness);
            tokio::spawn(async move { harness.coordinator.send_relay(test_request("{}")).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(harness.transport.dispatch_calls(), 1);
    assert_eq!(harness.coordinator.metrics().snapshot().relays_succeeded, 33);
}
