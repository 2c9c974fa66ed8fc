//! Refresh cache behavior against a scripted fetcher.

use estatemap_cache::{CacheConfig, EntryState, RefreshCache};
use estatemap_core::{DatasetKey, DatasetRegistry, FetchError};
use estatemap_test_utils::assertions::{
    assert_all_classified, assert_ids, assert_invalid_key, assert_source_unavailable,
};
use estatemap_test_utils::fixtures::{self, SAMPLE_IDS};
use estatemap_test_utils::{FetchGate, MockSourceFetcher};
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn key(name: &str) -> DatasetKey {
    DatasetKey::new(name)
}

fn setup(fetcher: MockSourceFetcher, config: CacheConfig) -> (Arc<MockSourceFetcher>, Arc<RefreshCache>) {
    let fetcher = Arc::new(fetcher);
    let cache = fixtures::cache_with(fetcher.clone(), DatasetRegistry::default(), config);
    (fetcher, Arc::new(cache))
}

async fn wait_for_calls(fetcher: &MockSourceFetcher, calls: usize) {
    while fetcher.calls() < calls {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_get_within_ttl_fetches_once() {
    let (fetcher, cache) = setup(MockSourceFetcher::new(), CacheConfig::default());

    let first = cache.get(&key("강남월세")).await.unwrap();
    let second = cache.get(&key("강남월세")).await.unwrap();

    assert_eq!(first.records(), second.records());
    assert_ids(first.records(), &SAMPLE_IDS);
    assert_all_classified(first.records());
    assert_eq!(fetcher.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_entry_refetched_once_under_contention() {
    let fetcher = MockSourceFetcher::new().with_delay(Duration::from_millis(200));
    let config = CacheConfig::new().with_ttl(Duration::from_secs(60));
    let (fetcher, cache) = setup(fetcher, config);

    cache.get(&key("송파월세")).await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(cache.entry_state(&key("송파월세")), EntryState::Stale);

    let target = key("송파월세");
    let reads = join_all((0..16).map(|_| cache.get(&target))).await;

    assert!(reads.iter().all(|read| read.is_ok()));
    assert_eq!(fetcher.calls_for("송파월세"), 2);
    assert_eq!(cache.entry_state(&target), EntryState::Cached);
}

#[tokio::test(start_paused = true)]
async fn test_ttl_boundary_is_exclusive() {
    let config = CacheConfig::new().with_ttl(Duration::from_secs(10));
    let (fetcher, cache) = setup(MockSourceFetcher::new(), config);

    cache.get(&key("강남전세")).await.unwrap();
    tokio::time::advance(Duration::from_millis(9_999)).await;
    assert!(cache.get(&key("강남전세")).await.unwrap().was_cache_hit());

    tokio::time::advance(Duration::from_millis(1)).await;
    assert!(!cache.get(&key("강남전세")).await.unwrap().was_cache_hit());
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_capacity_evicts_oldest_entry() {
    let config = CacheConfig::new().with_capacity(2);
    let (fetcher, cache) = setup(MockSourceFetcher::new(), config);

    for name in ["강남월세", "강남전세", "송파월세"] {
        cache.get(&key(name)).await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
    }

    assert_eq!(cache.cached_keys(), vec![key("강남전세"), key("송파월세")]);
    assert_eq!(cache.entry_state(&key("강남월세")), EntryState::Absent);
    assert_eq!(cache.stats().evictions, 1);

    // Evicted key misses; a surviving key still hits.
    assert!(!cache.get(&key("강남월세")).await.unwrap().was_cache_hit());
    assert_eq!(fetcher.calls_for("강남월세"), 2);
    assert_eq!(cache.cached_keys(), vec![key("송파월세"), key("강남월세")]);
}

#[tokio::test(start_paused = true)]
async fn test_eviction_ignores_remaining_ttl() {
    let registry = fixtures::registry_of(6);
    let fetcher = Arc::new(MockSourceFetcher::new());
    let cache = fixtures::cache_with(fetcher.clone(), registry, CacheConfig::default());

    for i in 0..6 {
        cache.get(&key(&format!("ds{}", i))).await.unwrap();
    }

    assert_eq!(cache.stats().entry_count, 5);
    assert_eq!(cache.entry_state(&key("ds0")), EntryState::Absent);
    assert_eq!(cache.entry_state(&key("ds5")), EntryState::Cached);
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let (fetcher, cache) = setup(MockSourceFetcher::new(), CacheConfig::default());

    cache.get(&key("강남월세")).await.unwrap();
    cache.get(&key("송파전세")).await.unwrap();
    assert_eq!(cache.invalidate(), 2);
    assert_eq!(cache.stats().entry_count, 0);

    let read = cache.get(&key("강남월세")).await.unwrap();
    assert!(!read.was_cache_hit());
    assert_eq!(fetcher.calls_for("강남월세"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_refresh_keeps_existing_entry() {
    let config = CacheConfig::new().with_ttl(Duration::from_secs(30));
    let (fetcher, cache) = setup(MockSourceFetcher::new(), config);

    let before = cache.get(&key("강남월세")).await.unwrap();
    tokio::time::advance(Duration::from_secs(31)).await;

    fetcher.respond("강남월세", Err(FetchError::unavailable("503 from upstream")));
    let failed = cache.get(&key("강남월세")).await;
    assert_source_unavailable(&failed);
    assert_eq!(cache.entry_state(&key("강남월세")), EntryState::Stale);
    assert_eq!(cache.cached_keys(), vec![key("강남월세")]);

    // No error is remembered: the next read retries.
    fetcher.respond("강남월세", Ok(fixtures::sample_rows()));
    let after = cache.get(&key("강남월세")).await.unwrap();
    assert_eq!(before.records(), after.records());
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(cache.stats().fetch_failures, 1);
}

#[tokio::test]
async fn test_failure_never_creates_entry() {
    let fetcher = MockSourceFetcher::new()
        .with_error("송파전세", FetchError::upstream_format("values is not an array"));
    let (_, cache) = setup(fetcher, CacheConfig::default());

    let result = cache.get(&key("송파전세")).await;
    assert!(matches!(result, Err(FetchError::UpstreamFormat { .. })));
    assert_eq!(cache.entry_state(&key("송파전세")), EntryState::Absent);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_fails_every_waiter_with_one_fetch() {
    let fetcher = MockSourceFetcher::new().with_delay(Duration::from_secs(60));
    let config = CacheConfig::new().with_fetch_timeout(Duration::from_secs(2));
    let (fetcher, cache) = setup(fetcher, config);

    let target = key("강남전세");
    let started = Instant::now();
    let reads = join_all((0..5).map(|_| cache.get(&target))).await;

    assert_eq!(fetcher.calls(), 1);
    assert!(started.elapsed() < Duration::from_secs(60));
    let first = reads[0].as_ref().unwrap_err().clone();
    assert!(matches!(first, FetchError::SourceUnavailable { .. }));
    for read in &reads {
        assert_eq!(read.as_ref().unwrap_err(), &first);
    }
    assert_eq!(cache.entry_state(&target), EntryState::Absent);
}

#[tokio::test(start_paused = true)]
async fn test_waiters_share_scripted_failure() {
    let fetcher = MockSourceFetcher::new()
        .with_delay(Duration::from_millis(500))
        .with_error("송파월세", FetchError::unavailable("connection reset"));
    let (fetcher, cache) = setup(fetcher, CacheConfig::default());

    let target = key("송파월세");
    let reads = join_all((0..8).map(|_| cache.get(&target))).await;

    assert_eq!(fetcher.calls(), 1);
    for read in &reads {
        assert_eq!(
            read.as_ref().unwrap_err(),
            &FetchError::unavailable("connection reset")
        );
    }
}

#[tokio::test]
async fn test_unknown_key_short_circuits() {
    let (fetcher, cache) = setup(MockSourceFetcher::new(), CacheConfig::default());

    let result = cache.get(&key("부산월세")).await;
    assert_invalid_key(&result);
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(cache.stats().misses, 0);
}

#[tokio::test(start_paused = true)]
async fn test_distinct_keys_fetch_in_parallel() {
    let fetcher = MockSourceFetcher::new().with_delay(Duration::from_secs(1));
    let (fetcher, cache) = setup(fetcher, CacheConfig::default());

    let keys = fixtures::dataset_keys();
    let started = Instant::now();
    let reads = join_all(keys.iter().map(|k| cache.get(k))).await;

    assert!(reads.iter().all(|read| read.is_ok()));
    assert_eq!(fetcher.calls(), 4);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_hit_does_not_wait_on_other_fetch() {
    let gate = FetchGate::new();
    let (fetcher, cache) = setup(MockSourceFetcher::new().with_gate(gate.clone()), CacheConfig::default());

    gate.open();
    cache.get(&key("강남월세")).await.unwrap();
    gate.close();

    let pending = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get(&key("송파전세")).await }
    });
    wait_for_calls(&fetcher, 2).await;
    assert_eq!(cache.entry_state(&key("송파전세")), EntryState::Fetching);

    let hit = tokio::time::timeout(Duration::from_secs(1), cache.get(&key("강남월세")))
        .await
        .expect("hit blocked behind another key's fetch")
        .unwrap();
    assert!(hit.was_cache_hit());

    gate.open();
    assert!(pending.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_refresh_racing_invalidate_is_not_stored() {
    let gate = FetchGate::new();
    let (fetcher, cache) = setup(MockSourceFetcher::new().with_gate(gate.clone()), CacheConfig::default());

    let pending = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get(&key("강남월세")).await }
    });
    wait_for_calls(&fetcher, 1).await;

    cache.invalidate();
    gate.open();

    // The waiter still gets its records.
    let read = pending.await.unwrap().unwrap();
    assert_ids(read.records(), &SAMPLE_IDS);
    assert_eq!(cache.entry_state(&key("강남월세")), EntryState::Absent);

    cache.get(&key("강남월세")).await.unwrap();
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_cancelled_leader_hands_off_to_next_caller() {
    let gate = FetchGate::new();
    let (fetcher, cache) = setup(MockSourceFetcher::new().with_gate(gate.clone()), CacheConfig::default());

    let leader = tokio::spawn({
        let cache = cache.clone();
        async move { cache.get(&key("강남전세")).await }
    });
    wait_for_calls(&fetcher, 1).await;
    leader.abort();
    let _ = leader.await;

    gate.open();
    let read = cache.get(&key("강남전세")).await.unwrap();
    assert!(!read.was_cache_hit());
    assert_eq!(fetcher.calls(), 2);
}
