//! Behavior-driven tests for the two-tier response cache.

use std::sync::Arc;
use std::time::Duration;

use apex_core::{
    CacheLookup, CacheStore, Clock, DuckDbStore, DurableStore, ManualClock, MemoryStore,
    StoreError,
};
use apex_store::{StoreFuture, StoreStats, StoredEntry};

const START_MS: i64 = 1_705_276_800_000;
const RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
const KEY: &str = "apex:v1:teams:basketball:0011223344556677";

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(START_MS))
}

fn cache_over(durable: Arc<dyn DurableStore>, clock: &Arc<ManualClock>) -> CacheStore {
    let clock: Arc<dyn Clock> = clock.clone();
    CacheStore::new(Some(durable), clock, RETENTION)
}

/// Durable tier that is always unreachable.
struct UnreachableStore;

impl UnreachableStore {
    fn error() -> StoreError {
        StoreError::Io(std::io::Error::other("store offline"))
    }
}

impl DurableStore for UnreachableStore {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<StoredEntry>> {
        Box::pin(async { Err(Self::error()) })
    }

    fn set<'a>(&'a self, _entry: StoredEntry) -> StoreFuture<'a, ()> {
        Box::pin(async { Err(Self::error()) })
    }

    fn delete<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async { Err(Self::error()) })
    }

    fn clear<'a>(&'a self) -> StoreFuture<'a, usize> {
        Box::pin(async { Err(Self::error()) })
    }

    fn sweep<'a>(&'a self, _cutoff_ms: i64) -> StoreFuture<'a, usize> {
        Box::pin(async { Err(Self::error()) })
    }

    fn stats<'a>(&'a self) -> StoreFuture<'a, StoreStats> {
        Box::pin(async { Err(Self::error()) })
    }
}

// =============================================================================
// Freshness lifecycle
// =============================================================================

#[tokio::test]
async fn entry_moves_from_fresh_to_stale_to_swept() {
    // Given: an entry with a 60s TTL
    let clock = clock();
    let cache = cache_over(Arc::new(MemoryStore::new()), &clock);
    cache
        .set(KEY, String::from("payload"), Duration::from_secs(60))
        .await
        .expect("write");
    assert_eq!(cache.lookup(KEY).await, CacheLookup::Fresh(String::from("payload")));

    // When: the TTL passes by ten minutes
    clock.advance(Duration::from_secs(60 + 600));

    // Then: it is no longer served as fresh but remains readable as stale
    assert_eq!(cache.get(KEY).await, None);
    assert_eq!(
        cache.lookup(KEY).await,
        CacheLookup::Stale {
            value: String::from("payload"),
            age_past_ttl: Duration::from_secs(600),
        }
    );
    assert_eq!(cache.sweep_expired().await.expect("sweep"), 0);

    // And: once retention has also passed, a sweep reclaims it
    clock.advance(RETENTION);
    assert_eq!(cache.sweep_expired().await.expect("sweep"), 1);
    assert_eq!(cache.lookup(KEY).await, CacheLookup::Miss);
}

#[tokio::test]
async fn overwrite_resets_the_ttl() {
    let clock = clock();
    let cache = cache_over(Arc::new(MemoryStore::new()), &clock);
    cache
        .set(KEY, String::from("old"), Duration::from_secs(60))
        .await
        .expect("write");
    clock.advance(Duration::from_secs(90));

    cache
        .set(KEY, String::from("new"), Duration::from_secs(60))
        .await
        .expect("write");

    assert_eq!(cache.get(KEY).await, Some(String::from("new")));
}

#[tokio::test]
async fn counters_track_hits_stale_hits_and_misses() {
    let clock = clock();
    let cache = cache_over(Arc::new(MemoryStore::new()), &clock);
    cache
        .set(KEY, String::from("payload"), Duration::from_secs(1))
        .await
        .expect("write");

    cache.lookup(KEY).await;
    cache.lookup("apex:v1:odds:hockey:ffffffffffffffff").await;
    clock.advance(Duration::from_secs(2));
    cache.lookup(KEY).await;

    let stats = cache.stats().await;
    assert_eq!((stats.hits, stats.stale_hits, stats.misses), (1, 1, 1));
    assert_eq!(stats.total_entries, 1);
    assert!(stats.average_entry_bytes > 0.0);
}

// =============================================================================
// Shared durable tier
// =============================================================================

#[tokio::test]
async fn write_in_one_instance_is_visible_in_another() {
    // Given: two cache instances over the same durable store
    let clock = clock();
    let shared = MemoryStore::new();
    let writer = cache_over(Arc::new(shared.clone()), &clock);
    let reader = cache_over(Arc::new(shared), &clock);

    // When: one instance writes
    writer
        .set(KEY, String::from("payload"), Duration::from_secs(60))
        .await
        .expect("write");

    // Then: the other reads it through tier 2 and keeps the original expiry
    assert_eq!(reader.get(KEY).await, Some(String::from("payload")));
    assert_eq!(reader.stats().await.tier1_entries, 1);
    clock.advance(Duration::from_secs(61));
    assert!(matches!(reader.lookup(KEY).await, CacheLookup::Stale { .. }));
}

#[tokio::test]
async fn newer_write_elsewhere_supersedes_an_expired_local_copy() {
    // Given: a reader that copied a 10s entry into its process memory
    let clock = clock();
    let shared = MemoryStore::new();
    let writer = cache_over(Arc::new(shared.clone()), &clock);
    let reader = cache_over(Arc::new(shared), &clock);
    writer
        .set(KEY, String::from("old"), Duration::from_secs(10))
        .await
        .expect("write");
    assert_eq!(reader.get(KEY).await, Some(String::from("old")));

    // When: the copy expires and another instance refreshes the key
    clock.advance(Duration::from_secs(11));
    writer
        .set(KEY, String::from("new"), Duration::from_secs(10))
        .await
        .expect("write");

    // Then: the reader serves the newer value as fresh
    assert_eq!(reader.lookup(KEY).await, CacheLookup::Fresh(String::from("new")));
    assert_eq!(reader.get(KEY).await, Some(String::from("new")));
}

#[tokio::test]
async fn expired_local_copy_is_kept_when_nothing_newer_exists() {
    let clock = clock();
    let cache = cache_over(Arc::new(MemoryStore::new()), &clock);
    cache
        .set(KEY, String::from("payload"), Duration::from_secs(10))
        .await
        .expect("write");

    clock.advance(Duration::from_secs(15));

    assert_eq!(
        cache.lookup(KEY).await,
        CacheLookup::Stale {
            value: String::from("payload"),
            age_past_ttl: Duration::from_secs(5),
        }
    );
}

#[tokio::test]
async fn delete_and_clear_reach_both_tiers() {
    let clock = clock();
    let shared = MemoryStore::new();
    let cache = cache_over(Arc::new(shared.clone()), &clock);
    let other = cache_over(Arc::new(shared), &clock);
    for key in ["a", "b", "c"] {
        cache
            .set(key, String::from("v"), Duration::from_secs(60))
            .await
            .expect("write");
    }

    assert!(cache.delete("a").await.expect("delete"));
    assert!(!cache.delete("a").await.expect("delete"));
    assert_eq!(other.get("a").await, None);

    assert_eq!(cache.clear().await.expect("clear"), 2);
    assert_eq!(other.get("b").await, None);
    assert_eq!(cache.stats().await.total_entries, 0);
}

#[tokio::test]
async fn duckdb_entries_survive_a_restart() {
    // Given: an entry written through a DuckDB-backed cache
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("cache").join("cache.duckdb");
    let clock = clock();
    {
        let store = DuckDbStore::open(&path).expect("open store");
        let cache = cache_over(Arc::new(store), &clock);
        cache
            .set(KEY, String::from("{\"type\":\"teams\",\"records\":[]}"), Duration::from_secs(60))
            .await
            .expect("write");
    }

    // When: a new process opens the same file
    let reopened = DuckDbStore::open(&path).expect("reopen store");
    let cache = cache_over(Arc::new(reopened), &clock);

    // Then: the entry is served fresh until its original TTL runs out
    assert_eq!(
        cache.get(KEY).await,
        Some(String::from("{\"type\":\"teams\",\"records\":[]}"))
    );
    clock.advance(Duration::from_secs(61));
    assert!(matches!(cache.lookup(KEY).await, CacheLookup::Stale { .. }));
}

// =============================================================================
// Degraded durable tier
// =============================================================================

#[tokio::test]
async fn unreachable_durable_tier_degrades_to_process_memory() {
    // Given: a cache whose durable tier always fails
    let clock = clock();
    let cache = cache_over(Arc::new(UnreachableStore), &clock);

    // When: an entry is written
    let written = cache
        .set(KEY, String::from("payload"), Duration::from_secs(60))
        .await;

    // Then: the failure is reported but tier 1 still serves the value
    assert!(written.is_err());
    assert_eq!(cache.get(KEY).await, Some(String::from("payload")));
    assert_eq!(cache.lookup("missing").await, CacheLookup::Miss);

    let stats = cache.stats().await;
    assert!(!stats.durable_available);
    assert_eq!(stats.total_entries, 1);
}
