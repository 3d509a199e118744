//! Two-tier response cache.
//!
//! Tier 1 is an in-process map, lost on restart. Tier 2 is a [`DurableStore`]
//! shared between processes. Entries stay readable as stale after their TTL
//! until `sweep_expired` reclaims them `stale_retention` later.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use apex_store::{DurableStore, StoreError, StoredEntry};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::clock::Clock;

/// Result of a cache read that may serve expired data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Fresh(String),
    Stale { value: String, age_past_ttl: Duration },
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub stale_hits: u64,
    pub misses: u64,
    pub total_entries: u64,
    pub average_entry_bytes: f64,
    pub tier1_entries: u64,
    pub durable_available: bool,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    stale_hits: AtomicU64,
    misses: AtomicU64,
}

/// Thread-safe two-tier cache for canonical payloads.
#[derive(Clone)]
pub struct CacheStore {
    tier1: Arc<RwLock<HashMap<String, StoredEntry>>>,
    durable: Option<Arc<dyn DurableStore>>,
    clock: Arc<dyn Clock>,
    stale_retention: Duration,
    counters: Arc<Counters>,
}

impl CacheStore {
    pub fn new(
        durable: Option<Arc<dyn DurableStore>>,
        clock: Arc<dyn Clock>,
        stale_retention: Duration,
    ) -> Self {
        Self {
            tier1: Arc::new(RwLock::new(HashMap::new())),
            durable,
            clock,
            stale_retention,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Cache with no durable tier.
    pub fn in_memory(clock: Arc<dyn Clock>, stale_retention: Duration) -> Self {
        Self::new(None, clock, stale_retention)
    }

    /// Fresh value for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.lookup(key).await {
            CacheLookup::Fresh(value) => Some(value),
            CacheLookup::Stale { .. } | CacheLookup::Miss => None,
        }
    }

    /// Reads tier 1 then tier 2, classifying the entry by age.
    ///
    /// A tier-2 hit is copied into tier 1 with its original insertion time
    /// and TTL. An expired tier-1 copy is re-checked against tier 2 so a
    /// newer write from another instance wins. A tier-2 read error is logged
    /// and treated as a miss.
    pub async fn lookup(&self, key: &str) -> CacheLookup {
        let cached = self.tier1.read().await.get(key).cloned();
        let entry = match cached {
            Some(entry) if self.clock.now_ms() < entry.expires_at_ms() => Some(entry),
            Some(expired) => Some(self.newer_durable(key, expired).await),
            None => self.read_durable(key).await,
        };

        let Some(entry) = entry else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(cache_key = key, "cache miss");
            return CacheLookup::Miss;
        };

        let now = self.clock.now_ms();
        let expires_at = entry.expires_at_ms();
        if now < expires_at {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(cache_key = key, "cache hit");
            return CacheLookup::Fresh(entry.value);
        }

        self.counters.stale_hits.fetch_add(1, Ordering::Relaxed);
        let age_past_ttl = Duration::from_millis(u64::try_from(now - expires_at).unwrap_or(0));
        tracing::debug!(
            cache_key = key,
            age_past_ttl_ms = age_past_ttl.as_millis() as u64,
            "stale cache entry found"
        );
        CacheLookup::Stale {
            value: entry.value,
            age_past_ttl,
        }
    }

    async fn read_durable(&self, key: &str) -> Option<StoredEntry> {
        let entry = self.fetch_durable(key).await?;
        self.remember(&entry).await;
        Some(entry)
    }

    /// Tier-2 entry for `key` when it was written after `expired`, else `expired`.
    async fn newer_durable(&self, key: &str, expired: StoredEntry) -> StoredEntry {
        match self.fetch_durable(key).await {
            Some(entry)
                if entry.inserted_at_ms > expired.inserted_at_ms
                    || entry.expires_at_ms() > expired.expires_at_ms() =>
            {
                self.remember(&entry).await;
                entry
            }
            _ => expired,
        }
    }

    async fn fetch_durable(&self, key: &str) -> Option<StoredEntry> {
        let durable = self.durable.as_ref()?;
        match durable.get(key).await {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(
                    cache_key = key,
                    store = durable.name(),
                    error = %error,
                    "durable cache read failed; treating as miss"
                );
                None
            }
        }
    }

    async fn remember(&self, entry: &StoredEntry) {
        self.tier1
            .write()
            .await
            .insert(entry.key.clone(), entry.clone());
    }

    /// Writes both tiers. Tier 1 is always written; a tier-2 failure is
    /// returned so the caller can log it.
    pub async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let entry = StoredEntry::new(
            key,
            value,
            self.clock.now_ms(),
            u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        );

        self.tier1
            .write()
            .await
            .insert(entry.key.clone(), entry.clone());

        match &self.durable {
            Some(durable) => durable.set(entry).await,
            None => Ok(()),
        }
    }

    /// Removes `key` from both tiers; true if either tier held it.
    pub async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let in_tier1 = self.tier1.write().await.remove(key).is_some();
        let in_tier2 = match &self.durable {
            Some(durable) => durable.delete(key).await?,
            None => false,
        };
        Ok(in_tier1 || in_tier2)
    }

    /// Empties both tiers and returns how many entries were removed.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let tier1_removed = {
            let mut tier1 = self.tier1.write().await;
            let removed = tier1.len();
            tier1.clear();
            removed
        };

        match &self.durable {
            Some(durable) => Ok(durable.clear().await?.max(tier1_removed)),
            None => Ok(tier1_removed),
        }
    }

    /// Physically removes entries older than `ttl + stale_retention`.
    pub async fn sweep_expired(&self) -> Result<usize, StoreError> {
        let retention_ms = i64::try_from(self.stale_retention.as_millis()).unwrap_or(i64::MAX);
        let cutoff = self.clock.now_ms().saturating_sub(retention_ms);

        let tier1_removed = {
            let mut tier1 = self.tier1.write().await;
            let before = tier1.len();
            tier1.retain(|_, entry| entry.expires_at_ms() >= cutoff);
            before - tier1.len()
        };

        let removed = match &self.durable {
            Some(durable) => durable.sweep(cutoff).await?.max(tier1_removed),
            None => tier1_removed,
        };
        tracing::debug!(removed, "swept expired cache entries");
        Ok(removed)
    }

    /// Hit/miss counters plus entry counts. `total_entries` comes from tier 2
    /// when it is reachable, otherwise from tier 1.
    pub async fn stats(&self) -> CacheStats {
        let (tier1_entries, tier1_bytes) = {
            let tier1 = self.tier1.read().await;
            let bytes: u64 = tier1.values().map(StoredEntry::size_bytes).sum();
            (tier1.len() as u64, bytes)
        };

        let durable_stats = match &self.durable {
            Some(durable) => match durable.stats().await {
                Ok(stats) => Some(stats),
                Err(error) => {
                    tracing::warn!(error = %error, "durable cache stats unavailable");
                    None
                }
            },
            None => None,
        };

        let (total_entries, average_entry_bytes) = match durable_stats {
            Some(stats) => (stats.entries, stats.average_entry_bytes),
            None => {
                let stats = apex_store::StoreStats::from_totals(tier1_entries, tier1_bytes);
                (stats.entries, stats.average_entry_bytes)
            }
        };

        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            stale_hits: self.counters.stale_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            total_entries,
            average_entry_bytes,
            tier1_entries,
            durable_available: durable_stats.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use apex_store::MemoryStore;

    use super::*;
    use crate::clock::ManualClock;

    const RETENTION: Duration = Duration::from_secs(3_600);

    fn two_tier(clock: Arc<ManualClock>, durable: MemoryStore) -> CacheStore {
        CacheStore::new(Some(Arc::new(durable)), clock, RETENTION)
    }

    #[tokio::test]
    async fn fresh_then_stale_then_swept() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = CacheStore::in_memory(clock.clone(), RETENTION);

        cache
            .set("k", String::from("v"), Duration::from_secs(60))
            .await
            .expect("set");
        assert_eq!(cache.get("k").await, Some(String::from("v")));

        clock.advance(Duration::from_secs(70));
        assert_eq!(cache.get("k").await, None);
        assert_eq!(
            cache.lookup("k").await,
            CacheLookup::Stale {
                value: String::from("v"),
                age_past_ttl: Duration::from_secs(10),
            }
        );

        assert_eq!(cache.sweep_expired().await.expect("sweep"), 0);
        clock.advance(RETENTION);
        assert_eq!(cache.sweep_expired().await.expect("sweep"), 1);
        assert_eq!(cache.lookup("k").await, CacheLookup::Miss);
    }

    #[tokio::test]
    async fn durable_hit_populates_tier_one_with_original_timing() {
        let clock = Arc::new(ManualClock::new(1_000));
        let shared = MemoryStore::new();
        let writer = two_tier(clock.clone(), shared.clone());
        let reader = two_tier(clock.clone(), shared);

        writer
            .set("k", String::from("payload"), Duration::from_secs(10))
            .await
            .expect("set");

        clock.advance(Duration::from_secs(5));
        assert_eq!(reader.get("k").await, Some(String::from("payload")));
        assert_eq!(reader.stats().await.tier1_entries, 1);

        // Original insertion time is kept, so the copy expires on schedule.
        clock.advance(Duration::from_secs(6));
        assert!(matches!(reader.lookup("k").await, CacheLookup::Stale { .. }));
    }

    #[tokio::test]
    async fn writes_do_not_touch_hit_counters() {
        let clock = Arc::new(ManualClock::new(0));
        let cache = two_tier(clock, MemoryStore::new());

        cache
            .set("k", String::from("v"), Duration::from_secs(60))
            .await
            .expect("first set");
        cache
            .set("k", String::from("v"), Duration::from_secs(60))
            .await
            .expect("second set");

        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses, stats.stale_hits), (0, 0, 0));
        assert_eq!(stats.total_entries, 1);
        assert!(stats.durable_available);

        assert_eq!(cache.get("k").await, Some(String::from("v")));
        assert_eq!(cache.get("missing").await, None);
        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test]
    async fn delete_and_clear_cover_both_tiers() {
        let clock = Arc::new(ManualClock::new(0));
        let shared = MemoryStore::new();
        let cache = two_tier(clock, shared.clone());

        for key in ["a", "b", "c"] {
            cache
                .set(key, String::from("{}"), Duration::from_secs(60))
                .await
                .expect("set");
        }

        assert!(cache.delete("a").await.expect("delete"));
        assert!(!cache.delete("a").await.expect("second delete"));
        assert!(shared.get("a").await.expect("store read").is_none());

        assert_eq!(cache.clear().await.expect("clear"), 2);
        assert_eq!(cache.stats().await.total_entries, 0);
    }
}
