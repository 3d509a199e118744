//! Process-local implementation of the durable tier contract.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{DurableStore, StoreFuture, StoreStats, StoredEntry};

/// `DurableStore` backed by a shared map.
///
/// Clones share the same entries, which makes it a stand-in for a shared
/// store when several cache instances must observe each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, StoredEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<StoredEntry>> {
        Box::pin(async move { Ok(self.entries.read().await.get(key).cloned()) })
    }

    fn set<'a>(&'a self, entry: StoredEntry) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.entries.write().await.insert(entry.key.clone(), entry);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move { Ok(self.entries.write().await.remove(key).is_some()) })
    }

    fn clear<'a>(&'a self) -> StoreFuture<'a, usize> {
        Box::pin(async move {
            let mut entries = self.entries.write().await;
            let removed = entries.len();
            entries.clear();
            Ok(removed)
        })
    }

    fn sweep<'a>(&'a self, cutoff_ms: i64) -> StoreFuture<'a, usize> {
        Box::pin(async move {
            let mut entries = self.entries.write().await;
            let before = entries.len();
            entries.retain(|_, entry| entry.expires_at_ms() >= cutoff_ms);
            Ok(before - entries.len())
        })
    }

    fn stats<'a>(&'a self) -> StoreFuture<'a, StoreStats> {
        Box::pin(async move {
            let entries = self.entries.read().await;
            let total_bytes: u64 = entries.values().map(StoredEntry::size_bytes).sum();
            Ok(StoreStats::from_totals(entries.len() as u64, total_bytes))
        })
    }
}
