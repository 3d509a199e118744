//! # Apex Store
//!
//! Durable tier of the apex response cache.
//!
//! The in-process tier lives in `apex-core`. This crate holds the tier that
//! survives restarts and can be shared between processes: a `DuckDB` table
//! keyed by cache key, plus an in-memory implementation of the same
//! [`DurableStore`] contract for tests and mock runs.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `cache_entries` | Serialized responses with insertion time and TTL |
//! | `schema_migrations` | Applied migration versions |

mod memory;
mod migrations;
mod pool;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use ::duckdb::{params, OptionalExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;
pub use pool::{ConnectionPool, PooledConnection};

const DEFAULT_MAX_IDLE: usize = 4;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection pool lock poisoned")]
    PoolPoisoned,

    #[error("blocking store task failed: {0}")]
    Join(String),
}

/// Boxed future returned by [`DurableStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Longest TTL the durable tier records, about a century.
///
/// Keeps `inserted_at_ms + ttl_ms` inside BIGINT for the sweep predicate.
pub const MAX_TTL_MS: u64 = 100 * 365 * 24 * 60 * 60 * 1_000;

/// One serialized cache entry as persisted by the durable tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key: String,
    pub value: String,
    pub inserted_at_ms: i64,
    pub ttl_ms: u64,
}

impl StoredEntry {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        inserted_at_ms: i64,
        ttl_ms: u64,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            inserted_at_ms,
            ttl_ms,
        }
    }

    pub fn expires_at_ms(&self) -> i64 {
        self.inserted_at_ms
            .saturating_add(i64::try_from(self.ttl_ms).unwrap_or(i64::MAX))
    }

    pub fn size_bytes(&self) -> u64 {
        (self.key.len() + self.value.len()) as u64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub entries: u64,
    pub average_entry_bytes: f64,
}

impl StoreStats {
    pub fn from_totals(entries: u64, total_bytes: u64) -> Self {
        let average_entry_bytes = if entries == 0 {
            0.0
        } else {
            total_bytes as f64 / entries as f64
        };
        Self {
            entries,
            average_entry_bytes,
        }
    }
}

/// Contract for the shared, restart-surviving cache tier.
///
/// Expiry is the caller's concern: `get` returns entries regardless of age so
/// the cache can serve them as stale. `sweep` deletes entries whose
/// `expires_at_ms` is strictly before `cutoff_ms`.
pub trait DurableStore: Send + Sync {
    fn name(&self) -> &'static str;

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<StoredEntry>>;

    fn set<'a>(&'a self, entry: StoredEntry) -> StoreFuture<'a, ()>;

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool>;

    fn clear<'a>(&'a self) -> StoreFuture<'a, usize>;

    fn sweep<'a>(&'a self, cutoff_ms: i64) -> StoreFuture<'a, usize>;

    fn stats<'a>(&'a self) -> StoreFuture<'a, StoreStats>;
}

/// `DuckDB`-backed durable tier.
#[derive(Clone)]
pub struct DuckDbStore {
    pool: ConnectionPool,
}

impl DuckDbStore {
    /// Open the store at `$APEX_HOME/cache/cache.duckdb`.
    pub fn open_default() -> Result<Self, StoreError> {
        let path = resolve_apex_home().join("cache").join("cache.duckdb");
        Self::open(path)
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::from_pool(ConnectionPool::open(path, DEFAULT_MAX_IDLE)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_pool(ConnectionPool::open_in_memory(DEFAULT_MAX_IDLE)?)
    }

    fn from_pool(pool: ConnectionPool) -> Result<Self, StoreError> {
        {
            let connection = pool.acquire()?;
            migrations::apply_migrations(&connection)?;
        }
        tracing::debug!(location = ?pool.location(), "durable cache store ready");
        Ok(Self { pool })
    }

    async fn run_blocking<T, F>(&self, task: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&::duckdb::Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let connection = pool.acquire()?;
            task(&connection)
        })
        .await
        .map_err(|error| StoreError::Join(error.to_string()))?
    }
}

impl DurableStore for DuckDbStore {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<StoredEntry>> {
        let key = key.to_string();
        Box::pin(self.run_blocking(move |connection| {
            let entry = connection
                .query_row(
                    "SELECT key, value, inserted_at_ms, ttl_ms FROM cache_entries WHERE key = ?",
                    params![key],
                    |row| {
                        let ttl_ms: i64 = row.get(3)?;
                        Ok(StoredEntry {
                            key: row.get(0)?,
                            value: row.get(1)?,
                            inserted_at_ms: row.get(2)?,
                            ttl_ms: u64::try_from(ttl_ms).unwrap_or(0),
                        })
                    },
                )
                .optional()?;
            Ok(entry)
        }))
    }

    fn set<'a>(&'a self, entry: StoredEntry) -> StoreFuture<'a, ()> {
        Box::pin(self.run_blocking(move |connection| {
            let size_bytes = i64::try_from(entry.size_bytes()).unwrap_or(i64::MAX);
            let ttl_ms = i64::try_from(entry.ttl_ms.min(MAX_TTL_MS)).unwrap_or(i64::MAX);
            connection.execute(
                "INSERT OR REPLACE INTO cache_entries \
                 (key, value, inserted_at_ms, ttl_ms, size_bytes, updated_at) \
                 VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
                params![entry.key, entry.value, entry.inserted_at_ms, ttl_ms, size_bytes],
            )?;
            Ok(())
        }))
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        let key = key.to_string();
        Box::pin(self.run_blocking(move |connection| {
            let removed = connection.execute("DELETE FROM cache_entries WHERE key = ?", params![key])?;
            Ok(removed > 0)
        }))
    }

    fn clear<'a>(&'a self) -> StoreFuture<'a, usize> {
        Box::pin(self.run_blocking(|connection| {
            let removed = connection.execute("DELETE FROM cache_entries", [])?;
            Ok(removed)
        }))
    }

    fn sweep<'a>(&'a self, cutoff_ms: i64) -> StoreFuture<'a, usize> {
        Box::pin(self.run_blocking(move |connection| {
            let removed = connection.execute(
                "DELETE FROM cache_entries WHERE inserted_at_ms + ttl_ms < ?",
                params![cutoff_ms],
            )?;
            Ok(removed)
        }))
    }

    fn stats<'a>(&'a self) -> StoreFuture<'a, StoreStats> {
        Box::pin(self.run_blocking(|connection| {
            let (entries, total_bytes): (i64, i64) = connection.query_row(
                "SELECT COUNT(*), CAST(COALESCE(SUM(size_bytes), 0) AS BIGINT) FROM cache_entries",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            Ok(StoreStats::from_totals(
                u64::try_from(entries).unwrap_or(0),
                u64::try_from(total_bytes).unwrap_or(0),
            ))
        }))
    }
}

/// Resolve the apex home directory.
///
/// Uses `APEX_HOME` when set, otherwise `$HOME/.apex`, falling back to a
/// relative `.apex` directory.
pub fn resolve_apex_home() -> PathBuf {
    if let Some(path) = std::env::var_os("APEX_HOME") {
        return PathBuf::from(path);
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".apex");
    }

    PathBuf::from(".apex")
}
