//! `DuckDB` connection pool for the durable cache tier.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::Connection;

use crate::StoreError;

struct PoolInner {
    location: Option<PathBuf>,
    max_idle: usize,
    root: Mutex<Connection>,
    idle: Mutex<Vec<Connection>>,
}

/// Pool of connections sharing one database instance.
///
/// Additional connections are cloned from a root handle so every connection
/// sees the same database (including in-memory databases) without reopening
/// the file.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or configured.
    pub fn open(path: impl Into<PathBuf>, max_idle: usize) -> Result<Self, StoreError> {
        let path = path.into();
        let root = Connection::open(&path)?;
        Self::from_root(root, Some(path), max_idle)
    }

    /// Open a private in-memory database. Used by tests and `--mock` runs.
    ///
    /// # Errors
    /// Returns an error if `DuckDB` cannot allocate the database.
    pub fn open_in_memory(max_idle: usize) -> Result<Self, StoreError> {
        let root = Connection::open_in_memory()?;
        Self::from_root(root, None, max_idle)
    }

    fn from_root(
        root: Connection,
        location: Option<PathBuf>,
        max_idle: usize,
    ) -> Result<Self, StoreError> {
        configure_connection(&root)?;
        Ok(Self {
            inner: Arc::new(PoolInner {
                location,
                max_idle: max_idle.max(1),
                root: Mutex::new(root),
                idle: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Take an idle connection or clone a new one from the root handle.
    ///
    /// # Errors
    /// Returns an error if a new connection cannot be cloned or a pool lock
    /// was poisoned by a panicking holder.
    pub fn acquire(&self) -> Result<PooledConnection, StoreError> {
        let idle = self
            .inner
            .idle
            .lock()
            .map_err(|_| StoreError::PoolPoisoned)?
            .pop();

        let connection = match idle {
            Some(connection) => connection,
            None => {
                let root = self
                    .inner
                    .root
                    .lock()
                    .map_err(|_| StoreError::PoolPoisoned)?;
                let connection = root.try_clone()?;
                configure_connection(&connection)?;
                connection
            }
        };

        Ok(PooledConnection {
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    /// Database file location, `None` for in-memory pools.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.inner.location.as_deref()
    }
}

/// A connection that returns to the pool when dropped.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection is present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection is present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        if let Ok(mut idle) = self.pool.idle.lock() {
            if idle.len() < self.pool.max_idle {
                idle.push(connection);
            }
        }
    }
}

fn configure_connection(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch("PRAGMA disable_progress_bar;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connections_share_the_in_memory_database() {
        let pool = ConnectionPool::open_in_memory(2).expect("pool opens");

        {
            let first = pool.acquire().expect("first connection");
            first
                .execute_batch("CREATE TABLE probe (id INTEGER); INSERT INTO probe VALUES (7);")
                .expect("table is created");
        }

        let second = pool.acquire().expect("second connection");
        let value: i32 = second
            .query_row("SELECT id FROM probe", [], |row| row.get(0))
            .expect("row is visible");
        assert_eq!(value, 7);
        assert!(pool.location().is_none());
    }
}
