//! SQLite storage backend
//!
//! Provides `SqliteCacheStore`, the durable local cache. Entities are kept
//! as JSON documents; the pending-mutation log lives in the same database so
//! a mutation and its cached entity survive restarts together.

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::atomic::AtomicI64;
use std::sync::{Arc, Mutex};

mod cache;

pub(crate) use cache::init_schema as init_cache_schema;

/// Shared SQLite connection holding the cache tables
pub struct SqliteCacheStore {
    conn: Arc<Mutex<Connection>>,
    quota: Option<u64>,
    /// Logical clock for LRU ordering
    clock: AtomicI64,
}

impl SqliteCacheStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create an in-memory SQLite database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        init_cache_schema(&conn)?;
        let clock: i64 = conn.query_row(
            "SELECT COALESCE(MAX(last_access), 0) FROM entities",
            [],
            |row| row.get(0),
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            quota: None,
            clock: AtomicI64::new(clock),
        })
    }

    /// Cap the bytes of cached entity bodies
    pub fn with_quota(mut self, bytes: u64) -> Self {
        self.quota = Some(bytes);
        self
    }

    pub(crate) fn conn(&self) -> &Arc<Mutex<Connection>> {
        &self.conn
    }
}
