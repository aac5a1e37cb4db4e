//! SQLite store for milestat
//!
//! A single `rusqlite::Connection` behind a mutex implements the event,
//! aggregate, and company stores. Buckets are keyed by
//! `(namespace, granularity, start_date)` and written with
//! `INSERT ... ON CONFLICT DO UPDATE`, so concurrent first populations of the
//! same period collapse into one row.

use std::path::Path;
use std::sync::Mutex;

use milestat_core::{MilestatError, Result};
use rusqlite::Connection;
use tracing::debug;

mod buckets;
mod companies;
mod events;
mod helpers;
mod migrations;

pub use migrations::MIGRATIONS;

/// SQLite implementation of the event, aggregate, and company stores
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and apply pending migrations
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn =
            Connection::open(path).map_err(|e| MilestatError::storage("open database", e))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .and_then(|_| conn.pragma_update(None, "synchronous", "NORMAL"))
            .and_then(|_| conn.pragma_update(None, "busy_timeout", 5000))
            .map_err(|e| MilestatError::storage("configure database", e))?;
        debug!("Opened SQLite store at {}", path.display());
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| MilestatError::storage("open database", e))?;
        Self::from_connection(conn)
    }

    fn from_connection(mut conn: Connection) -> Result<Self> {
        migrations::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` against the connection, mapping SQLite failures to storage errors
    pub(crate) fn with_conn<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| MilestatError::storage(operation, "connection mutex poisoned"))?;
        f(&mut conn).map_err(|e| MilestatError::storage(operation, e))
    }
}
