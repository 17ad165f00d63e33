pub mod accounts;
pub mod bounties;
pub mod migrations;
pub mod notices;

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A keyed update touched zero-where-present or more than one row.
    /// Fatal for the enclosing operation; never retried silently.
    #[error("{context}: update touched {affected} rows, expected exactly one")]
    Consistency {
        context: &'static str,
        affected: usize,
    },

    #[error("store lock poisoned")]
    Lock,

    #[error("blocking store task failed: {0}")]
    Join(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Keyed-table store over a single sqlite connection.
///
/// The mutex serializes every store call, and each read-modify-write is a
/// single SQL statement with its guard in the WHERE clause, so concurrent
/// tasks never lose updates to the same row.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Bounty store opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        f(&conn)
    }

    /// Run a store closure off the async runtime.
    ///
    /// sqlite calls are blocking; handlers go through here instead of
    /// holding up a runtime worker.
    pub async fn call<F, T>(self: &Arc<Self>, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Join(e.to_string()))?
    }
}

/// Verify the single-row-touched contract on a keyed update.
pub(crate) fn expect_one(context: &'static str, affected: usize) -> Result<()> {
    if affected == 1 {
        Ok(())
    } else {
        Err(StoreError::Consistency { context, affected })
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
