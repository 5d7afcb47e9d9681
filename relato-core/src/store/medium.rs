//! Persisted storage media for the durable queue
//!
//! The queue treats persistence as a tiny key-value contract: read one key,
//! overwrite one key, delete one key. Everything else (ordering, record
//! identity, serialization) lives in [`QueueStore`](super::QueueStore).
//! Keeping the boundary this narrow is what makes the queue portable across
//! media and trivially fakeable in tests.

use crate::error::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// A persisted key-value medium holding serialized queue state.
///
/// Implementations must make `write` atomic: after a crash, a reader sees
/// either the previous value or the new one, never a torn mix.
pub trait StorageMedium: Send + Sync {
    /// Read the full value stored under `key`, if any
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Atomically overwrite the value stored under `key`
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key` and its value; no error if absent
    fn delete(&self, key: &str) -> Result<()>;
}

// ============================================
// SQLite medium
// ============================================

/// Production medium backed by a single-table SQLite database.
///
/// Each `write` is one upsert statement, so SQLite's journal gives the
/// atomic-overwrite guarantee for free.
pub struct SqliteMedium {
    conn: Mutex<Connection>,
}

impl SqliteMedium {
    /// Open or create a medium at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::prepare(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory medium (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn prepare(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }
}

impl StorageMedium for SqliteMedium {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| {
            row.get(0)
        })
        .optional()
        .map_err(classify_sqlite_error)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO kv (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )
        .map_err(classify_sqlite_error)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])
            .map_err(classify_sqlite_error)?;
        Ok(())
    }
}

/// Surface out-of-space failures as [`Error::StorageQuota`].
///
/// SQLite reports both a full database and a full disk as `SQLITE_FULL`;
/// that condition is fatal for the write and must reach the caller intact.
fn classify_sqlite_error(err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(code, ref message) = err {
        if code.code == rusqlite::ErrorCode::DiskFull {
            let detail = message
                .clone()
                .unwrap_or_else(|| "database or disk is full".to_string());
            return Error::StorageQuota(detail);
        }
    }
    Error::Storage(err)
}

// ============================================
// In-memory medium
// ============================================

/// Volatile medium for unit tests
#[derive(Default)]
pub struct MemoryMedium {
    entries: Mutex<HashMap<String, String>>,
}

impl StorageMedium for MemoryMedium {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(key);
        Ok(())
    }
}
