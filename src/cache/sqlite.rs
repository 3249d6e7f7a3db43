//! SQLite-backed partition storage that survives restarts.

// Author: kelexine (https://github.com/kelexine)

use super::models::{CacheKey, StoredResponse};
use super::storage::CacheStorage;
use crate::error::{EdgeError, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;
use tracing::debug;

/// Schema for partition tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS partitions (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS entries (
    partition_name TEXT NOT NULL,
    request_key TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    stored_at TEXT NOT NULL,
    PRIMARY KEY (partition_name, request_key),
    FOREIGN KEY (partition_name) REFERENCES partitions(name) ON DELETE CASCADE
);
"#;

pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        debug!("Opened partition database at {}", path.display());
        Self::with_connection(conn)
    }

    /// Database that lives only as long as this value.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(CACHE_SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}

impl CacheStorage for SqliteStorage {
    fn open_partition(&self, partition: &str) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO partitions (name) VALUES (?1)",
            params![partition],
        )?;
        Ok(())
    }

    fn put(&self, partition: &str, key: &CacheKey, response: &StoredResponse) -> Result<()> {
        let headers = serde_json::to_string(&response.headers)?;
        let conn = self.conn();
        conn.execute(
            "INSERT OR IGNORE INTO partitions (name) VALUES (?1)",
            params![partition],
        )?;
        conn.execute(
            "INSERT OR REPLACE INTO entries (partition_name, request_key, status, headers, body, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                partition,
                key.as_str(),
                response.status,
                headers,
                &response.body[..],
                response.stored_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get(&self, partition: &str, key: &CacheKey) -> Result<Option<StoredResponse>> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT status, headers, body, stored_at FROM entries
                 WHERE partition_name = ?1 AND request_key = ?2",
                params![partition, key.as_str()],
                |row| {
                    Ok((
                        row.get::<_, u16>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Vec<u8>>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, headers, body, stored_at)) = row else {
            return Ok(None);
        };

        let stored_at = DateTime::parse_from_rfc3339(&stored_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| EdgeError::Storage(format!("Bad stored_at for {}: {}", key, e)))?;

        Ok(Some(StoredResponse {
            status,
            headers: serde_json::from_str(&headers)?,
            body: body.into(),
            stored_at,
        }))
    }

    fn partitions(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn delete_partition(&self, partition: &str) -> Result<bool> {
        let removed = self
            .conn()
            .execute("DELETE FROM partitions WHERE name = ?1", params![partition])?;
        Ok(removed > 0)
    }

    fn entry_count(&self, partition: &str) -> Result<usize> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM entries WHERE partition_name = ?1",
            params![partition],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
