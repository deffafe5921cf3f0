//! Database Connection and Setup
//!
//! Opens the SQLite file, runs migrations and exposes `SqliteStorage`, a
//! `kv_store` table behind the `StorageAdapter` interface.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::Mutex;

use super::traits::{StorageAdapter, UsageStats};
use crate::domain::{DomainError, DomainResult};

/// Open (or create) the database at `db_path` and run migrations
pub async fn init_db(db_path: &Path) -> Result<Connection, String> {
    let conn = Connection::open(db_path)
        .map_err(|e| format!("Failed to open db {}: {}", db_path.display(), e))?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    let query = format!("PRAGMA table_info({})", table);
    let Ok(mut stmt) = conn.prepare(&query) else {
        return false;
    };
    let Ok(mut rows) = stmt.query([]) else {
        return false;
    };
    while let Ok(Some(row)) = rows.next() {
        if let Ok(name) = row.get::<_, String>(1) {
            if name == column {
                return true;
            }
        }
    }
    false
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> Result<(), String> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| e.to_string())?;

    if !column_exists(conn, "kv_store", "updated_at") {
        conn.execute(
            "ALTER TABLE kv_store ADD COLUMN updated_at INTEGER NOT NULL DEFAULT 0",
            [],
        )
        .map_err(|e| format!("Failed to add updated_at: {}", e))?;
    }

    Ok(())
}

/// Bytes used by all rows, counted like `MemoryStorage` does
fn used_bytes(conn: &Connection) -> rusqlite::Result<u64> {
    conn.query_row(
        "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
         FROM kv_store",
        [],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n.max(0) as u64)
}

pub struct SqliteStorage {
    conn: Arc<Mutex<Option<Connection>>>,
    quota_bytes: u64,
}

impl SqliteStorage {
    pub fn new(conn: Arc<Mutex<Option<Connection>>>, quota_bytes: u64) -> Self {
        Self { conn, quota_bytes }
    }

    /// Open the database file and wrap it
    pub async fn open(db_path: &Path, quota_bytes: u64) -> Result<Self, String> {
        let conn = init_db(db_path).await?;
        Ok(Self::new(Arc::new(Mutex::new(Some(conn))), quota_bytes))
    }

    async fn read(&self, key: &str) -> DomainResult<Option<String>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| DomainError::Storage(e.to_string()))
    }

    async fn write_all(&self, entries: &[(String, String)]) -> DomainResult<bool> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let now = chrono::Local::now().timestamp_millis();
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        }

        let used = used_bytes(&tx).map_err(|e| DomainError::Storage(e.to_string()))?;
        if used > self.quota_bytes {
            log::warn!("storage quota exceeded: {} of {} bytes", used, self.quota_bytes);
            // dropping the transaction rolls it back
            return Ok(false);
        }

        tx.commit()
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        conn.execute("DELETE FROM kv_store WHERE key = ?", params![key])
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn used(&self) -> DomainResult<u64> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;
        used_bytes(conn).map_err(|e| DomainError::Storage(e.to_string()))
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn get(&self, key: &str) -> Option<Value> {
        let raw = self.get_raw(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("stored value for {} is not valid JSON: {}", key, e);
                None
            }
        }
    }

    async fn get_raw(&self, key: &str) -> Option<String> {
        match self.read(key).await {
            Ok(value) => value,
            Err(e) => {
                log::error!("failed to read {}: {}", key, e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &Value) -> bool {
        self.set_many(&[(key.to_string(), value.clone())]).await
    }

    async fn set_many(&self, entries: &[(String, Value)]) -> bool {
        let mut encoded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match serde_json::to_string(value) {
                Ok(text) => encoded.push((key.clone(), text)),
                Err(e) => {
                    log::error!("failed to serialize {}: {}", key, e);
                    return false;
                }
            }
        }

        match self.write_all(&encoded).await {
            Ok(written) => written,
            Err(e) => {
                log::error!("failed to write {} keys: {}", encoded.len(), e);
                false
            }
        }
    }

    async fn remove(&self, key: &str) -> bool {
        match self.delete(key).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("failed to remove {}: {}", key, e);
                false
            }
        }
    }

    async fn usage_stats(&self) -> UsageStats {
        let used = self.used().await.unwrap_or_else(|e| {
            log::error!("failed to measure storage: {}", e);
            0
        });
        UsageStats::new(used, self.quota_bytes)
    }
}
