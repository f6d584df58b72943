//! Key/value store persisted in SQLite.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde_json::Value;

use crate::error::{ErrorCode, LexError, LexResult};
use crate::traits::{KeyValueStore, UpdateFn};

/// How long a writer waits for another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SELECT_VALUE: &str = "SELECT value FROM kv WHERE key = ?1";
const UPSERT_VALUE: &str = r#"
    INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, CURRENT_TIMESTAMP)
    ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
"#;

/// SQLite-backed key/value store, one row per key.
///
/// Values are stored as JSON text. The path `:memory:` opens a private
/// in-memory database. Several stores, or several processes, may share one
/// file: [`KeyValueStore::update`] runs in an immediate transaction.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the database at `db_path`.
    pub fn new(db_path: impl AsRef<Path>) -> LexResult<Self> {
        let db_path = db_path.as_ref();
        let conn = if db_path.to_str() == Some(":memory:") {
            Connection::open_in_memory()
        } else {
            // Ensure parent directory exists
            if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(db_path)
        }
        .map_err(|e| storage_error(ErrorCode::StoReadFailed, e))?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| storage_error(ErrorCode::StoReadFailed, e))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_table()?;
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> LexResult<Self> {
        Self::new(":memory:")
    }

    fn create_table(&self) -> LexResult<()> {
        self.lock()?.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(())
    }

    fn lock(&self) -> LexResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LexError::storage(ErrorCode::StoReadFailed, "database lock poisoned"))
    }
}

fn storage_error(code: ErrorCode, err: rusqlite::Error) -> LexError {
    LexError::Storage {
        message: err.to_string(),
        code,
        source: Some(Box::new(err)),
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> LexResult<Option<Value>> {
        let raw: Option<String> = self
            .lock()?
            .query_row(SELECT_VALUE, params![key], |row| row.get(0))
            .optional()
            .map_err(|e| storage_error(ErrorCode::StoReadFailed, e))?;
        decode(raw)
    }

    async fn set(&self, key: &str, value: Value) -> LexResult<()> {
        let text = serde_json::to_string(&value)?;
        self.lock()?
            .execute(UPSERT_VALUE, params![key, text])
            .map_err(|e| storage_error(ErrorCode::StoWriteFailed, e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> LexResult<()> {
        self.lock()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| storage_error(ErrorCode::StoWriteFailed, e))?;
        Ok(())
    }

    async fn update(&self, key: &str, apply: UpdateFn) -> LexResult<Value> {
        let mut conn = self.lock()?;
        // IMMEDIATE takes the write lock up front so no other connection
        // can write between our read and our write.
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| storage_error(ErrorCode::StoWriteFailed, e))?;

        let raw: Option<String> = tx
            .query_row(SELECT_VALUE, params![key], |row| row.get(0))
            .optional()
            .map_err(|e| storage_error(ErrorCode::StoReadFailed, e))?;
        let updated = apply(decode(raw)?)?;

        let text = serde_json::to_string(&updated)?;
        tx.execute(UPSERT_VALUE, params![key, text])
            .map_err(|e| storage_error(ErrorCode::StoWriteFailed, e))?;
        tx.commit()
            .map_err(|e| storage_error(ErrorCode::StoWriteFailed, e))?;
        Ok(updated)
    }
}

fn decode(raw: Option<String>) -> LexResult<Option<Value>> {
    raw.map(|text| serde_json::from_str(&text))
        .transpose()
        .map_err(|e| LexError::storage(ErrorCode::StoReadFailed, e.to_string()))
}
