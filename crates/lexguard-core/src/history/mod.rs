//! Scan history: a bounded, oldest-first list of past analyses.
//!
//! The list lives under a single key in a [`KeyValueStore`] so the same
//! shape works for extension storage, SQLite, or a test double. Appends go
//! through [`KeyValueStore::update`], so writers in other processes sharing
//! the store do not overwrite each other.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ErrorCode, LexError, LexResult};
use crate::traits::KeyValueStore;
use crate::types::{HistoryEntry, HistoryStats};

/// Storage key holding the history list.
pub const HISTORY_KEY: &str = "scanHistory";

/// Entries kept before the oldest is evicted.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Bounded scan history over a key/value store.
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_capacity(store, DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an entry, evicting the oldest beyond capacity.
    pub async fn append(&self, entry: HistoryEntry) -> LexResult<()> {
        let capacity = self.capacity;
        let written = self
            .store
            .update(
                HISTORY_KEY,
                Box::new(move |current| {
                    let mut entries = decode_entries(current)?;
                    entries.push(entry);
                    if entries.len() > capacity {
                        let excess = entries.len() - capacity;
                        entries.drain(..excess);
                    }
                    serde_json::to_value(&entries)
                        .map_err(|e| LexError::storage(ErrorCode::StoWriteFailed, e.to_string()))
                }),
            )
            .await?;

        let count = written.as_array().map_or(0, Vec::len);
        debug!(count, "Appended history entry");
        Ok(())
    }

    /// All entries, oldest first.
    pub async fn read_all(&self) -> LexResult<Vec<HistoryEntry>> {
        decode_entries(self.store.get(HISTORY_KEY).await?)
    }

    pub async fn count(&self) -> LexResult<usize> {
        Ok(self.read_all().await?.len())
    }

    /// Mean score over entries that have one, `None` when none do.
    pub async fn average_risk_score(&self) -> LexResult<Option<f64>> {
        Ok(average(&self.read_all().await?))
    }

    pub async fn stats(&self) -> LexResult<HistoryStats> {
        let entries = self.read_all().await?;
        Ok(HistoryStats {
            count: entries.len(),
            average_risk_score: average(&entries),
        })
    }

    /// Remove every entry.
    pub async fn clear(&self) -> LexResult<()> {
        self.store.remove(HISTORY_KEY).await
    }
}

fn decode_entries(value: Option<Value>) -> LexResult<Vec<HistoryEntry>> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(value) => serde_json::from_value(value).map_err(|e| {
            warn!(error = %e, "History list is unreadable");
            LexError::storage(ErrorCode::StoReadFailed, e.to_string())
        }),
    }
}

fn average(entries: &[HistoryEntry]) -> Option<f64> {
    let scores: Vec<f64> = entries.iter().filter_map(|e| e.risk_score).collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn entry(n: i64, score: Option<f64>) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc.timestamp_millis_opt(n).unwrap(),
            risk_score: score,
            document_type: format!("doc {}", n),
            risk_level: "low".to_string(),
        }
    }

    fn history() -> HistoryStore {
        HistoryStore::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_empty_history() {
        let history = history();
        assert_eq!(history.count().await.unwrap(), 0);
        assert_eq!(history.average_risk_score().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_evicts_oldest_beyond_capacity() {
        let history = history();
        for n in 1..=105 {
            history.append(entry(n, Some(50.0))).await.unwrap();
        }

        let entries = history.read_all().await.unwrap();
        assert_eq!(entries.len(), 100);
        assert_eq!(entries[0].document_type, "doc 6");
        assert_eq!(entries[99].document_type, "doc 105");
    }

    #[tokio::test]
    async fn test_average_skips_missing_scores() {
        let history = history();
        history.append(entry(1, Some(80.0))).await.unwrap();
        history.append(entry(2, None)).await.unwrap();
        history.append(entry(3, Some(40.0))).await.unwrap();

        let stats = history.stats().await.unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.average_risk_score, Some(60.0));
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let history = Arc::new(history());
        let tasks: Vec<_> = (0..20)
            .map(|n| {
                let history = history.clone();
                tokio::spawn(async move { history.append(entry(n, None)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(history.count().await.unwrap(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_appends_through_separate_sqlite_connections_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        // Two connections to one file, as two CLI processes would have.
        let first = Arc::new(HistoryStore::with_capacity(
            Arc::new(SqliteStore::new(&path).unwrap()),
            1_000,
        ));
        let second = Arc::new(HistoryStore::with_capacity(
            Arc::new(SqliteStore::new(&path).unwrap()),
            1_000,
        ));

        let tasks: Vec<_> = (0..400)
            .map(|n| {
                let history = if n % 2 == 0 { first.clone() } else { second.clone() };
                tokio::spawn(async move { history.append(entry(n, Some(50.0))).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(first.count().await.unwrap(), 400);
        assert_eq!(second.count().await.unwrap(), 400);
    }

    #[tokio::test]
    async fn test_append_over_corrupt_list_fails_without_overwriting() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, json!("not a list")).await.unwrap();

        let err = HistoryStore::new(store.clone())
            .append(entry(1, None))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoReadFailed);
        assert_eq!(store.get(HISTORY_KEY).await.unwrap(), Some(json!("not a list")));
    }

    #[tokio::test]
    async fn test_clear() {
        let history = history();
        history.append(entry(1, Some(10.0))).await.unwrap();
        history.clear().await.unwrap();
        assert_eq!(history.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_list_is_storage_error() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, json!("not a list")).await.unwrap();
        let err = HistoryStore::new(store).read_all().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoReadFailed);
    }

    #[tokio::test]
    async fn test_entries_stored_in_camel_case() {
        let store = Arc::new(MemoryStore::new());
        HistoryStore::new(store.clone())
            .append(entry(1_700_000_000_000, Some(85.0)))
            .await
            .unwrap();

        let raw = store.get(HISTORY_KEY).await.unwrap().unwrap();
        assert_eq!(raw[0]["riskScore"], json!(85.0));
        assert_eq!(raw[0]["timestamp"], json!(1_700_000_000_000i64));
        assert!(raw[0].get("documentType").is_some());
    }
}
