//! In-memory key/value store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::LexResult;
use crate::traits::{KeyValueStore, UpdateFn};

/// Key/value store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> LexResult<Option<Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> LexResult<()> {
        self.values.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> LexResult<()> {
        self.values.write().await.remove(key);
        Ok(())
    }

    async fn update(&self, key: &str, apply: UpdateFn) -> LexResult<Value> {
        let mut values = self.values.write().await;
        let updated = apply(values.get(key).cloned())?;
        values.insert(key.to_string(), updated.clone());
        Ok(updated)
    }
}
