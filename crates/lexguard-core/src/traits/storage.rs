//! Key/value persistence, the shape of an extension storage area.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LexResult;

/// Transformation applied by [`KeyValueStore::update`].
pub type UpdateFn = Box<dyn FnOnce(Option<Value>) -> LexResult<Value> + Send>;

/// A process-wide key/value storage area holding JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key was never written.
    async fn get(&self, key: &str) -> LexResult<Option<Value>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> LexResult<()>;

    /// Remove a key.
    async fn remove(&self, key: &str) -> LexResult<()>;

    /// Read, transform and write a value as one atomic step.
    ///
    /// No other writer, in this process or another, may interleave between
    /// the read and the write. Returns the value written.
    async fn update(&self, key: &str, apply: UpdateFn) -> LexResult<Value>;
}
