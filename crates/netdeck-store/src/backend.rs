//! Key-value backend trait

use crate::error::Result;
use async_trait::async_trait;

/// Durable key-value mapping holding serialized records
///
/// Writes always replace the whole value; callers read, modify and write
/// back the full record.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Every `(key, value)` whose key starts with `prefix`, sorted by key
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>>;

    /// Returns whether the key existed
    async fn delete(&self, key: &str) -> Result<bool>;
}
