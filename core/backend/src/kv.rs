//! Durable key-value store trait.

use async_trait::async_trait;

use artfolio_common::Result;

/// Durable local key-value store holding string values.
///
/// This is the single durable surface of the sync layer: the record cache,
/// the pending operation log and staged media all live behind it.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value. Missing keys yield `None`, never an error.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any existing one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is a no-op.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Enumerate all stored keys.
    async fn keys(&self) -> Result<Vec<String>>;
}
