//! Remote backend trait definitions.

use async_trait::async_trait;

use artfolio_common::{ArtworkId, ArtworkRecord, OwnerId, Result};

/// Remote object storage for media binaries.
///
/// Implementations must handle their own authentication and rate limiting.
/// Paths are flat strings of the form `{owner}/{kind}s/{file}`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get the backend name (e.g., "supabase", "memory").
    fn name(&self) -> &str;

    /// Upload a media binary.
    ///
    /// # Postconditions
    /// - The object exists at `path` with the given content
    /// - Uploading the same path twice replaces the object, so retries are
    ///   idempotent by key
    ///
    /// # Errors
    /// - Network/I/O errors
    /// - Authentication errors
    async fn upload(&self, path: &str, data: Vec<u8>) -> Result<()>;

    /// Delete a media binary.
    ///
    /// # Errors
    /// - Object not found
    /// - Network/I/O errors
    async fn delete(&self, path: &str) -> Result<()>;

    /// Resolve the publicly reachable URL for an object.
    async fn get_public_url(&self, path: &str) -> Result<String>;
}

/// Remote structured-record table holding artwork metadata rows.
#[async_trait]
pub trait RecordTable: Send + Sync {
    /// Get the backend name.
    fn name(&self) -> &str;

    /// Insert or replace a row, keyed by the record id.
    ///
    /// Upsert semantics make replays of a half-finished upload safe.
    async fn insert(&self, record: &ArtworkRecord) -> Result<()>;

    /// Fetch all rows for one owner, newest first.
    async fn query(&self, owner: &OwnerId) -> Result<Vec<ArtworkRecord>>;

    /// Delete the row with the given id. Deleting a missing row is a no-op.
    async fn delete(&self, id: &ArtworkId) -> Result<()>;
}
