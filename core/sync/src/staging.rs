//! Write-ahead staging of upload bytes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::sync::Arc;
use tracing::warn;

use artfolio_backend::KeyValueStore;
use artfolio_common::{ArtworkId, Result};

const KEY_PREFIX: &str = "staged_media_";

fn staging_key(entity_id: &ArtworkId) -> String {
    format!("{}{}", KEY_PREFIX, entity_id)
}

/// Durable copy of upload bytes, keyed by entity id.
///
/// Bytes are stashed before the first remote attempt so a failed file
/// transfer can be replayed by the reconnect sweep, even after a process
/// restart. Stored base64-encoded in the key-value store under
/// `staged_media_{entityId}`; discarded once the file is confirmed stored
/// or the entity is deleted.
pub struct MediaStagingArea<K> {
    kv: Arc<K>,
}

impl<K: KeyValueStore> MediaStagingArea<K> {
    /// Create a staging area over the given key-value backend.
    pub fn new(kv: Arc<K>) -> Self {
        Self { kv }
    }

    /// Stash the bytes for an entity, replacing any earlier copy.
    pub async fn stash(&self, entity_id: &ArtworkId, data: &[u8]) -> Result<()> {
        let encoded = STANDARD.encode(data);
        self.kv.set(&staging_key(entity_id), &encoded).await
    }

    /// Read the staged bytes for an entity, if any.
    ///
    /// An undecodable value is treated as absent and logged.
    pub async fn peek(&self, entity_id: &ArtworkId) -> Result<Option<Vec<u8>>> {
        match self.kv.get(&staging_key(entity_id)).await? {
            None => Ok(None),
            Some(encoded) => match STANDARD.decode(encoded.as_bytes()) {
                Ok(data) => Ok(Some(data)),
                Err(err) => {
                    warn!("Corrupt staged media for {}: {}", entity_id, err);
                    Ok(None)
                }
            },
        }
    }

    /// Drop the staged bytes for an entity. No-op when nothing is staged.
    pub async fn discard(&self, entity_id: &ArtworkId) -> Result<()> {
        self.kv.remove(&staging_key(entity_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artfolio_backend::MemoryKeyValueStore;

    fn area() -> (Arc<MemoryKeyValueStore>, MediaStagingArea<MemoryKeyValueStore>) {
        let kv = Arc::new(MemoryKeyValueStore::new());
        (kv.clone(), MediaStagingArea::new(kv))
    }

    fn id(s: &str) -> ArtworkId {
        ArtworkId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_stash_peek_roundtrip() {
        let (kv, area) = area();
        let entity = id("alice-image-1");
        area.stash(&entity, b"raw media bytes").await.unwrap();

        assert!(kv
            .get("staged_media_alice-image-1")
            .await
            .unwrap()
            .is_some());
        assert_eq!(
            area.peek(&entity).await.unwrap().unwrap(),
            b"raw media bytes"
        );
    }

    #[tokio::test]
    async fn test_peek_missing_is_none() {
        let (_, area) = area();
        assert!(area.peek(&id("ghost")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_staged_value_is_none() {
        let (kv, area) = area();
        kv.set("staged_media_x", "!!! not base64 !!!").await.unwrap();
        assert!(area.peek(&id("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_discard() {
        let (_, area) = area();
        let entity = id("x");
        area.stash(&entity, b"data").await.unwrap();
        area.discard(&entity).await.unwrap();
        assert!(area.peek(&entity).await.unwrap().is_none());

        // Discarding again is a no-op.
        area.discard(&entity).await.unwrap();
    }
}
