//! Durable per-owner cache of artwork collections.

use std::sync::Arc;
use tracing::warn;

use artfolio_backend::KeyValueStore;
use artfolio_common::{ArtworkId, ArtworkRecord, OwnerId, Result};

const KEY_PREFIX: &str = "artworks_";

/// Build the cache key for an owner: `artworks_{ownerId}`.
pub fn cache_key(owner: &OwnerId) -> String {
    format!("{}{}", KEY_PREFIX, owner)
}

/// Extract the owner from a cache key, if it is one.
pub fn owner_from_key(key: &str) -> Option<OwnerId> {
    key.strip_prefix(KEY_PREFIX)
        .and_then(|rest| OwnerId::new(rest).ok())
}

/// Durable mirror of each owner's reconciled collection.
///
/// Read-through cache and write-ahead staging area in one: every operation
/// publishes its result here, and offline reads are served from here alone.
/// Each `put` fully replaces the stored collection, so callers must pass the
/// complete reconciled set.
pub struct LocalRecordStore<K> {
    kv: Arc<K>,
}

impl<K: KeyValueStore> LocalRecordStore<K> {
    /// Create a store over the given key-value backend.
    pub fn new(kv: Arc<K>) -> Self {
        Self { kv }
    }

    /// Read the collection for an owner.
    ///
    /// Missing keys yield an empty collection. A corrupted stored value is
    /// treated as empty and logged; a parse failure never reaches the
    /// caller.
    pub async fn get(&self, owner: &OwnerId) -> Vec<ArtworkRecord> {
        let key = cache_key(owner);
        let raw = match self.kv.get(&key).await {
            Ok(value) => value,
            Err(err) => {
                warn!("Reading cache for {} failed, treating as empty: {}", owner, err);
                return Vec::new();
            }
        };

        match raw {
            None => Vec::new(),
            Some(json) => match serde_json::from_str(&json) {
                Ok(records) => records,
                Err(err) => {
                    warn!("Corrupt cache for {}, treating as empty: {}", owner, err);
                    Vec::new()
                }
            },
        }
    }

    /// Whether anything was ever stored for this owner.
    ///
    /// Distinguishes "never cached" from "cached empty": an offline fetch
    /// against the former is a total failure, against the latter a success.
    pub async fn is_cached(&self, owner: &OwnerId) -> bool {
        matches!(self.kv.get(&cache_key(owner)).await, Ok(Some(_)))
    }

    /// Replace the stored collection for an owner.
    pub async fn put(&self, owner: &OwnerId, records: &[ArtworkRecord]) -> Result<()> {
        let json = serde_json::to_string(records)
            .map_err(|e| artfolio_common::Error::Serialization(e.to_string()))?;
        self.kv.set(&cache_key(owner), &json).await
    }

    /// Remove one entity from an owner's collection.
    ///
    /// Returns the remaining collection. Removing an absent entity is a
    /// no-op.
    pub async fn remove_entity(
        &self,
        owner: &OwnerId,
        entity_id: &ArtworkId,
    ) -> Result<Vec<ArtworkRecord>> {
        let mut records = self.get(owner).await;
        records.retain(|r| &r.id != entity_id);
        self.put(owner, &records).await?;
        Ok(records)
    }

    /// Enumerate all owners with a cached collection.
    pub async fn owners(&self) -> Result<Vec<OwnerId>> {
        let mut owners: Vec<OwnerId> = self
            .kv
            .keys()
            .await?
            .iter()
            .filter_map(|k| owner_from_key(k))
            .collect();
        owners.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(owners)
    }
}
