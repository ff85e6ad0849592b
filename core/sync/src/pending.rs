//! Durable log of operations awaiting network availability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use artfolio_backend::KeyValueStore;
use artfolio_common::{ArtworkId, Error, PendingKind, Result};

const UPLOAD_PREFIX: &str = "pending_upload_";
const DB_SYNC_PREFIX: &str = "pending_db_sync_";

/// Persisted value of a pending entry. Field names are part of the cache
/// interop format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingMeta {
    timestamp: DateTime<Utc>,
    attempt_count: u32,
    last_attempt_at: DateTime<Utc>,
}

/// A deferred action awaiting network availability.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOperation {
    pub entity_id: ArtworkId,
    pub kind: PendingKind,
    /// When the operation was first deferred.
    pub created_at: DateTime<Utc>,
    /// Number of failed replay attempts.
    pub attempt_count: u32,
    pub last_attempt_at: DateTime<Utc>,
}

fn key_for(kind: PendingKind, entity_id: &ArtworkId) -> String {
    match kind {
        PendingKind::Upload => format!("{}{}", UPLOAD_PREFIX, entity_id),
        PendingKind::DbSync => format!("{}{}", DB_SYNC_PREFIX, entity_id),
    }
}

fn parse_key(key: &str) -> Option<(PendingKind, ArtworkId)> {
    if let Some(rest) = key.strip_prefix(DB_SYNC_PREFIX) {
        return ArtworkId::new(rest).ok().map(|id| (PendingKind::DbSync, id));
    }
    if let Some(rest) = key.strip_prefix(UPLOAD_PREFIX) {
        return ArtworkId::new(rest).ok().map(|id| (PendingKind::Upload, id));
    }
    None
}

/// Durable record of operations that could not be confirmed against the
/// backend, replayed by the reconnect sweep.
///
/// Invariant: after a confirmed sync or a user deletion of the entity, no
/// entry for that entity id remains.
pub struct PendingOperationLog<K> {
    kv: Arc<K>,
}

impl<K: KeyValueStore> PendingOperationLog<K> {
    /// Create a log over the given key-value backend.
    pub fn new(kv: Arc<K>) -> Self {
        Self { kv }
    }

    /// Record a pending operation for an entity.
    ///
    /// A fresh entry starts with zero replay attempts. Re-recording an
    /// existing entry keeps its original timestamp and attempt count.
    pub async fn record(&self, entity_id: &ArtworkId, kind: PendingKind) -> Result<()> {
        let key = key_for(kind, entity_id);
        let now = Utc::now();
        let meta = match self.read_meta(&key).await {
            Some(existing) => existing,
            None => PendingMeta {
                timestamp: now,
                attempt_count: 0,
                last_attempt_at: now,
            },
        };
        self.write_meta(&key, &meta).await
    }

    /// Count a failed replay attempt against an entry.
    ///
    /// Bumps `attemptCount` and `lastAttemptAt`. A no-op when the entry no
    /// longer exists (it may have been cleared or downgraded meanwhile).
    pub async fn mark_attempt(&self, entity_id: &ArtworkId, kind: PendingKind) -> Result<()> {
        let key = key_for(kind, entity_id);
        if let Some(mut meta) = self.read_meta(&key).await {
            meta.attempt_count += 1;
            meta.last_attempt_at = Utc::now();
            self.write_meta(&key, &meta).await?;
        }
        Ok(())
    }

    /// Fetch one entry, if present.
    pub async fn get(
        &self,
        entity_id: &ArtworkId,
        kind: PendingKind,
    ) -> Result<Option<PendingOperation>> {
        let key = key_for(kind, entity_id);
        Ok(self.read_meta(&key).await.map(|meta| PendingOperation {
            entity_id: entity_id.clone(),
            kind,
            created_at: meta.timestamp,
            attempt_count: meta.attempt_count,
            last_attempt_at: meta.last_attempt_at,
        }))
    }

    /// Remove every pending entry for an entity, across both kinds.
    ///
    /// Idempotent: clearing a non-existent entry is a no-op. Deletion of an
    /// entity must always clear it here so a removed artwork is never
    /// replayed.
    pub async fn clear(&self, entity_id: &ArtworkId) -> Result<()> {
        self.kv
            .remove(&key_for(PendingKind::Upload, entity_id))
            .await?;
        self.kv
            .remove(&key_for(PendingKind::DbSync, entity_id))
            .await
    }

    /// Scan all pending entries regardless of owner, oldest
    /// `lastAttemptAt` first so no entry starves.
    pub async fn list_all(&self) -> Result<Vec<PendingOperation>> {
        let mut operations = Vec::new();
        for key in self.kv.keys().await? {
            let Some((kind, entity_id)) = parse_key(&key) else {
                continue;
            };
            match self.read_meta(&key).await {
                Some(meta) => operations.push(PendingOperation {
                    entity_id,
                    kind,
                    created_at: meta.timestamp,
                    attempt_count: meta.attempt_count,
                    last_attempt_at: meta.last_attempt_at,
                }),
                None => warn!("Skipping unreadable pending entry {}", key),
            }
        }
        operations.sort_by(|a, b| {
            a.last_attempt_at
                .cmp(&b.last_attempt_at)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        Ok(operations)
    }

    async fn read_meta(&self, key: &str) -> Option<PendingMeta> {
        match self.kv.get(key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(meta) => Some(meta),
                Err(err) => {
                    warn!("Corrupt pending entry {}: {}", key, err);
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!("Reading pending entry {} failed: {}", key, err);
                None
            }
        }
    }

    async fn write_meta(&self, key: &str, meta: &PendingMeta) -> Result<()> {
        let json =
            serde_json::to_string(meta).map_err(|e| Error::Serialization(e.to_string()))?;
        self.kv.set(key, &json).await
    }
}
