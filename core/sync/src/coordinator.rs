//! Orchestration of fetch, upload, delete and the reconnect sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::join;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use artfolio_backend::{ConnectivitySignal, KeyValueStore, ObjectStore, RecordTable};
use artfolio_common::{
    ArtworkId, ArtworkRecord, Error, MediaKind, Origin, OwnerId, PendingKind, Result,
    StorageLocation, SyncStatus,
};

use crate::cache::LocalRecordStore;
use crate::merge::{merge, sort_records};
use crate::pending::{PendingOperation, PendingOperationLog};
use crate::quota::{QuotaLimits, QuotaState, QuotaTracker};
use crate::retry::{RetryConfig, RetryExecutor};
use crate::staging::MediaStagingArea;

/// Configuration for the sync coordinator.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Total attempts per remote call.
    pub max_attempts: u32,
    /// Base backoff delay.
    pub base_delay: Duration,
    /// Backoff multiplier.
    pub backoff_factor: f64,
    /// Overall deadline per remote call, covering all retries.
    pub remote_call_timeout: Duration,
    /// Per-category upload limits.
    pub quota_limits: QuotaLimits,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            backoff_factor: 1.5,
            remote_call_timeout: Duration::from_secs(30),
            quota_limits: QuotaLimits::default(),
        }
    }
}

/// Where fetched records came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Reconciled against a live remote query.
    Remote,
    /// Remote failed; cached records served instead.
    CacheFallback,
    /// Offline; no remote attempt was made.
    CacheOffline,
}

/// Result of a fetch operation.
#[derive(Debug)]
pub struct FetchOutcome {
    pub records: Vec<ArtworkRecord>,
    pub quota: QuotaState,
    pub source: FetchSource,
    /// Non-fatal degradation notice, set when serving stale data.
    pub warning: Option<String>,
}

/// How an upload ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadDisposition {
    /// File and row are durably on the backend.
    Confirmed,
    /// File stored; the metadata row will be synced later.
    AwaitingDbSync,
    /// File saved locally; everything will be synced later.
    SavedLocally,
}

impl UploadDisposition {
    /// Human-readable outcome for the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            UploadDisposition::Confirmed => "Upload successful",
            UploadDisposition::AwaitingDbSync => {
                "Uploaded; the record will finish syncing when the connection recovers"
            }
            UploadDisposition::SavedLocally => "Saved locally, will sync later",
        }
    }
}

/// A new upload to process.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub owner: OwnerId,
    pub kind: MediaKind,
    pub title: String,
    pub description: String,
    /// Client-side file name; only the extension is kept.
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Result of an upload operation.
#[derive(Debug)]
pub struct UploadOutcome {
    pub record: ArtworkRecord,
    pub records: Vec<ArtworkRecord>,
    pub quota: QuotaState,
    pub disposition: UploadDisposition,
}

/// Result of a delete operation. `None` means the removal was not
/// attempted (offline, or nothing to remove remotely).
#[derive(Debug)]
pub struct DeleteOutcome {
    pub storage_deleted: Option<bool>,
    pub record_deleted: Option<bool>,
    pub records: Vec<ArtworkRecord>,
    pub quota: QuotaState,
}

impl DeleteOutcome {
    /// Human-readable outcome for the UI.
    pub fn user_message(&self) -> &'static str {
        if self.storage_deleted == Some(false) || self.record_deleted == Some(false) {
            "Artwork deleted (a backend copy may remain and is cleaned up later)"
        } else {
            "Artwork deleted"
        }
    }
}

/// Result of a reconnect sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Coordinates all synchronization between the local cache and the hosted
/// backend.
///
/// The single entry point for fetch, upload and delete: consumers must not
/// reimplement retry or merge logic. Collaborators are injected, never read
/// from ambient globals. Writes for one owner are serialized; concurrent
/// callers for the same owner queue, distinct owners proceed in parallel.
pub struct SyncCoordinator<S, T, K, C> {
    objects: Arc<S>,
    table: Arc<T>,
    cache: LocalRecordStore<K>,
    pending: PendingOperationLog<K>,
    staging: MediaStagingArea<K>,
    connectivity: Arc<C>,
    retry: RetryExecutor,
    quota: QuotaTracker,
    config: SyncConfig,
    owner_locks: Mutex<HashMap<OwnerId, Arc<Mutex<()>>>>,
}

impl<S, T, K, C> SyncCoordinator<S, T, K, C>
where
    S: ObjectStore,
    T: RecordTable,
    K: KeyValueStore,
    C: ConnectivitySignal,
{
    /// Create a coordinator over the injected collaborators.
    pub fn new(
        objects: Arc<S>,
        table: Arc<T>,
        kv: Arc<K>,
        connectivity: Arc<C>,
        config: SyncConfig,
    ) -> Self {
        let retry_config = RetryConfig::new(config.max_attempts)
            .with_base_delay(config.base_delay)
            .with_backoff_factor(config.backoff_factor);

        Self {
            objects,
            table,
            cache: LocalRecordStore::new(kv.clone()),
            pending: PendingOperationLog::new(kv.clone()),
            staging: MediaStagingArea::new(kv),
            connectivity,
            retry: RetryExecutor::new(retry_config),
            quota: QuotaTracker::new(config.quota_limits.clone()),
            config,
            owner_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the reconciled collection for an owner.
    ///
    /// Offline, the cache is the only source and a never-cached owner is a
    /// hard failure. Online, the remote result is merged with the cache and
    /// written back; a failed remote query degrades to the cache with a
    /// non-fatal warning whenever cached data exists.
    pub async fn fetch(&self, owner: &OwnerId) -> Result<FetchOutcome> {
        let lock = self.owner_lock(owner).await;
        let _guard = lock.lock().await;
        self.fetch_locked(owner).await
    }

    async fn fetch_locked(&self, owner: &OwnerId) -> Result<FetchOutcome> {
        if !self.connectivity.is_online() {
            if !self.cache.is_cached(owner).await {
                return Err(Error::Offline(format!(
                    "no cached records for {} and no network",
                    owner
                )));
            }
            let records = self.cache.get(owner).await;
            debug!(
                "Offline fetch for {} served {} cached records",
                owner,
                records.len()
            );
            let quota = self.quota.compute(&records);
            return Ok(FetchOutcome {
                records,
                quota,
                source: FetchSource::CacheOffline,
                warning: None,
            });
        }

        let table = self.table.clone();
        let query_owner = owner.clone();
        let remote = self
            .retry
            .execute_timed(self.config.remote_call_timeout, move || {
                let table = table.clone();
                let owner = query_owner.clone();
                async move { table.query(&owner).await }
            })
            .await;

        match remote {
            Ok(remote_records) => {
                let merged = merge(remote_records, self.cache.get(owner).await);
                self.cache.put(owner, &merged).await?;
                let quota = self.quota.compute(&merged);
                Ok(FetchOutcome {
                    records: merged,
                    quota,
                    source: FetchSource::Remote,
                    warning: None,
                })
            }
            Err(err) => {
                if !self.cache.is_cached(owner).await {
                    return Err(err);
                }
                warn!("Remote fetch for {} failed, serving cache: {}", owner, err);
                let records = self.cache.get(owner).await;
                let quota = self.quota.compute(&records);
                Ok(FetchOutcome {
                    records,
                    quota,
                    source: FetchSource::CacheFallback,
                    warning: Some(format!(
                        "Showing locally saved artworks; the server is unreachable: {}",
                        err
                    )),
                })
            }
        }
    }

    /// Process a new upload.
    ///
    /// Admission control runs against the cached reconciled collection
    /// before any I/O. The bytes are staged write-ahead; a failed file
    /// transfer falls back to a local-only record instead of failing the
    /// operation, and a failed row insert after a stored file stages a
    /// db-sync. Only validation and quota rejections surface as errors.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadOutcome> {
        if request.kind == MediaKind::Unknown {
            return Err(Error::InvalidInput(
                "media kind must be image, video or audio".to_string(),
            ));
        }
        if request.title.trim().is_empty() {
            return Err(Error::InvalidInput("title must not be empty".to_string()));
        }
        if request.file_name.is_empty() {
            return Err(Error::InvalidInput("file name must not be empty".to_string()));
        }

        let lock = self.owner_lock(&request.owner).await;
        let _guard = lock.lock().await;

        // Admission control precedes any network call.
        let cached = self.cache.get(&request.owner).await;
        let current = self.quota.compute(&cached);
        if let Some(usage) = current.usage(request.kind) {
            if usage.is_full() {
                return Err(Error::QuotaExceeded {
                    kind: request.kind,
                    used: usage.used,
                    limit: usage.limit,
                });
            }
        }

        let now = Utc::now();
        let timestamp_ms = now.timestamp_millis();
        let id = ArtworkId::mint(&request.owner, request.kind, timestamp_ms);
        let file_path = format!(
            "{}/{}/{}-{}.{}",
            request.owner,
            request.kind.plural(),
            timestamp_ms,
            slugify(&request.title),
            extension_of(&request.file_name),
        );

        // Write-ahead: stage the bytes before the first remote attempt so a
        // failed transfer can be replayed after a restart.
        self.staging.stash(&id, &request.data).await?;

        let mut record = ArtworkRecord {
            id: id.clone(),
            owner_id: request.owner.clone(),
            title: request.title.clone(),
            description: request.description.clone(),
            media_kind: request.kind,
            media_url: format!("local://{}", file_path),
            file_path: file_path.clone(),
            storage_location: StorageLocation::LocalOnly,
            sync_status: SyncStatus::PendingUpload,
            created_at: now,
            origin: Some(Origin::Local),
        };

        let disposition = if self.connectivity.is_online() {
            match self.transfer_file(&file_path, request.data.clone()).await {
                Ok(url) => {
                    record.media_url = url;
                    record.storage_location = StorageLocation::Remote;
                    record.sync_status = SyncStatus::Confirmed;

                    match self.insert_row(&record).await {
                        Ok(()) => {
                            self.staging.discard(&id).await?;
                            UploadDisposition::Confirmed
                        }
                        Err(err) => {
                            warn!("Row insert for {} failed after stored file: {}", id, err);
                            record.sync_status = SyncStatus::PendingDbSync;
                            self.pending.record(&id, PendingKind::DbSync).await?;
                            // The file is stored; its bytes are no longer needed.
                            self.staging.discard(&id).await?;
                            UploadDisposition::AwaitingDbSync
                        }
                    }
                }
                Err(err) => {
                    warn!("File transfer for {} failed, keeping local copy: {}", id, err);
                    // The row insert is still attempted; the upload replay
                    // re-inserts idempotently by id either way.
                    if let Err(insert_err) = self.insert_row(&record).await {
                        debug!("Row insert for {} also failed: {}", id, insert_err);
                    }
                    self.pending.record(&id, PendingKind::Upload).await?;
                    UploadDisposition::SavedLocally
                }
            }
        } else {
            debug!("Offline upload for {}, staging locally", id);
            self.pending.record(&id, PendingKind::Upload).await?;
            UploadDisposition::SavedLocally
        };

        // Publish through the cache on every path, including failure paths.
        let records = self.upsert_cached(&request.owner, record.clone()).await?;
        let quota = self.quota.compute(&records);
        info!("Upload {} finished: {}", id, disposition.user_message());

        Ok(UploadOutcome {
            record,
            records,
            quota,
            disposition,
        })
    }

    /// Delete an artwork.
    ///
    /// Remote storage and table removals are attempted independently when
    /// online; either failing is logged, blocks nothing, and leaves cleanup
    /// to a later sweep of the backend. Local removal and pending-log
    /// clearing always happen, so a deleted item never reappears in the UI.
    pub async fn delete(&self, owner: &OwnerId, id: &ArtworkId) -> Result<DeleteOutcome> {
        let lock = self.owner_lock(owner).await;
        let _guard = lock.lock().await;

        let record = self
            .cache
            .get(owner)
            .await
            .into_iter()
            .find(|r| &r.id == id);

        let (mut storage_deleted, mut record_deleted) = (None, None);
        if self.connectivity.is_online() {
            let storage_op = async {
                match &record {
                    Some(rec) if rec.storage_location == StorageLocation::Remote => {
                        let result = self.delete_object(&rec.file_path).await;
                        if let Err(err) = &result {
                            warn!("Storage delete for {} failed: {}", id, err);
                        }
                        Some(result.is_ok())
                    }
                    _ => None,
                }
            };
            let table_op = async {
                let result = self.delete_row(id).await;
                if let Err(err) = &result {
                    warn!("Row delete for {} failed: {}", id, err);
                }
                Some(result.is_ok())
            };
            let (s, t) = join!(storage_op, table_op);
            storage_deleted = s;
            record_deleted = t;
        } else {
            debug!("Offline delete for {}, skipping remote calls", id);
        }

        let records = self.cache.remove_entity(owner, id).await?;
        self.pending.clear(id).await?;
        self.staging.discard(id).await?;

        let quota = self.quota.compute(&records);
        Ok(DeleteOutcome {
            storage_deleted,
            record_deleted,
            records,
            quota,
        })
    }

    /// Replay every pending operation, oldest first.
    ///
    /// Called on the offline-to-online transition. Successful replays are
    /// cleared; failures keep their entry with the attempt counted.
    pub async fn sweep_pending(&self) -> Result<SweepReport> {
        let operations = self.pending.list_all().await?;
        if operations.is_empty() {
            return Ok(SweepReport::default());
        }

        info!("Reconnect sweep: {} pending operations", operations.len());
        let mut report = SweepReport::default();

        for op in operations {
            report.attempted += 1;
            match self.replay(&op).await {
                Ok(()) => report.succeeded += 1,
                Err(err) => {
                    warn!("Replay of {} for {} failed: {}", op.kind, op.entity_id, err);
                    self.pending.mark_attempt(&op.entity_id, op.kind).await?;
                    report.failed += 1;
                }
            }
        }

        info!(
            "Reconnect sweep finished: {} attempted, {} succeeded, {} failed",
            report.attempted, report.succeeded, report.failed
        );
        Ok(report)
    }

    async fn replay(&self, op: &PendingOperation) -> Result<()> {
        let Some(owner) = self.find_owner_of(&op.entity_id).await? else {
            // The entity is gone from every cache; the entry is stale.
            debug!("Clearing stale pending entry for {}", op.entity_id);
            self.pending.clear(&op.entity_id).await?;
            return Ok(());
        };

        let lock = self.owner_lock(&owner).await;
        let _guard = lock.lock().await;

        // Re-read under the lock: the entity may have been deleted meanwhile.
        let Some(mut record) = self
            .cache
            .get(&owner)
            .await
            .into_iter()
            .find(|r| r.id == op.entity_id)
        else {
            self.pending.clear(&op.entity_id).await?;
            return Ok(());
        };

        match op.kind {
            PendingKind::Upload => {
                let Some(data) = self.staging.peek(&op.entity_id).await? else {
                    return Err(Error::NotFound(format!(
                        "no staged media for {}",
                        op.entity_id
                    )));
                };

                let url = self.transfer_file(&record.file_path, data).await?;
                record.media_url = url;
                record.storage_location = StorageLocation::Remote;
                record.sync_status = SyncStatus::Confirmed;

                match self.insert_row(&record).await {
                    Ok(()) => {
                        self.upsert_cached(&owner, record).await?;
                        self.pending.clear(&op.entity_id).await?;
                        self.staging.discard(&op.entity_id).await?;
                        Ok(())
                    }
                    Err(err) => {
                        // The file made it this time; only the row remains.
                        record.sync_status = SyncStatus::PendingDbSync;
                        self.upsert_cached(&owner, record).await?;
                        self.pending.clear(&op.entity_id).await?;
                        self.pending
                            .record(&op.entity_id, PendingKind::DbSync)
                            .await?;
                        self.staging.discard(&op.entity_id).await?;
                        Err(err)
                    }
                }
            }
            PendingKind::DbSync => {
                record.sync_status = SyncStatus::Confirmed;
                self.insert_row(&record).await?;
                self.upsert_cached(&owner, record).await?;
                self.pending.clear(&op.entity_id).await?;
                Ok(())
            }
        }
    }

    async fn find_owner_of(&self, id: &ArtworkId) -> Result<Option<OwnerId>> {
        for owner in self.cache.owners().await? {
            if self.cache.get(&owner).await.iter().any(|r| &r.id == id) {
                return Ok(Some(owner));
            }
        }
        Ok(None)
    }

    async fn upsert_cached(
        &self,
        owner: &OwnerId,
        record: ArtworkRecord,
    ) -> Result<Vec<ArtworkRecord>> {
        let mut records = self.cache.get(owner).await;
        records.retain(|r| r.id != record.id);
        records.push(record);
        sort_records(&mut records);
        self.cache.put(owner, &records).await?;
        Ok(records)
    }

    async fn transfer_file(&self, path: &str, data: Vec<u8>) -> Result<String> {
        let objects = self.objects.clone();
        let upload_path = path.to_string();
        self.retry
            .execute_timed(self.config.remote_call_timeout, move || {
                let objects = objects.clone();
                let path = upload_path.clone();
                let data = data.clone();
                async move { objects.upload(&path, data).await }
            })
            .await?;

        let objects = self.objects.clone();
        let url_path = path.to_string();
        self.retry
            .execute_timed(self.config.remote_call_timeout, move || {
                let objects = objects.clone();
                let path = url_path.clone();
                async move { objects.get_public_url(&path).await }
            })
            .await
    }

    async fn insert_row(&self, record: &ArtworkRecord) -> Result<()> {
        let table = self.table.clone();
        let row = record.clone();
        self.retry
            .execute_timed(self.config.remote_call_timeout, move || {
                let table = table.clone();
                let row = row.clone();
                async move { table.insert(&row).await }
            })
            .await
    }

    async fn delete_object(&self, path: &str) -> Result<()> {
        let objects = self.objects.clone();
        let path = path.to_string();
        self.retry
            .execute_timed(self.config.remote_call_timeout, move || {
                let objects = objects.clone();
                let path = path.clone();
                async move { objects.delete(&path).await }
            })
            .await
    }

    async fn delete_row(&self, id: &ArtworkId) -> Result<()> {
        let table = self.table.clone();
        let id = id.clone();
        self.retry
            .execute_timed(self.config.remote_call_timeout, move || {
                let table = table.clone();
                let id = id.clone();
                async move { table.delete(&id).await }
            })
            .await
    }

    async fn owner_lock(&self, owner: &OwnerId) -> Arc<Mutex<()>> {
        let mut locks = self.owner_locks.lock().await;
        locks
            .entry(owner.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn extension_of(file_name: &str) -> &str {
    file_name.rsplit('.').next().unwrap_or(file_name)
}
