//! In-memory backends for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;

use artfolio_common::{ArtworkId, ArtworkRecord, Error, OwnerId, Result};

use crate::kv::KeyValueStore;
use crate::remote::{ObjectStore, RecordTable};

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// In-memory object store.
///
/// All data is stored in memory and lost on drop. The `fail_next_*` knobs
/// make the next N calls fail with a transient storage error, which is how
/// the sync scenarios exercise retry and fallback paths.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    fail_uploads: AtomicU32,
    fail_deletes: AtomicU32,
    upload_calls: AtomicU32,
    delete_calls: AtomicU32,
}

impl MemoryObjectStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` uploads fail with a transient error.
    pub fn fail_next_uploads(&self, n: u32) {
        self.fail_uploads.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` deletes fail with a transient error.
    pub fn fail_next_deletes(&self, n: u32) {
        self.fail_deletes.store(n, Ordering::SeqCst);
    }

    /// Number of upload calls seen, including failed ones.
    pub fn upload_calls(&self) -> u32 {
        self.upload_calls.load(Ordering::SeqCst)
    }

    /// Number of delete calls seen, including failed ones.
    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Whether an object exists at the given path.
    pub fn contains(&self, path: &str) -> bool {
        self.objects.read().unwrap().contains_key(path)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(&self, path: &str, data: Vec<u8>) -> Result<()> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fail_uploads) {
            return Err(Error::Storage("injected upload failure".to_string()));
        }
        self.objects
            .write()
            .unwrap()
            .insert(path.to_string(), data);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fail_deletes) {
            return Err(Error::Storage("injected delete failure".to_string()));
        }
        match self.objects.write().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(Error::NotFound(format!("no object at {}", path))),
        }
    }

    async fn get_public_url(&self, path: &str) -> Result<String> {
        Ok(format!("memory://{}", path))
    }
}

/// In-memory record table.
#[derive(Default)]
pub struct MemoryRecordTable {
    rows: RwLock<HashMap<ArtworkId, ArtworkRecord>>,
    fail_inserts: AtomicU32,
    fail_queries: AtomicU32,
    fail_deletes: AtomicU32,
    insert_calls: AtomicU32,
    query_calls: AtomicU32,
    delete_calls: AtomicU32,
}

impl MemoryRecordTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing call counting.
    pub fn seed(&self, record: ArtworkRecord) {
        self.rows
            .write()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    /// Make the next `n` inserts fail with a transient error.
    pub fn fail_next_inserts(&self, n: u32) {
        self.fail_inserts.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` queries fail with a transient error.
    pub fn fail_next_queries(&self, n: u32) {
        self.fail_queries.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` deletes fail with a transient error.
    pub fn fail_next_deletes(&self, n: u32) {
        self.fail_deletes.store(n, Ordering::SeqCst);
    }

    /// Number of insert calls seen, including failed ones.
    pub fn insert_calls(&self) -> u32 {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// Number of query calls seen, including failed ones.
    pub fn query_calls(&self) -> u32 {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Number of delete calls seen, including failed ones.
    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Fetch one row by id.
    pub fn row(&self, id: &ArtworkId) -> Option<ArtworkRecord> {
        self.rows.read().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl RecordTable for MemoryRecordTable {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert(&self, record: &ArtworkRecord) -> Result<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fail_inserts) {
            return Err(Error::Database("injected insert failure".to_string()));
        }
        self.rows
            .write()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn query(&self, owner: &OwnerId) -> Result<Vec<ArtworkRecord>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fail_queries) {
            return Err(Error::Database("injected query failure".to_string()));
        }
        let mut rows: Vec<ArtworkRecord> = self
            .rows
            .read()
            .unwrap()
            .values()
            .filter(|r| &r.owner_id == owner)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn delete(&self, id: &ArtworkId) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fail_deletes) {
            return Err(Error::Database("injected delete failure".to_string()));
        }
        self.rows.write().unwrap().remove(id);
        Ok(())
    }
}

/// In-memory key-value store.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().unwrap().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().unwrap().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artfolio_common::{MediaKind, StorageLocation, SyncStatus};
    use chrono::Utc;

    fn record(id: &str, owner: &str) -> ArtworkRecord {
        ArtworkRecord {
            id: ArtworkId::new(id).unwrap(),
            owner_id: OwnerId::new(owner).unwrap(),
            title: "t".to_string(),
            description: String::new(),
            media_kind: MediaKind::Image,
            media_url: "memory://x".to_string(),
            file_path: "x".to_string(),
            storage_location: StorageLocation::Remote,
            sync_status: SyncStatus::Confirmed,
            created_at: Utc::now(),
            origin: None,
        }
    }

    #[tokio::test]
    async fn test_object_store_roundtrip() {
        let store = MemoryObjectStore::new();
        store.upload("a/images/x.png", vec![1, 2, 3]).await.unwrap();
        assert!(store.contains("a/images/x.png"));
        assert_eq!(
            store.get_public_url("a/images/x.png").await.unwrap(),
            "memory://a/images/x.png"
        );
        store.delete("a/images/x.png").await.unwrap();
        assert!(!store.contains("a/images/x.png"));
    }

    #[tokio::test]
    async fn test_object_store_failure_injection() {
        let store = MemoryObjectStore::new();
        store.fail_next_uploads(2);

        assert!(store.upload("p", vec![]).await.is_err());
        assert!(store.upload("p", vec![]).await.is_err());
        assert!(store.upload("p", vec![]).await.is_ok());
        assert_eq!(store.upload_calls(), 3);
    }

    #[tokio::test]
    async fn test_table_query_filters_by_owner() {
        let table = MemoryRecordTable::new();
        table.seed(record("a-1", "alice"));
        table.seed(record("b-1", "bob"));

        let owner = OwnerId::new("alice").unwrap();
        let rows = table.query(&owner).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id.as_str(), "a-1");
    }

    #[tokio::test]
    async fn test_table_insert_is_idempotent_by_id() {
        let table = MemoryRecordTable::new();
        let rec = record("a-1", "alice");
        table.insert(&rec).await.unwrap();
        table.insert(&rec).await.unwrap();

        let owner = OwnerId::new("alice").unwrap();
        assert_eq!(table.query(&owner).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_kv_missing_key_is_none() {
        let kv = MemoryKeyValueStore::new();
        assert_eq!(kv.get("absent").await.unwrap(), None);
        kv.remove("absent").await.unwrap();
    }
}
