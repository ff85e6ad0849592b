//! JSON-file-backed key-value store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::warn;

use artfolio_common::{Error, Result};

use crate::kv::KeyValueStore;

/// Key-value store persisted as a single pretty-printed JSON file.
///
/// Used by the CLI and by desktop deployments that have no browser-style
/// storage. The whole map is rewritten on every mutation; collections here
/// are small (one key per owner plus pending entries).
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl FileKeyValueStore {
    /// Open a store at the given path, creating parent directories.
    ///
    /// An unreadable or unparseable file is treated as empty and logged,
    /// matching the recovery posture of the record cache.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(Error::Io)?;
        }

        let entries = if path.exists() {
            let content = fs::read_to_string(&path).await.map_err(Error::Io)?;
            match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(err) => {
                    warn!("Discarding unparseable store file {}: {}", path.display(), err);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(&self.path, json).await.map_err(Error::Io)
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}
