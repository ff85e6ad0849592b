//! Common types used throughout Artfolio.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the student who owns a media collection.
///
/// Partitions the local cache and quota accounting: every cache key and
/// every quota computation is scoped to one owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Create a new OwnerId from a string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "OwnerId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally unique artwork identifier, stable across local and remote
/// representations. This is the merge/dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtworkId(String);

impl ArtworkId {
    /// Create an ArtworkId from an existing string.
    ///
    /// # Errors
    /// - Returns error if id is empty
    pub fn new(id: impl Into<String>) -> crate::Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "ArtworkId cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Mint the id for a new upload: `{owner}-{kind}-{timestamp_ms}`.
    ///
    /// The same id names the storage object and the table row, so retrying
    /// either write is idempotent by key.
    pub fn mint(owner: &OwnerId, kind: MediaKind, timestamp_ms: i64) -> Self {
        Self(format!("{}-{}-{}", owner, kind, timestamp_ms))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category of uploaded media.
///
/// `Unknown` absorbs foreign kinds found in cached data so one odd record
/// cannot fail the whole collection parse; quota accounting skips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    #[serde(other)]
    Unknown,
}

impl MediaKind {
    /// Plural form used in storage paths (`{owner}/{kind}s/...`).
    pub fn plural(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
            MediaKind::Audio => "audios",
            MediaKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Whether the media binary is confirmed durably stored on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageLocation {
    /// File is on the remote object store.
    Remote,
    /// File never left this device.
    LocalOnly,
}

/// Sync state of a record relative to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// Both file and record are durably on the backend.
    Confirmed,
    /// File transfer failed; the binary sits local.
    PendingUpload,
    /// File may be stored, but the table row is not confirmed.
    PendingDbSync,
}

/// Provenance tag applied during merge. Reported to callers, never
/// persisted as authoritative state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Origin {
    Remote,
    Local,
}

/// Kind of a deferred operation awaiting network availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PendingKind {
    /// The file transfer (and everything after it) must be replayed.
    Upload,
    /// Only the metadata row insert must be replayed.
    DbSync,
}

impl fmt::Display for PendingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PendingKind::Upload => "upload",
            PendingKind::DbSync => "db-sync",
        };
        write!(f, "{}", s)
    }
}

/// A unit of uploaded media.
///
/// Serialized form is the persisted cache format: camelCase field names,
/// kebab-case enum tokens. `origin` is transient and never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkRecord {
    pub id: ArtworkId,
    pub owner_id: OwnerId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub media_kind: MediaKind,
    /// Resolvable asset reference: a public URL once confirmed, a
    /// `local://` fallback otherwise.
    pub media_url: String,
    /// Object-storage path of the binary.
    pub file_path: String,
    pub storage_location: StorageLocation,
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub origin: Option<Origin>,
}

impl ArtworkRecord {
    /// Whether both file and row are durably on the backend.
    pub fn is_confirmed(&self) -> bool {
        self.sync_status == SyncStatus::Confirmed
    }

    /// Return a copy tagged with the given provenance.
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> ArtworkRecord {
        ArtworkRecord {
            id: ArtworkId::new("alice-image-1700000000000").unwrap(),
            owner_id: OwnerId::new("alice").unwrap(),
            title: "Sunset".to_string(),
            description: String::new(),
            media_kind: MediaKind::Image,
            media_url: "https://cdn.example/alice/images/sunset.png".to_string(),
            file_path: "alice/images/1700000000000-sunset.png".to_string(),
            storage_location: StorageLocation::Remote,
            sync_status: SyncStatus::Confirmed,
            created_at: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
            origin: Some(Origin::Remote),
        }
    }

    #[test]
    fn test_owner_id_empty_fails() {
        assert!(OwnerId::new("").is_err());
    }

    #[test]
    fn test_artwork_id_mint_format() {
        let owner = OwnerId::new("alice").unwrap();
        let id = ArtworkId::mint(&owner, MediaKind::Video, 1700000000000);
        assert_eq!(id.as_str(), "alice-video-1700000000000");
    }

    #[test]
    fn test_record_persisted_field_names() {
        let json = serde_json::to_value(record()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("ownerId"));
        assert!(obj.contains_key("mediaKind"));
        assert!(obj.contains_key("mediaUrl"));
        assert!(obj.contains_key("filePath"));
        assert!(obj.contains_key("storageLocation"));
        assert!(obj.contains_key("syncStatus"));
        assert!(obj.contains_key("createdAt"));
        // Provenance is transient.
        assert!(!obj.contains_key("origin"));
    }

    #[test]
    fn test_enum_tokens() {
        let mut rec = record();
        rec.storage_location = StorageLocation::LocalOnly;
        rec.sync_status = SyncStatus::PendingDbSync;
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["storageLocation"], "local-only");
        assert_eq!(json["syncStatus"], "pending-db-sync");
        assert_eq!(json["mediaKind"], "image");
    }

    #[test]
    fn test_unknown_media_kind_tolerated() {
        let kind: MediaKind = serde_json::from_str("\"hologram\"").unwrap();
        assert_eq!(kind, MediaKind::Unknown);
    }

    #[test]
    fn test_record_roundtrip() {
        let rec = record();
        let json = serde_json::to_string(&rec).unwrap();
        let back: ArtworkRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, rec.id);
        assert_eq!(back.sync_status, rec.sync_status);
        // Origin does not survive persistence.
        assert_eq!(back.origin, None);
    }
}
