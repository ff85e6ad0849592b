//! Per-owner, per-category quota accounting.

use serde::Serialize;

use artfolio_common::{ArtworkRecord, MediaKind};

/// Configured upload limits per category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaLimits {
    pub image: u32,
    pub video: u32,
    pub audio: u32,
}

impl QuotaLimits {
    /// Limit for a category. Unknown kinds have none.
    pub fn limit_for(&self, kind: MediaKind) -> Option<u32> {
        match kind {
            MediaKind::Image => Some(self.image),
            MediaKind::Video => Some(self.video),
            MediaKind::Audio => Some(self.audio),
            MediaKind::Unknown => None,
        }
    }
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            image: 3,
            video: 1,
            audio: 1,
        }
    }
}

/// Usage counter for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryUsage {
    pub used: u32,
    pub limit: u32,
}

impl CategoryUsage {
    /// Whether another upload in this category must be rejected.
    pub fn is_full(&self) -> bool {
        self.used >= self.limit
    }
}

/// Derived per-category usage for one owner.
///
/// Never stored: always recomputed from the current reconciled collection,
/// so the displayed quota cannot drift from the actual record count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaState {
    pub image: CategoryUsage,
    pub video: CategoryUsage,
    pub audio: CategoryUsage,
}

impl QuotaState {
    /// Usage for a category. Unknown kinds have none.
    pub fn usage(&self, kind: MediaKind) -> Option<CategoryUsage> {
        match kind {
            MediaKind::Image => Some(self.image),
            MediaKind::Video => Some(self.video),
            MediaKind::Audio => Some(self.audio),
            MediaKind::Unknown => None,
        }
    }

    /// Whether an upload of the given kind must be rejected.
    ///
    /// This is the admission-control check: it runs before any network
    /// call. Unknown kinds never count against a quota.
    pub fn is_over_quota(&self, kind: MediaKind) -> bool {
        self.usage(kind).map(|u| u.is_full()).unwrap_or(false)
    }
}

/// Derives quota usage from reconciled collections.
#[derive(Debug, Clone, Default)]
pub struct QuotaTracker {
    limits: QuotaLimits,
}

impl QuotaTracker {
    /// Create a tracker with the given limits.
    pub fn new(limits: QuotaLimits) -> Self {
        Self { limits }
    }

    /// The configured limits.
    pub fn limits(&self) -> &QuotaLimits {
        &self.limits
    }

    /// Compute usage from a reconciled collection.
    ///
    /// A pure function of its input: one increment per record of a counted
    /// kind, unknown kinds ignored.
    pub fn compute(&self, records: &[ArtworkRecord]) -> QuotaState {
        let mut state = QuotaState {
            image: CategoryUsage {
                used: 0,
                limit: self.limits.image,
            },
            video: CategoryUsage {
                used: 0,
                limit: self.limits.video,
            },
            audio: CategoryUsage {
                used: 0,
                limit: self.limits.audio,
            },
        };

        for record in records {
            match record.media_kind {
                MediaKind::Image => state.image.used += 1,
                MediaKind::Video => state.video.used += 1,
                MediaKind::Audio => state.audio.used += 1,
                MediaKind::Unknown => {}
            }
        }

        state
    }
}
