//! Artfolio offline-resilient synchronization core.
//!
//! This module keeps a student's artwork collection consistent between a
//! hosted backend and a durable local cache, including:
//! - Retry strategy with exponential backoff for transient errors
//! - A per-owner record cache doubling as write-ahead staging
//! - A durable pending operation log replayed on reconnect
//! - Deterministic remote-precedence merging with deduplication
//! - Derived per-category quota with pre-I/O admission control

pub mod cache;
pub mod coordinator;
pub mod merge;
pub mod pending;
pub mod quota;
pub mod retry;
pub mod staging;
pub mod watcher;

// Re-export main types
pub use cache::LocalRecordStore;
pub use coordinator::{
    DeleteOutcome, FetchOutcome, FetchSource, SweepReport, SyncConfig, SyncCoordinator,
    UploadDisposition, UploadOutcome, UploadRequest,
};
pub use merge::{merge, sort_records};
pub use pending::{PendingOperation, PendingOperationLog};
pub use quota::{CategoryUsage, QuotaLimits, QuotaState, QuotaTracker};
pub use retry::{retry, RetryConfig, RetryExecutor};
pub use staging::MediaStagingArea;
pub use watcher::run_reconnect_watcher;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        // Verify all main types are accessible
        let _config = SyncConfig::default();
        let _retry_config = RetryConfig::default();
        let _limits = QuotaLimits::default();
        let _tracker = QuotaTracker::default();
    }
}
