//! Common error types for Artfolio.

use thiserror::Error;

/// Top-level error type for Artfolio operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network request failed or the connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    /// Operation exceeded its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote object storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote record table failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not allowed to perform the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload rejected because the owner's category quota is full.
    #[error("Quota exceeded for {kind}: {used}/{limit} used")]
    QuotaExceeded {
        kind: crate::MediaKind,
        used: u32,
        limit: u32,
    },

    /// No connectivity and no usable local data.
    #[error("Offline: {0}")]
    Offline(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A retried operation failed on every attempt.
    #[error("After {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Whether retrying could plausibly succeed.
    ///
    /// Network, timeout, I/O and backend failures are transient; everything
    /// else is terminal and must not be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Network(_)
                | Error::Timeout(_)
                | Error::Io(_)
                | Error::Storage(_)
                | Error::Database(_)
        )
    }

    /// Whether the error is terminal: retrying cannot help.
    pub fn is_terminal(&self) -> bool {
        !self.is_transient()
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
