//! Sync Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The storage or manifest error that
//! caused the failure is kept as a child of the raised error.

use derive_more::{Display, Error};

/// A sync error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Storage mutation that failed.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    #[display("delete")]
    Delete,
    #[display("upload")]
    Upload,
}

/// Classifies the origin of a sync failure.
///
/// Mutations already applied before the failure are not rolled back; running
/// the sync again against the same previous manifest finishes the job.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A delete or upload against the storage backend failed.
    #[display("failed to {operation} `{key}`")]
    StorageOperationFailed { operation: Operation, key: String },
    /// The published manifest could not be fetched from storage.
    #[display("unable to fetch published manifest")]
    Fetch,
    /// Storage was reconciled but the new manifest could not be written out.
    #[display("unable to persist manifest")]
    Persist,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StorageOperationFailed { .. } | Self::Fetch | Self::Persist => true,
        }
    }
}
