//! Error types for the synchronization core
//!
//! None of these are fatal: the window manager degrades to single-instance
//! behavior and keeps running. They surface from the lower-level APIs so
//! callers that want to react (logging, the CLI) can.

use thiserror::Error;

/// Errors from shared state access
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Shared store unavailable: {0}")]
    StoreUnavailable(#[from] sharedstore::StoreError),

    #[error("Malformed snapshot: {0}")]
    MalformedSnapshot(#[from] serde_json::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
