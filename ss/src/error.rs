//! Store errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors from shared store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable at {}: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store disabled")]
    Disabled,

    #[error("Invalid key: {0:?}")]
    InvalidKey(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unavailable {
            path: path.into(),
            source,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
