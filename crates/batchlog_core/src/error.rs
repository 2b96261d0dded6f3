//! Error types for batchlog core.
//!
//! These errors never reach producers or consumers. Public engine
//! operations turn them into `None`, `false` or an empty result and a
//! [`Diagnostic`](batchlog_storage::Diagnostic).

use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in batchlog core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Reader/writer error.
    #[error("storage error: {0}")]
    Storage(#[from] batchlog_storage::StorageError),

    /// Sidecar document could not be encoded or decoded.
    #[error("metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Configuration rejected by [`PersistenceConfig::validate`](crate::PersistenceConfig::validate).
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Which knob is wrong.
        message: String,
    },

    /// A path whose file name is not a segment timestamp.
    #[error("not a segment file: {}", path.display())]
    InvalidSegment {
        /// The offending path.
        path: PathBuf,
    },
}

impl CoreError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates an invalid segment error.
    pub fn invalid_segment(path: impl Into<PathBuf>) -> Self {
        Self::InvalidSegment { path: path.into() }
    }
}
