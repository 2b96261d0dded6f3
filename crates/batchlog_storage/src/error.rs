//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file to read does not exist.
    #[error("file not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// The path exists but is not a regular file.
    #[error("not a regular file: {}", path.display())]
    NotAFile {
        /// The offending path.
        path: PathBuf,
    },

    /// The event could not be framed.
    #[error("codec error: {0}")]
    Codec(#[from] batchlog_codec::CodecError),

    /// The encryption provider returned an empty ciphertext.
    #[error("encryption provider returned an empty result")]
    BadEncryptionResult,

    /// Appending is not possible through this reader/writer.
    #[error("append is not supported by this writer")]
    AppendNotSupported,

    /// Encryption or decryption failed.
    #[error("encryption error: {0}")]
    Encryption(String),
}
