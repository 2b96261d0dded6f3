//! Side channel for conditions the engine recovers from.
//!
//! No operation of the engine returns an error to producers or consumers.
//! Whatever goes wrong is recovered locally and described by a
//! [`Diagnostic`] handed to a [`DiagnosticSink`].

use crate::error::StorageError;
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Useful while debugging only.
    Debug,
    /// Recovered anomaly.
    Warn,
    /// Failed operation or data loss.
    Error,
}

/// A reportable condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The configured root exists but is not a directory.
    RootNotDirectory {
        /// The root path.
        path: PathBuf,
    },
    /// The configured root is a directory that cannot be written.
    RootNotWritable {
        /// The root path.
        path: PathBuf,
    },
    /// The configured root does not exist and could not be created.
    RootNotCreated {
        /// The root path.
        path: PathBuf,
    },
    /// Segments use more space than allowed; the oldest are being evicted.
    DiskFull {
        /// Bytes used by segments.
        total: u64,
        /// Configured budget.
        budget: u64,
        /// Bytes to free.
        overage: u64,
    },
    /// A segment could only be partially decoded.
    NotAllDataRead {
        /// The segment path.
        path: PathBuf,
        /// Why decoding stopped.
        reason: String,
    },
    /// A record was skipped because its meta block did not parse.
    MalformedMeta {
        /// The segment path.
        path: PathBuf,
        /// Offset of the skipped record.
        offset: usize,
        /// Parser message.
        reason: String,
    },
    /// A file could not be read.
    ReadFailed {
        /// The file path.
        path: PathBuf,
        /// Underlying error.
        reason: String,
    },
    /// A file could not be written.
    WriteFailed {
        /// The file path.
        path: PathBuf,
        /// Underlying error.
        reason: String,
    },
    /// The encryption provider returned an empty result; nothing was written.
    BadEncryptionResult {
        /// The file that was about to be written.
        path: PathBuf,
    },
    /// A batch id that does not name a segment was released or dropped.
    UnknownBatchId {
        /// The batch id.
        id: String,
    },
    /// A segment id was released or dropped without being locked.
    BatchNotLocked {
        /// The batch id.
        id: String,
    },
    /// A segment or sidecar could not be deleted.
    DeleteFailed {
        /// The file path.
        path: PathBuf,
    },
    /// A segment outside the orchestrator's root was handed in.
    SegmentOutsideRoot {
        /// The segment path.
        path: PathBuf,
        /// The orchestrator root.
        root: PathBuf,
    },
    /// A path whose name is not a segment timestamp.
    NotASegmentFile {
        /// The offending path.
        path: PathBuf,
    },
    /// An event larger than the item cap, or a record larger than the
    /// segment cap, was rejected.
    ItemTooLarge {
        /// Event size.
        size: u64,
        /// Configured cap.
        max: u64,
    },
    /// The sidecar of a segment could not be updated.
    MetadataWriteFailed {
        /// The sidecar path.
        path: PathBuf,
    },
}

impl Diagnostic {
    /// Severity of this diagnostic.
    #[must_use]
    pub fn level(&self) -> Level {
        match self {
            Self::SegmentOutsideRoot { .. } => Level::Debug,
            Self::UnknownBatchId { .. }
            | Self::BatchNotLocked { .. }
            | Self::DeleteFailed { .. }
            | Self::MetadataWriteFailed { .. }
            | Self::MalformedMeta { .. } => Level::Warn,
            Self::RootNotDirectory { .. }
            | Self::RootNotWritable { .. }
            | Self::RootNotCreated { .. }
            | Self::DiskFull { .. }
            | Self::NotAllDataRead { .. }
            | Self::ReadFailed { .. }
            | Self::WriteFailed { .. }
            | Self::BadEncryptionResult { .. }
            | Self::NotASegmentFile { .. }
            | Self::ItemTooLarge { .. } => Level::Error,
        }
    }

    /// Diagnostic for a failed read of `path`.
    #[must_use]
    pub fn read_failed(path: &Path, error: &StorageError) -> Self {
        Self::ReadFailed {
            path: path.to_path_buf(),
            reason: error.to_string(),
        }
    }

    /// Diagnostic for a failed write of `path`.
    #[must_use]
    pub fn write_failed(path: &Path, error: &StorageError) -> Self {
        match error {
            StorageError::BadEncryptionResult => Self::BadEncryptionResult {
                path: path.to_path_buf(),
            },
            other => Self::WriteFailed {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotDirectory { path } => write!(
                f,
                "The provided root file is not a directory: {}",
                path.display()
            ),
            Self::RootNotWritable { path } => {
                write!(f, "The provided root dir is not writable: {}", path.display())
            }
            Self::RootNotCreated { path } => {
                write!(f, "The provided root dir can't be created: {}", path.display())
            }
            Self::DiskFull {
                total,
                budget,
                overage,
            } => write!(
                f,
                "Too much disk space used ({total}/{budget}): cleaning up to free {overage} bytes"
            ),
            Self::NotAllDataRead { path, reason } => write!(
                f,
                "File {} is probably corrupted, not all content was read: {reason}",
                path.display()
            ),
            Self::MalformedMeta {
                path,
                offset,
                reason,
            } => write!(
                f,
                "Skipped record at offset {offset} in {}: {reason}",
                path.display()
            ),
            Self::ReadFailed { path, reason } => {
                write!(f, "Unable to read data from file: {} ({reason})", path.display())
            }
            Self::WriteFailed { path, reason } => {
                write!(f, "Unable to write data to file: {} ({reason})", path.display())
            }
            Self::BadEncryptionResult { path } => write!(
                f,
                "Encryption of non-empty data produced empty result, aborting write to {}",
                path.display()
            ),
            Self::UnknownBatchId { id } => {
                write!(f, "Attempting to unlock or delete an unknown batch {id}")
            }
            Self::BatchNotLocked { id } => {
                write!(f, "Attempting to unlock or delete batch {id}, which is not locked")
            }
            Self::DeleteFailed { path } => {
                write!(f, "Unable to delete file: {}", path.display())
            }
            Self::SegmentOutsideRoot { path, root } => write!(
                f,
                "The file provided ({}) doesn't belong to the current folder ({})",
                path.display(),
                root.display()
            ),
            Self::NotASegmentFile { path } => {
                write!(f, "The file provided is not a batch file: {}", path.display())
            }
            Self::ItemTooLarge { size, max } => write!(
                f,
                "Can't write data with size {size} (max item size is {max})"
            ),
            Self::MetadataWriteFailed { path } => {
                write!(f, "Unable to write metadata file: {}", path.display())
            }
        }
    }
}

/// Receives diagnostics.
pub trait DiagnosticSink: Send + Sync {
    /// Reports one diagnostic.
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.level() {
            Level::Debug => tracing::debug!(target: "batchlog", "{diagnostic}"),
            Level::Warn => tracing::warn!(target: "batchlog", "{diagnostic}"),
            Level::Error => tracing::error!(target: "batchlog", "{diagnostic}"),
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything reported so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    /// Removes and returns everything reported so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Returns true if any reported diagnostic matches `predicate`.
    pub fn any(&self, predicate: impl Fn(&Diagnostic) -> bool) -> bool {
        self.entries.lock().iter().any(predicate)
    }

    /// Number of reported diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }
}
