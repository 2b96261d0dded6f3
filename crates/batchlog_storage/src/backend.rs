//! Reader/writer trait definitions and the factory choosing between the
//! plain and the encrypting implementations.

use crate::diagnostics::DiagnosticSink;
use crate::encrypted::{EncryptedBatchFileReaderWriter, EncryptedFileReaderWriter, Encryption};
use crate::error::StorageResult;
use crate::file::{PlainBatchFileReaderWriter, PlainFileReaderWriter};
use batchlog_codec::{MetaFormat, RawBatchEvent};
use std::path::Path;
use std::sync::Arc;

/// Reads and writes framed events in a segment file.
///
/// # Invariants
///
/// - `write_data` with `append = true` adds exactly one record at the end
///   of the file, or nothing at all
/// - `read_data` returns the events of every complete record, in order
/// - Decoding anomalies are not errors: they are reported to the sink and
///   the readable prefix is returned
///
/// Implementations support a single writer per file.
pub trait BatchFileReaderWriter: Send + Sync {
    /// Writes one event to `path`, appending or replacing the content.
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be framed or the file cannot be
    /// written.
    fn write_data(&self, path: &Path, event: &RawBatchEvent, append: bool) -> StorageResult<()>;

    /// Reads every event stored in `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is missing, is not a regular file, or
    /// cannot be read.
    fn read_data(&self, path: &Path) -> StorageResult<Vec<RawBatchEvent>>;

    /// Number of bytes `write_data` would add to a file for `event`.
    ///
    /// # Errors
    ///
    /// Returns an error if the event could not be written at all.
    fn encoded_len(&self, event: &RawBatchEvent) -> StorageResult<u64>;
}

/// Reads and writes whole files as opaque bytes.
///
/// Used for segment sidecars.
pub trait FileReaderWriter: Send + Sync {
    /// Writes `data` to `path`, appending or replacing the content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn write_data(&self, path: &Path, data: &[u8], append: bool) -> StorageResult<()>;

    /// Reads the whole content of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is missing, is not a regular file, or
    /// cannot be read.
    fn read_data(&self, path: &Path) -> StorageResult<Vec<u8>>;
}

/// Creates the batch reader/writer for a store.
///
/// With an encryption provider the plain implementation is wrapped in an
/// [`EncryptedBatchFileReaderWriter`]; without one it is returned as is.
pub fn create_batch_reader_writer(
    encryption: Option<Arc<dyn Encryption>>,
    meta_format: Arc<dyn MetaFormat>,
    sink: Arc<dyn DiagnosticSink>,
) -> Arc<dyn BatchFileReaderWriter> {
    let plain = PlainBatchFileReaderWriter::new(meta_format, sink);
    match encryption {
        Some(encryption) => Arc::new(EncryptedBatchFileReaderWriter::new(
            encryption,
            Box::new(plain),
        )),
        None => Arc::new(plain),
    }
}

/// Creates the whole-file reader/writer for a store.
pub fn create_file_reader_writer(
    encryption: Option<Arc<dyn Encryption>>,
) -> Arc<dyn FileReaderWriter> {
    let plain = PlainFileReaderWriter::new();
    match encryption {
        Some(encryption) => Arc::new(EncryptedFileReaderWriter::new(encryption, Box::new(plain))),
        None => Arc::new(plain),
    }
}
