//! Plain (unencrypted) reader/writers backed by OS file APIs.

use crate::backend::{BatchFileReaderWriter, FileReaderWriter};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::error::{StorageError, StorageResult};
use batchlog_codec::{decode_batch, encode_event, encoded_len, MetaFormat, RawBatchEvent};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

fn open_and_write(path: &Path, bytes: &[u8], append: bool) -> StorageResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .append(append)
        .truncate(!append)
        .open(path)?;
    file.write_all(bytes)?;
    Ok(())
}

fn read_regular_file(path: &Path) -> StorageResult<Vec<u8>> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StorageError::NotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };

    if !metadata.is_file() {
        return Err(StorageError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    Ok(fs::read(path)?)
}

/// Frames events into segment files without transforming them.
///
/// Every record is encoded in memory first and written with a single
/// `write_all`, so a crash leaves at most one incomplete record at the
/// tail of the file.
///
/// # Example
///
/// ```no_run
/// use batchlog_codec::{RawBatchEvent, RawMetaFormat};
/// use batchlog_storage::{BatchFileReaderWriter, PlainBatchFileReaderWriter, TracingSink};
/// use std::path::Path;
/// use std::sync::Arc;
///
/// let rw = PlainBatchFileReaderWriter::new(Arc::new(RawMetaFormat), Arc::new(TracingSink));
/// rw.write_data(Path::new("1700000000000"), &RawBatchEvent::new(b"{}".to_vec()), true).unwrap();
/// let events = rw.read_data(Path::new("1700000000000")).unwrap();
/// ```
pub struct PlainBatchFileReaderWriter {
    meta_format: Arc<dyn MetaFormat>,
    sink: Arc<dyn DiagnosticSink>,
}

impl PlainBatchFileReaderWriter {
    /// Creates a reader/writer using `meta_format` for meta blocks.
    pub fn new(meta_format: Arc<dyn MetaFormat>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { meta_format, sink }
    }

    /// The meta format used for meta blocks.
    pub fn meta_format(&self) -> &dyn MetaFormat {
        self.meta_format.as_ref()
    }
}

impl BatchFileReaderWriter for PlainBatchFileReaderWriter {
    fn write_data(&self, path: &Path, event: &RawBatchEvent, append: bool) -> StorageResult<()> {
        let bytes = encode_event(event, self.meta_format.as_ref())?;
        open_and_write(path, &bytes, append)
    }

    fn read_data(&self, path: &Path) -> StorageResult<Vec<RawBatchEvent>> {
        let bytes = read_regular_file(path)?;
        let decoded = decode_batch(&bytes, self.meta_format.as_ref());

        for skipped in &decoded.malformed {
            self.sink.report(Diagnostic::MalformedMeta {
                path: path.to_path_buf(),
                offset: skipped.offset,
                reason: skipped.reason.clone(),
            });
        }
        if let Some(stop) = &decoded.stop {
            self.sink.report(Diagnostic::NotAllDataRead {
                path: path.to_path_buf(),
                reason: stop.to_string(),
            });
        }

        Ok(decoded.events)
    }

    fn encoded_len(&self, event: &RawBatchEvent) -> StorageResult<u64> {
        Ok(encoded_len(event.metadata.len(), event.data.len()) as u64)
    }
}

/// Reads and writes whole files verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainFileReaderWriter;

impl PlainFileReaderWriter {
    /// Creates a new reader/writer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl FileReaderWriter for PlainFileReaderWriter {
    fn write_data(&self, path: &Path, data: &[u8], append: bool) -> StorageResult<()> {
        open_and_write(path, data, append)
    }

    fn read_data(&self, path: &Path) -> StorageResult<Vec<u8>> {
        read_regular_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingSink;
    use batchlog_codec::{encode_event, JsonMetaFormat, RawMetaFormat};
    use tempfile::tempdir;

    fn rw(sink: &Arc<RecordingSink>) -> PlainBatchFileReaderWriter {
        PlainBatchFileReaderWriter::new(Arc::new(RawMetaFormat), sink.clone())
    }

    fn encode(event: &RawBatchEvent) -> Vec<u8> {
        encode_event(event, &RawMetaFormat).unwrap()
    }

    #[test]
    fn write_into_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1000");
        let sink = Arc::new(RecordingSink::new());
        let event = RawBatchEvent::with_metadata(b"data".to_vec(), b"meta".to_vec());

        rw(&sink).write_data(&path, &event, true).unwrap();

        assert_eq!(fs::read(&path).unwrap(), encode(&event));
    }

    #[test]
    fn overwrite_when_not_appending() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1000");
        fs::write(&path, b"previous content").unwrap();
        let sink = Arc::new(RecordingSink::new());
        let event = RawBatchEvent::new(b"fresh".to_vec());

        rw(&sink).write_data(&path, &event, false).unwrap();

        assert_eq!(fs::read(&path).unwrap(), encode(&event));
    }

    #[test]
    fn append_to_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1000");
        let previous = RawBatchEvent::new(b"previous".to_vec());
        let event = RawBatchEvent::new(b"next".to_vec());
        fs::write(&path, encode(&previous)).unwrap();
        let sink = Arc::new(RecordingSink::new());

        rw(&sink).write_data(&path, &event, true).unwrap();

        let mut expected = encode(&previous);
        expected.extend(encode(&event));
        assert_eq!(fs::read(&path).unwrap(), expected);
    }

    #[test]
    fn encoded_len_is_what_append_adds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1000");
        let sink = Arc::new(RecordingSink::new());
        let rw = rw(&sink);
        let event = RawBatchEvent::with_metadata(b"payload".to_vec(), b"meta".to_vec());

        rw.write_data(&path, &RawBatchEvent::new(b"first".to_vec()), true)
            .unwrap();
        let before = fs::metadata(&path).unwrap().len();
        rw.write_data(&path, &event, true).unwrap();

        let added = fs::metadata(&path).unwrap().len() - before;
        assert_eq!(rw.encoded_len(&event).unwrap(), added);
    }

    #[test]
    fn write_fails_without_parent_dir() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("1000");
        let sink = Arc::new(RecordingSink::new());

        let result = rw(&sink).write_data(&path, &RawBatchEvent::new(b"x".to_vec()), true);
        assert!(matches!(result, Err(StorageError::Io(_))));
    }

    #[test]
    fn write_fails_on_directory() {
        let dir = tempdir().unwrap();
        let sink = Arc::new(RecordingSink::new());

        let result = rw(&sink).write_data(dir.path(), &RawBatchEvent::new(b"x".to_vec()), true);
        assert!(result.is_err());
    }

    #[test]
    fn read_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let sink = Arc::new(RecordingSink::new());

        let result = rw(&sink).read_data(&dir.path().join("1000"));
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn read_directory_is_not_a_file() {
        let dir = tempdir().unwrap();
        let sink = Arc::new(RecordingSink::new());

        let result = rw(&sink).read_data(dir.path());
        assert!(matches!(result, Err(StorageError::NotAFile { .. })));
    }

    #[test]
    fn read_empty_file_is_silent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1000");
        fs::write(&path, b"").unwrap();
        let sink = Arc::new(RecordingSink::new());

        assert!(rw(&sink).read_data(&path).unwrap().is_empty());
        assert!(sink.is_empty());
    }

    #[test]
    fn read_garbage_warns_not_all_data_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1000");
        fs::write(&path, b"this is not a batch file").unwrap();
        let sink = Arc::new(RecordingSink::new());

        assert!(rw(&sink).read_data(&path).unwrap().is_empty());
        assert!(sink.any(|d| matches!(d, Diagnostic::NotAllDataRead { path: p, .. } if p == &path)));
    }

    #[test]
    fn read_stream_cutoff_returns_complete_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1000");
        let events: Vec<_> = (0..5)
            .map(|i| RawBatchEvent::new(format!("event-{i}").into_bytes()))
            .collect();
        let mut bytes: Vec<u8> = events.iter().flat_map(encode).collect();
        bytes.truncate(bytes.len() - 3);
        fs::write(&path, bytes).unwrap();
        let sink = Arc::new(RecordingSink::new());

        let read = rw(&sink).read_data(&path).unwrap();

        assert_eq!(read, events[..4].to_vec());
        assert!(sink.any(|d| matches!(d, Diagnostic::NotAllDataRead { .. })));
    }

    #[test]
    fn malformed_meta_is_reported_and_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1000");
        let sink = Arc::new(RecordingSink::new());
        let json = PlainBatchFileReaderWriter::new(Arc::new(JsonMetaFormat), sink.clone());

        // written without validation, read back with it
        let raw = rw(&sink);
        raw.write_data(&path, &RawBatchEvent::with_metadata(b"a".to_vec(), b"{}".to_vec()), true)
            .unwrap();
        raw.write_data(&path, &RawBatchEvent::with_metadata(b"b".to_vec(), b"{".to_vec()), true)
            .unwrap();
        raw.write_data(&path, &RawBatchEvent::new(b"c".to_vec()), true)
            .unwrap();

        let read = json.read_data(&path).unwrap();
        let data: Vec<_> = read.into_iter().map(|e| e.data).collect();
        assert_eq!(data, vec![b"a".to_vec(), b"c".to_vec()]);
        assert!(sink.any(|d| matches!(d, Diagnostic::MalformedMeta { .. })));
        assert!(!sink.any(|d| matches!(d, Diagnostic::NotAllDataRead { .. })));
    }

    #[test]
    fn plain_file_roundtrip_and_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("1000_metadata");
        let rw = PlainFileReaderWriter::new();

        rw.write_data(&path, b"abc", false).unwrap();
        rw.write_data(&path, b"def", true).unwrap();
        assert_eq!(rw.read_data(&path).unwrap(), b"abcdef".to_vec());

        rw.write_data(&path, b"xyz", false).unwrap();
        assert_eq!(rw.read_data(&path).unwrap(), b"xyz".to_vec());
    }
}
