//! Segment damage helpers.
//!
//! A crash mid-append leaves a torn record at the end of a segment; a bad
//! sector or a foreign writer can leave anything anywhere. These helpers
//! reproduce both on files written by a real store.

use batchlog_codec::{BatchEncoder, RawBatchEvent, RawMetaFormat, BLOCK_HEADER_SIZE};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Writes `events` to `<root>/<timestamp>` in the on-disk format, without a
/// sidecar. Returns the segment path.
pub fn write_raw_segment(root: &Path, timestamp: u64, events: &[RawBatchEvent]) -> io::Result<PathBuf> {
    let mut encoder = BatchEncoder::new(&RawMetaFormat);
    for event in events {
        encoder
            .encode(event)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    }
    std::fs::create_dir_all(root)?;
    let path = root.join(timestamp.to_string());
    std::fs::write(&path, encoder.into_bytes())?;
    Ok(path)
}

/// Cuts the last `bytes` bytes of `path`, as a crash during append would.
pub fn truncate_tail(path: &Path, bytes: u64) -> io::Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    let len = file.metadata()?.len();
    file.set_len(len.saturating_sub(bytes))
}

/// Appends `garbage` to `path`.
pub fn append_garbage(path: &Path, garbage: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(garbage)?;
    file.sync_all()
}

/// Overwrites the block type of the block starting at `offset`.
pub fn set_block_type(path: &Path, offset: usize, block_type: u16) -> io::Result<()> {
    let mut bytes = std::fs::read(path)?;
    if offset + 2 > bytes.len() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "offset past end"));
    }
    bytes[offset..offset + 2].copy_from_slice(&block_type.to_be_bytes());
    std::fs::write(path, bytes)
}

/// Offset of the record `index` in a segment of `events`, each framed as a
/// meta block followed by a data block.
#[must_use]
pub fn record_offset(events: &[RawBatchEvent], index: usize) -> usize {
    events
        .iter()
        .take(index)
        .map(|e| 2 * BLOCK_HEADER_SIZE + e.metadata.len() + e.data.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use batchlog_codec::decode_batch;
    use tempfile::tempdir;

    fn events() -> Vec<RawBatchEvent> {
        vec![
            RawBatchEvent::with_metadata(b"one".to_vec(), b"m".to_vec()),
            RawBatchEvent::new(b"two".to_vec()),
        ]
    }

    #[test]
    fn raw_segment_decodes() {
        let dir = tempdir().unwrap();
        let path = write_raw_segment(dir.path(), 42, &events()).unwrap();

        assert_eq!(path.file_name().unwrap(), "42");
        let decoded = decode_batch(&std::fs::read(&path).unwrap(), &RawMetaFormat);
        assert_eq!(decoded.events, events());
        assert!(decoded.is_complete());
    }

    #[test]
    fn torn_tail_keeps_prefix() {
        let dir = tempdir().unwrap();
        let path = write_raw_segment(dir.path(), 1, &events()).unwrap();
        truncate_tail(&path, 1).unwrap();

        let decoded = decode_batch(&std::fs::read(&path).unwrap(), &RawMetaFormat);
        assert_eq!(decoded.events, events()[..1].to_vec());
        assert!(decoded.stop.is_some());
    }

    #[test]
    fn record_offsets_point_at_meta_blocks() {
        let dir = tempdir().unwrap();
        let path = write_raw_segment(dir.path(), 1, &events()).unwrap();
        let bytes = std::fs::read(&path).unwrap();

        let offset = record_offset(&events(), 1);
        assert_eq!(&bytes[offset..offset + 2], &1u16.to_be_bytes());
        assert_eq!(record_offset(&events(), 2), bytes.len());
    }
}
