//! Dump command implementation.

use batchlog_codec::{decode_batch, MetaFormat};
use serde::Serialize;
use std::path::Path;

/// One decoded record.
#[derive(Debug, Serialize)]
pub struct DumpRecord {
    /// Position in the segment.
    pub index: usize,
    /// Metadata, lossily decoded as UTF-8.
    pub metadata: String,
    /// Data, lossily decoded as UTF-8.
    pub data: String,
}

/// Runs the dump command.
pub fn run(
    segment: &Path,
    meta_format: &dyn MetaFormat,
    limit: Option<usize>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let (records, stop) = dump(segment, meta_format, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        _ => {
            println!("Segment: {}", segment.display());
            println!();
            for record in &records {
                println!("[{}] meta={} data={}", record.index, record.metadata, record.data);
            }
        }
    }

    if let Some(stop) = stop {
        tracing::warn!(segment = %segment.display(), "not all data read: {stop}");
    }
    Ok(())
}

/// Decodes up to `limit` records of `segment`, plus why decoding stopped early.
pub fn dump(
    segment: &Path,
    meta_format: &dyn MetaFormat,
    limit: Option<usize>,
) -> Result<(Vec<DumpRecord>, Option<String>), Box<dyn std::error::Error>> {
    if !segment.is_file() {
        return Err(format!("No segment file at {}", segment.display()).into());
    }

    let bytes = std::fs::read(segment)?;
    let decoded = decode_batch(&bytes, meta_format);
    let stop = decoded.stop.as_ref().map(ToString::to_string);

    let records = decoded
        .events
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(index, event)| DumpRecord {
            index,
            metadata: String::from_utf8_lossy(&event.metadata).into_owned(),
            data: String::from_utf8_lossy(&event.data).into_owned(),
        })
        .collect();

    Ok((records, stop))
}
