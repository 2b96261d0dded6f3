//! Inspect command implementation.

use super::{format_size, list_segments};
use batchlog_codec::{decode_batch, MetaFormat};
use batchlog_core::{MetadataStore, Segment, SystemTimeProvider, TimeProvider};
use batchlog_storage::create_file_reader_writer;
use serde::Serialize;
use std::path::Path;

/// Batch directory inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Directory path.
    pub path: String,
    /// Number of segments.
    pub segment_count: usize,
    /// Sum of segment sizes in bytes.
    pub total_size: u64,
    /// Per-segment details, oldest first.
    pub segments: Vec<SegmentInfo>,
}

/// Details of one segment.
#[derive(Debug, Serialize)]
pub struct SegmentInfo {
    /// Segment name (creation timestamp in ms).
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Age in ms at inspection time.
    pub age_ms: u64,
    /// Item count from the sidecar, if readable.
    pub item_count: Option<u64>,
    /// Whether the sidecar carries producer metadata.
    pub has_producer_metadata: bool,
    /// Records that decode cleanly.
    pub records: usize,
}

/// Runs the inspect command.
pub fn run(
    dir: &Path,
    meta_format: &dyn MetaFormat,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(dir, meta_format, SystemTimeProvider::new().now_ms())?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }

    Ok(())
}

/// Collects segment details as of `now_ms`.
pub fn inspect(
    dir: &Path,
    meta_format: &dyn MetaFormat,
    now_ms: u64,
) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let sidecars = MetadataStore::new(create_file_reader_writer(None));
    let segments = list_segments(dir)?;

    let infos: Vec<SegmentInfo> = segments
        .iter()
        .map(|segment| segment_info(segment, &sidecars, meta_format, now_ms))
        .collect::<Result<_, _>>()?;

    Ok(InspectResult {
        path: dir.display().to_string(),
        segment_count: infos.len(),
        total_size: infos.iter().map(|s| s.size).sum(),
        segments: infos,
    })
}

fn segment_info(
    segment: &Segment,
    sidecars: &MetadataStore,
    meta_format: &dyn MetaFormat,
    now_ms: u64,
) -> Result<SegmentInfo, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(segment.path())?;
    let sidecar = sidecars.read(&segment.metadata_path()).ok().flatten();

    Ok(SegmentInfo {
        name: segment.name(),
        size: bytes.len() as u64,
        age_ms: segment.age_ms(now_ms),
        item_count: sidecar.as_ref().map(|m| m.item_count),
        has_producer_metadata: sidecar.is_some_and(|m| m.producer.is_some()),
        records: decode_batch(&bytes, meta_format).events.len(),
    })
}

fn print_text_output(result: &InspectResult) {
    println!("batchlog Directory Inspection");
    println!("=============================");
    println!();
    println!("Path:       {}", result.path);
    println!("Segments:   {}", result.segment_count);
    println!("Total size: {}", format_size(result.total_size));

    if result.segments.is_empty() {
        return;
    }

    println!();
    println!("{:<16} {:>10} {:>10} {:>8} {:>8}", "SEGMENT", "SIZE", "AGE (s)", "ITEMS", "RECORDS");
    for s in &result.segments {
        let items = s
            .item_count
            .map_or_else(|| "-".to_string(), |c| c.to_string());
        println!(
            "{:<16} {:>10} {:>10} {:>8} {:>8}",
            s.name,
            format_size(s.size),
            s.age_ms / 1000,
            items,
            s.records
        );
    }
}
