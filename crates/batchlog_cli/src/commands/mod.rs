//! CLI command implementations.

pub mod dump;
pub mod inspect;
pub mod verify;

use batchlog_codec::{JsonMetaFormat, MetaFormat, RawMetaFormat};
use batchlog_core::Segment;
use std::path::Path;

/// Resolves the `--meta` option.
pub fn meta_format(name: &str) -> Result<Box<dyn MetaFormat>, Box<dyn std::error::Error>> {
    match name {
        "raw" => Ok(Box::new(RawMetaFormat)),
        "json" => Ok(Box::new(JsonMetaFormat)),
        other => Err(format!("unknown meta format: {other} (expected raw or json)").into()),
    }
}

/// Segments directly under `dir`, oldest first.
pub fn list_segments(dir: &Path) -> Result<Vec<Segment>, Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("No batch directory found at {}", dir.display()).into());
    }

    let mut segments: Vec<Segment> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .filter_map(|path| Segment::from_path(&path))
        .collect();
    segments.sort();
    Ok(segments)
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
