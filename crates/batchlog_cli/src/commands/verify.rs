//! Verify command implementation.

use super::list_segments;
use batchlog_codec::{decode_batch, MetaFormat};
use std::path::Path;

/// Problems found in one segment.
#[derive(Debug)]
pub struct SegmentReport {
    /// Segment name.
    pub name: String,
    /// Records that decode cleanly.
    pub records: usize,
    /// Why decoding stopped early, if it did.
    pub stop: Option<String>,
    /// Records skipped because of a bad meta block.
    pub skipped: Vec<String>,
}

impl SegmentReport {
    fn is_ok(&self) -> bool {
        self.stop.is_none() && self.skipped.is_empty()
    }
}

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyResult {
    /// Number of segments checked.
    pub segments_checked: usize,
    /// Number of records that decode cleanly.
    pub valid_records: usize,
    /// Segments with problems.
    pub damaged: Vec<SegmentReport>,
}

impl VerifyResult {
    fn is_ok(&self) -> bool {
        self.damaged.is_empty()
    }
}

/// Runs the verify command.
pub fn run(dir: &Path, meta_format: &dyn MetaFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying batch directory at {}", dir.display());
    println!();

    let result = verify(dir, meta_format)?;

    println!("  Segments checked: {}", result.segments_checked);
    println!("  Valid records:    {}", result.valid_records);
    for report in &result.damaged {
        println!();
        println!("  Segment {} ({} readable records)", report.name, report.records);
        if let Some(stop) = &report.stop {
            println!("    - stopped: {stop}");
        }
        for skipped in &report.skipped {
            println!("    - skipped: {skipped}");
        }
    }

    println!();
    if result.is_ok() {
        println!("✓ Verification passed");
        Ok(())
    } else {
        println!("✗ Verification failed: {} damaged segment(s)", result.damaged.len());
        Err("Verification failed".into())
    }
}

/// Decodes every segment under `dir`.
pub fn verify(
    dir: &Path,
    meta_format: &dyn MetaFormat,
) -> Result<VerifyResult, Box<dyn std::error::Error>> {
    let mut result = VerifyResult::default();

    for segment in list_segments(dir)? {
        let bytes = std::fs::read(segment.path())?;
        let decoded = decode_batch(&bytes, meta_format);

        result.segments_checked += 1;
        result.valid_records += decoded.events.len();

        let report = SegmentReport {
            name: segment.name(),
            records: decoded.events.len(),
            stop: decoded.stop.as_ref().map(ToString::to_string),
            skipped: decoded
                .malformed
                .iter()
                .map(|m| format!("offset {}: {}", m.offset, m.reason))
                .collect(),
        };
        if !report.is_ok() {
            tracing::debug!(segment = %report.name, "damaged segment");
            result.damaged.push(report);
        }
    }

    Ok(result)
}
