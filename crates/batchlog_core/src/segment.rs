//! Segment naming.
//!
//! A segment is a file directly under the store root whose name is the
//! decimal millisecond timestamp of its creation. Its sidecar lives next
//! to it as `<name>_metadata`. Any other file name is ignored.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// Suffix appended to a segment name to get its sidecar name.
pub const METADATA_SUFFIX: &str = "_metadata";

/// Parses a segment file name into its timestamp.
#[must_use]
pub fn parse_segment_name(name: &str) -> Option<u64> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

/// A segment file.
///
/// Segments order by timestamp, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    timestamp: u64,
    path: PathBuf,
}

impl Segment {
    /// The segment named `timestamp` under `root`.
    #[must_use]
    pub fn new(root: &Path, timestamp: u64) -> Self {
        Self {
            timestamp,
            path: root.join(timestamp.to_string()),
        }
    }

    /// Interprets `path` as a segment. Returns `None` if its file name is not
    /// a timestamp.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let timestamp = parse_segment_name(path.file_name()?.to_str()?)?;
        Some(Self {
            timestamp,
            path: path.to_path_buf(),
        })
    }

    /// Creation time in milliseconds since the Unix epoch.
    #[must_use]
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Path of the segment file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the segment, which is also the batch id.
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.timestamp.to_string(), |n| n.to_string_lossy().into_owned())
    }

    /// Path of the sidecar.
    #[must_use]
    pub fn metadata_path(&self) -> PathBuf {
        metadata_path_of(&self.path)
    }

    /// Milliseconds elapsed between creation and `now_ms`.
    #[must_use]
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.timestamp)
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.path.cmp(&other.path))
    }
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Sidecar path of any file: the same path with `_metadata` appended.
pub(crate) fn metadata_path_of(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(METADATA_SUFFIX);
    PathBuf::from(name)
}

/// Returns the name of the segment a sidecar name belongs to.
pub(crate) fn sidecar_owner(name: &str) -> Option<&str> {
    let owner = name.strip_suffix(METADATA_SUFFIX)?;
    parse_segment_name(owner).map(|_| owner)
}
