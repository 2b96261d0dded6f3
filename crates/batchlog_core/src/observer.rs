//! Batch lifecycle notifications.

use crate::segment::Segment;

/// Why a segment was deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalReason {
    /// Older than the retention threshold.
    Obsolete,
    /// Evicted to get back under the disk budget.
    Purged,
    /// Consumed and dropped by a reader.
    Flushed,
}

impl RemovalReason {
    /// Lowercase name, suitable for logs and metrics tags.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Obsolete => "obsolete",
            Self::Purged => "purged",
            Self::Flushed => "flushed",
        }
    }
}

/// Facts about a segment the writer moved away from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchClosedInfo {
    /// Last time an event was routed to the segment (ms since epoch).
    pub last_access_ms: u64,
    /// Events routed to the segment.
    pub item_count: u64,
}

/// Receives segment lifecycle events. Every method defaults to a no-op.
pub trait BatchObserver: Send + Sync {
    /// The writer stopped using `segment`.
    fn batch_closed(&self, segment: &Segment, info: BatchClosedInfo) {
        let _ = (segment, info);
    }

    /// `segment` was deleted; `pending` is the remaining pending count.
    fn batch_deleted(&self, segment: &Segment, reason: RemovalReason, pending: i64) {
        let _ = (segment, reason, pending);
    }
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}
