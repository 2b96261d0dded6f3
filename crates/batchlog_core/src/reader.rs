//! Exclusive batch consumption.

use crate::config::PayloadDecoration;
use crate::observer::RemovalReason;
use crate::orchestrator::FileOrchestrator;
use crate::segment::Segment;
use batchlog_storage::{BatchFileReaderWriter, Diagnostic, DiagnosticSink};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// A segment handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Segment name. Pass it back to `release` or `drop_batch`.
    pub id: String,
    /// Event payloads joined with the reader's [`PayloadDecoration`].
    pub data: Vec<u8>,
    /// Per-event metadata, in event order.
    pub metadata: Vec<Vec<u8>>,
}

impl Batch {
    /// Number of events in the batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    /// Returns true if the segment held no event.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

/// Hands each readable segment to one consumer at a time.
///
/// Locks are process-local and live in memory only. A locked segment stays
/// locked until it is released or dropped.
///
/// # Example
///
/// ```rust,ignore
/// while let Some(batch) = reader.lock_and_read_next() {
///     if upload(&batch.data) {
///         reader.drop_batch(&batch.id);
///     } else {
///         reader.release(&batch.id);
///     }
/// }
/// ```
pub struct LockingBatchReader {
    orchestrator: Arc<dyn FileOrchestrator>,
    reader: Arc<dyn BatchFileReaderWriter>,
    decoration: PayloadDecoration,
    sink: Arc<dyn DiagnosticSink>,
    locked: Mutex<HashSet<Segment>>,
}

impl LockingBatchReader {
    /// Creates a reader over the segments of `orchestrator`.
    pub fn new(
        orchestrator: Arc<dyn FileOrchestrator>,
        reader: Arc<dyn BatchFileReaderWriter>,
        decoration: PayloadDecoration,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            orchestrator,
            reader,
            decoration,
            sink,
            locked: Mutex::new(HashSet::new()),
        }
    }

    /// Locks the oldest readable segment and returns its content.
    ///
    /// A segment that cannot be read is reported, unlocked and skipped for
    /// the rest of this call.
    pub fn lock_and_read_next(&self) -> Option<Batch> {
        let mut unreadable: HashSet<Segment> = HashSet::new();
        loop {
            let segment = {
                let mut locked = self.locked.lock();
                let segment = if unreadable.is_empty() {
                    self.orchestrator.get_readable_file(&locked)?
                } else {
                    let excluding: HashSet<_> = locked.union(&unreadable).cloned().collect();
                    self.orchestrator.get_readable_file(&excluding)?
                };
                locked.insert(segment.clone());
                segment
            };

            match self.reader.read_data(segment.path()) {
                Ok(events) => {
                    let data = self
                        .decoration
                        .join(events.iter().map(|e| e.data.as_slice()));
                    let metadata = events.into_iter().map(|e| e.metadata).collect();
                    return Some(Batch {
                        id: segment.name(),
                        data,
                        metadata,
                    });
                }
                Err(e) => {
                    self.sink.report(Diagnostic::read_failed(segment.path(), &e));
                    self.locked.lock().remove(&segment);
                    unreadable.insert(segment);
                }
            }
        }
    }

    /// Unlocks `id` without deleting it.
    pub fn release(&self, id: &str) {
        let Some(segment) = self.segment_for(id) else {
            self.sink.report(Diagnostic::UnknownBatchId { id: id.to_string() });
            return;
        };
        if !self.locked.lock().remove(&segment) {
            self.sink.report(Diagnostic::BatchNotLocked { id: id.to_string() });
        }
    }

    /// Deletes `id` and its sidecar, locked or not.
    ///
    /// The lock set stays held until the file is gone, so no other consumer
    /// can claim the segment in between.
    pub fn drop_batch(&self, id: &str) {
        let Some(segment) = self.segment_for(id) else {
            self.sink.report(Diagnostic::UnknownBatchId { id: id.to_string() });
            return;
        };

        let mut locked = self.locked.lock();
        self.orchestrator
            .delete_segment(&segment, RemovalReason::Flushed);
        let was_locked = locked.remove(&segment);
        drop(locked);
        if !was_locked {
            self.sink.report(Diagnostic::BatchNotLocked { id: id.to_string() });
        }
    }

    /// Deletes every segment and forgets every lock.
    pub fn drop_all(&self) {
        let mut locked = self.locked.lock();
        for segment in self.orchestrator.get_all_files() {
            self.orchestrator
                .delete_segment(&segment, RemovalReason::Flushed);
        }
        locked.clear();
    }

    /// Ids currently locked.
    #[must_use]
    pub fn locked_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.locked.lock().iter().cloned().collect();
        ids.sort();
        ids.into_iter().map(|s| s.name()).collect()
    }

    fn segment_for(&self, id: &str) -> Option<Segment> {
        let root = self.orchestrator.get_root_dir()?;
        Segment::from_path(&root.join(id))
    }
}

impl std::fmt::Debug for LockingBatchReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockingBatchReader")
            .field("decoration", &self.decoration)
            .field("locked", &self.locked.lock().len())
            .finish_non_exhaustive()
    }
}
