//! Event persistence.

use crate::metadata::MetadataStore;
use crate::orchestrator::FileOrchestrator;
use batchlog_codec::{encode_event, MetaFormat, RawBatchEvent};
use batchlog_storage::{BatchFileReaderWriter, Diagnostic, DiagnosticSink};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What happened to an event handed to [`BatchWriter::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The event is on disk.
    Written {
        /// The event.
        event: RawBatchEvent,
        /// The framed record, before encryption.
        raw: Vec<u8>,
    },
    /// The event was not persisted.
    Failed {
        /// The event.
        event: RawBatchEvent,
    },
}

impl WriteOutcome {
    /// Returns true for [`WriteOutcome::Written`].
    #[must_use]
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    /// The event, whatever the outcome.
    #[must_use]
    pub fn event(&self) -> &RawBatchEvent {
        match self {
            Self::Written { event, .. } | Self::Failed { event } => event,
        }
    }
}

/// Appends events to the writable segment.
///
/// Writes are serialized: one event is framed, appended and accounted for
/// before the next one starts.
pub struct BatchWriter {
    orchestrator: Arc<dyn FileOrchestrator>,
    writer: Arc<dyn BatchFileReaderWriter>,
    metadata: MetadataStore,
    meta_format: Arc<dyn MetaFormat>,
    sink: Arc<dyn DiagnosticSink>,
    max_item_bytes: u64,
    force_new: AtomicBool,
    lock: Mutex<()>,
}

impl BatchWriter {
    /// Creates a writer appending through `writer` to segments of `orchestrator`.
    pub fn new(
        orchestrator: Arc<dyn FileOrchestrator>,
        writer: Arc<dyn BatchFileReaderWriter>,
        metadata: MetadataStore,
        meta_format: Arc<dyn MetaFormat>,
        sink: Arc<dyn DiagnosticSink>,
        max_item_bytes: u64,
    ) -> Self {
        Self {
            orchestrator,
            writer,
            metadata,
            meta_format,
            sink,
            max_item_bytes,
            force_new: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    /// Persists `event`, storing `batch_metadata` in the segment sidecar when given.
    ///
    /// An empty event is accepted without touching any file. An event whose
    /// data exceeds the item cap is rejected.
    pub fn write(&self, event: RawBatchEvent, batch_metadata: Option<&[u8]>) -> WriteOutcome {
        if event.is_empty() {
            return WriteOutcome::Written {
                event,
                raw: Vec::new(),
            };
        }

        let size = event.data.len() as u64;
        if size > self.max_item_bytes {
            self.sink.report(Diagnostic::ItemTooLarge {
                size,
                max: self.max_item_bytes,
            });
            return WriteOutcome::Failed { event };
        }

        let raw = match encode_event(&event, self.meta_format.as_ref()) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!(target: "batchlog", error = %e, "unable to frame event");
                return WriteOutcome::Failed { event };
            }
        };

        let on_disk = match self.writer.encoded_len(&event) {
            Ok(len) => len,
            Err(e) => {
                let root = self.orchestrator.get_root_dir().unwrap_or_default();
                self.sink.report(Diagnostic::write_failed(&root, &e));
                return WriteOutcome::Failed { event };
            }
        };

        let _guard = self.lock.lock();
        let force_new = self.force_new.swap(false, Ordering::SeqCst);
        let Some(segment) = self.orchestrator.get_writable_file_for(force_new, on_disk) else {
            return WriteOutcome::Failed { event };
        };

        if let Err(e) = self.writer.write_data(segment.path(), &event, true) {
            self.sink.report(Diagnostic::write_failed(segment.path(), &e));
            return WriteOutcome::Failed { event };
        }

        if let Some(producer) = batch_metadata {
            let path = segment.metadata_path();
            if let Err(e) = self
                .metadata
                .update(&path, |m| m.producer = Some(producer.to_vec()))
            {
                tracing::debug!(target: "batchlog", error = %e, "sidecar update failed");
                self.sink.report(Diagnostic::MetadataWriteFailed { path });
            }
        }

        WriteOutcome::Written { event, raw }
    }

    /// Like [`write`](Self::write), passing the outcome to `handler`.
    pub fn write_with<F>(&self, event: RawBatchEvent, batch_metadata: Option<&[u8]>, handler: F)
    where
        F: FnOnce(WriteOutcome),
    {
        handler(self.write(event, batch_metadata));
    }

    /// Producer metadata stored for the current writable segment.
    #[must_use]
    pub fn current_metadata(&self) -> Option<Vec<u8>> {
        let segment = self.orchestrator.current_writable_file()?;
        self.metadata
            .read(&segment.metadata_path())
            .ok()
            .flatten()?
            .producer
    }

    /// Makes the next write start a new segment.
    pub fn force_new_batch(&self) {
        self.force_new.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for BatchWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("max_item_bytes", &self.max_item_bytes)
            .finish_non_exhaustive()
    }
}
