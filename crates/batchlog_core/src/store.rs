//! One-stop wiring of orchestrator, reader and writer.

use crate::config::{PayloadDecoration, PersistenceConfig};
use crate::error::CoreResult;
use crate::metadata::MetadataStore;
use crate::observer::{BatchObserver, NoopObserver};
use crate::orchestrator::{BatchFileOrchestrator, FileOrchestrator};
use crate::reader::{Batch, LockingBatchReader};
use crate::time::{SystemTimeProvider, TimeProvider};
use crate::writer::{BatchWriter, WriteOutcome};
use batchlog_codec::{MetaFormat, RawBatchEvent, RawMetaFormat};
use batchlog_storage::{
    create_batch_reader_writer, create_file_reader_writer, DiagnosticSink, Encryption, TracingSink,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything needed to open a [`BatchStore`].
#[derive(Clone)]
pub struct StoreConfig {
    /// Directory holding the segments.
    pub root: PathBuf,
    /// Orchestrator and writer knobs.
    pub persistence: PersistenceConfig,
    /// How batches are joined for consumers.
    pub decoration: PayloadDecoration,
    /// Optional payload encryption.
    pub encryption: Option<Arc<dyn Encryption>>,
    /// Meta block format.
    pub meta_format: Arc<dyn MetaFormat>,
    /// Diagnostic receiver.
    pub sink: Arc<dyn DiagnosticSink>,
    /// Lifecycle observer.
    pub observer: Arc<dyn BatchObserver>,
    /// Clock.
    pub clock: Arc<dyn TimeProvider>,
}

impl StoreConfig {
    /// Default configuration for `root`: no encryption, raw meta blocks,
    /// JSON array batches, diagnostics sent to `tracing`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            persistence: PersistenceConfig::default(),
            decoration: PayloadDecoration::json_array(),
            encryption: None,
            meta_format: Arc::new(RawMetaFormat),
            sink: Arc::new(TracingSink),
            observer: Arc::new(NoopObserver),
            clock: Arc::new(SystemTimeProvider::new()),
        }
    }

    /// Sets the persistence knobs.
    #[must_use]
    pub fn persistence(mut self, persistence: PersistenceConfig) -> Self {
        self.persistence = persistence;
        self
    }

    /// Sets the batch decoration.
    #[must_use]
    pub fn decoration(mut self, decoration: PayloadDecoration) -> Self {
        self.decoration = decoration;
        self
    }

    /// Enables payload encryption.
    #[must_use]
    pub fn encryption(mut self, encryption: Arc<dyn Encryption>) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Sets the meta block format.
    #[must_use]
    pub fn meta_format(mut self, meta_format: Arc<dyn MetaFormat>) -> Self {
        self.meta_format = meta_format;
        self
    }

    /// Sets the diagnostic sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the lifecycle observer.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Sets the clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn TimeProvider>) -> Self {
        self.clock = clock;
        self
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("root", &self.root)
            .field("persistence", &self.persistence)
            .field("decoration", &self.decoration)
            .field("encrypted", &self.encryption.is_some())
            .field("meta_format", &self.meta_format.name())
            .finish_non_exhaustive()
    }
}

/// A batch directory with its writer and reader.
///
/// # Example
///
/// ```rust
/// use batchlog_codec::RawBatchEvent;
/// use batchlog_core::{BatchStore, StoreConfig};
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = BatchStore::open(StoreConfig::new(dir.path().join("logs"))).unwrap();
///
/// assert!(store.write(RawBatchEvent::new(b"{\"msg\":\"hi\"}".to_vec()), None).is_written());
///
/// // The segment stays with the writer until the recency window has passed.
/// assert!(store.lock_and_read_next().is_none());
/// ```
pub struct BatchStore {
    root: PathBuf,
    orchestrator: Arc<BatchFileOrchestrator>,
    reader: LockingBatchReader,
    writer: BatchWriter,
}

impl BatchStore {
    /// Opens the store described by `config`.
    ///
    /// The root directory is created lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence configuration is invalid.
    pub fn open(config: StoreConfig) -> CoreResult<Self> {
        config.persistence.validate()?;

        let files = create_file_reader_writer(config.encryption.clone());
        let batches = create_batch_reader_writer(
            config.encryption.clone(),
            Arc::clone(&config.meta_format),
            Arc::clone(&config.sink),
        );
        let metadata = MetadataStore::new(files);
        let max_item_bytes = config.persistence.max_item_bytes;

        let orchestrator = Arc::new(
            BatchFileOrchestrator::new(
                config.root.clone(),
                config.persistence,
                metadata.clone(),
                config.clock,
                Arc::clone(&config.sink),
            )
            .with_observer(config.observer),
        );
        let shared: Arc<dyn FileOrchestrator> = orchestrator.clone();

        let reader = LockingBatchReader::new(
            Arc::clone(&shared),
            Arc::clone(&batches),
            config.decoration,
            Arc::clone(&config.sink),
        );
        let writer = BatchWriter::new(
            shared,
            batches,
            metadata,
            config.meta_format,
            config.sink,
            max_item_bytes,
        );

        tracing::debug!(target: "batchlog", root = %config.root.display(), "opened batch store");
        Ok(Self {
            root: config.root,
            orchestrator,
            reader,
            writer,
        })
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persists one event. See [`BatchWriter::write`].
    pub fn write(&self, event: RawBatchEvent, batch_metadata: Option<&[u8]>) -> WriteOutcome {
        self.writer.write(event, batch_metadata)
    }

    /// Producer metadata of the current segment.
    #[must_use]
    pub fn current_metadata(&self) -> Option<Vec<u8>> {
        self.writer.current_metadata()
    }

    /// Closes the current segment; the next write starts a new one.
    pub fn force_new_batch(&self) {
        self.writer.force_new_batch();
    }

    /// Locks and returns the oldest readable batch.
    pub fn lock_and_read_next(&self) -> Option<Batch> {
        self.reader.lock_and_read_next()
    }

    /// Unlocks a batch for a later retry.
    pub fn release(&self, id: &str) {
        self.reader.release(id);
    }

    /// Deletes a consumed batch.
    pub fn drop_batch(&self, id: &str) {
        self.reader.drop_batch(id);
    }

    /// Deletes every batch.
    pub fn drop_all(&self) {
        self.reader.drop_all();
    }

    /// The orchestrator, for callers that walk segments themselves.
    #[must_use]
    pub fn orchestrator(&self) -> &BatchFileOrchestrator {
        &self.orchestrator
    }

    /// The writer.
    #[must_use]
    pub fn writer(&self) -> &BatchWriter {
        &self.writer
    }

    /// The reader.
    #[must_use]
    pub fn reader(&self) -> &LockingBatchReader {
        &self.reader
    }
}

impl std::fmt::Debug for BatchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
