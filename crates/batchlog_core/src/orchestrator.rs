//! Segment lifecycle under a root directory.
//!
//! The orchestrator decides which segment a writer appends to and which
//! segment a reader consumes next. It never reads segment content: the
//! directory listing and the sidecars are its only state on disk.
//!
//! ## Recency
//!
//! A segment younger than the recency window belongs to the writer. The
//! writer stops reusing it after 95% of the window and readers only take it
//! after 105%, so the two never touch the same segment at the boundary.
//!
//! ## Cleanup
//!
//! At most once per cleanup interval (measured on the monotonic clock),
//! [`get_writable_file`](FileOrchestrator::get_writable_file) and
//! [`get_readable_file`](FileOrchestrator::get_readable_file):
//!
//! 1. delete segments older than the retention threshold
//! 2. delete sidecars whose segment is gone
//! 3. evict the oldest segments while their total size exceeds the budget

use crate::config::{duration_ms, PersistenceConfig};
use crate::metadata::{MetadataStore, SegmentMetadata};
use crate::observer::{BatchClosedInfo, BatchObserver, NoopObserver, RemovalReason};
use crate::segment::{sidecar_owner, Segment};
use crate::time::TimeProvider;
use batchlog_storage::{safe_fs, Diagnostic, DiagnosticSink};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Hands out segments to writers and readers.
///
/// Every method degrades to `None`, `false` or an empty list and reports a
/// [`Diagnostic`] instead of failing.
pub trait FileOrchestrator: Send + Sync {
    /// Returns the segment the next event should be appended to.
    fn get_writable_file(&self, force_new: bool) -> Option<Segment> {
        self.get_writable_file_for(force_new, 0)
    }

    /// Like [`get_writable_file`](Self::get_writable_file), but only reuses
    /// the latest segment if `incoming_bytes` more still fit in it. Returns
    /// `None` when `incoming_bytes` exceeds the segment size cap.
    fn get_writable_file_for(&self, force_new: bool, incoming_bytes: u64) -> Option<Segment>;

    /// Returns the oldest segment old enough to be read and not in `excluding`.
    fn get_readable_file(&self, excluding: &HashSet<Segment>) -> Option<Segment>;

    /// Every segment under the root, oldest first.
    fn get_all_files(&self) -> Vec<Segment>;

    /// Segments to send when flushing everything, recent ones included.
    fn get_flushable_files(&self) -> Vec<Segment> {
        self.get_all_files()
    }

    /// The root directory, created if needed.
    fn get_root_dir(&self) -> Option<PathBuf>;

    /// The sidecar path of `file`.
    fn get_metadata_file(&self, file: &Path) -> Option<PathBuf>;

    /// The segment last handed to a writer, if it still exists.
    fn current_writable_file(&self) -> Option<Segment>;

    /// Deletes `segment` and its sidecar. Returns true if the segment was removed.
    fn delete_segment(&self, segment: &Segment, reason: RemovalReason) -> bool;

    /// Decrements the pending segment counter and returns the new value.
    fn decrement_and_get_pending_files_count(&self) -> i64;
}

#[derive(Debug, Default)]
struct WritableState {
    current: Option<Segment>,
    item_count: u64,
    last_access_ms: u64,
}

/// Directory-backed [`FileOrchestrator`].
///
/// # Example
///
/// ```rust
/// use batchlog_core::{BatchFileOrchestrator, FileOrchestrator, MetadataStore, PersistenceConfig, SystemTimeProvider};
/// use batchlog_storage::{create_file_reader_writer, TracingSink};
/// use std::sync::Arc;
///
/// let dir = tempfile::tempdir().unwrap();
/// let orchestrator = BatchFileOrchestrator::new(
///     dir.path().join("batches"),
///     PersistenceConfig::default(),
///     MetadataStore::new(create_file_reader_writer(None)),
///     Arc::new(SystemTimeProvider::new()),
///     Arc::new(TracingSink),
/// );
///
/// let segment = orchestrator.get_writable_file(false).unwrap();
/// assert_eq!(orchestrator.get_writable_file(false), Some(segment));
/// ```
pub struct BatchFileOrchestrator {
    root: PathBuf,
    config: PersistenceConfig,
    metadata: MetadataStore,
    clock: Arc<dyn TimeProvider>,
    sink: Arc<dyn DiagnosticSink>,
    observer: Arc<dyn BatchObserver>,
    root_lock: Mutex<()>,
    last_cleanup: Mutex<Option<u64>>,
    writable: Mutex<WritableState>,
    pending: AtomicI64,
}

impl BatchFileOrchestrator {
    /// Creates an orchestrator for `root`. Nothing touches the disk until the
    /// first call.
    pub fn new(
        root: impl Into<PathBuf>,
        config: PersistenceConfig,
        metadata: MetadataStore,
        clock: Arc<dyn TimeProvider>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            metadata,
            clock,
            sink,
            observer: Arc::new(NoopObserver),
            root_lock: Mutex::new(()),
            last_cleanup: Mutex::new(None),
            writable: Mutex::new(WritableState::default()),
            pending: AtomicI64::new(0),
        }
    }

    /// Sets the lifecycle observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    fn ensure_root(&self) -> bool {
        if safe_fs::exists(&self.root) {
            if !safe_fs::is_dir(&self.root) {
                self.sink.report(Diagnostic::RootNotDirectory {
                    path: self.root.clone(),
                });
                false
            } else if !safe_fs::can_write(&self.root) {
                self.sink.report(Diagnostic::RootNotWritable {
                    path: self.root.clone(),
                });
                false
            } else {
                true
            }
        } else {
            let _guard = self.root_lock.lock();
            let created = safe_fs::exists(&self.root) || safe_fs::create_dir_all(&self.root);
            if !created {
                self.sink.report(Diagnostic::RootNotCreated {
                    path: self.root.clone(),
                });
            }
            created
        }
    }

    fn list_segments(&self) -> Vec<Segment> {
        let Some(entries) = safe_fs::list_dir(&self.root) else {
            return Vec::new();
        };
        let mut segments: Vec<Segment> = entries
            .iter()
            .filter_map(|path| Segment::from_path(path))
            .filter(|segment| safe_fs::is_file(segment.path()))
            .collect();
        segments.sort();
        segments
    }

    fn cleanup_if_due(&self) {
        let now = self.clock.monotonic_ms();
        {
            let mut last = self.last_cleanup.lock();
            if let Some(previous) = *last {
                if now.saturating_sub(previous) < duration_ms(self.config.cleanup_interval) {
                    return;
                }
            }
            *last = Some(now);
        }
        self.cleanup();
    }

    fn cleanup(&self) {
        let threshold = self
            .clock
            .now_ms()
            .saturating_sub(duration_ms(self.config.old_file_threshold));

        let mut remaining = Vec::new();
        for segment in self.list_segments() {
            if segment.timestamp() < threshold {
                self.delete_segment(&segment, RemovalReason::Obsolete);
            } else {
                remaining.push(segment);
            }
        }

        self.delete_orphan_sidecars();
        self.free_space_if_needed(remaining);
    }

    fn delete_orphan_sidecars(&self) {
        let Some(entries) = safe_fs::list_dir(&self.root) else {
            return;
        };
        for path in entries {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(owner) = sidecar_owner(name) else {
                continue;
            };
            if !safe_fs::exists(&path.with_file_name(owner)) {
                tracing::debug!(target: "batchlog", path = %path.display(), "deleting orphan sidecar");
                safe_fs::delete(&path);
            }
        }
    }

    fn free_space_if_needed(&self, segments: Vec<Segment>) {
        let sized: Vec<(Segment, u64)> = segments
            .into_iter()
            .map(|segment| {
                let size = safe_fs::len(segment.path());
                (segment, size)
            })
            .collect();
        let total: u64 = sized.iter().map(|(_, size)| size).sum();
        let budget = self.config.max_disk_space_bytes;
        if total <= budget {
            return;
        }

        let overage = total - budget;
        self.sink.report(Diagnostic::DiskFull {
            total,
            budget,
            overage,
        });

        let mut to_free = overage;
        for (segment, size) in &sized {
            if to_free == 0 {
                break;
            }
            if self.delete_segment(segment, RemovalReason::Purged) {
                to_free = to_free.saturating_sub(*size);
            }
        }
    }

    /// Item count of `latest` if it can take one more event of `incoming` bytes.
    fn reusable_item_count(&self, latest: &Segment, incoming: u64) -> Option<u64> {
        let now = self.clock.now_ms();
        let is_recent = latest.timestamp() >= now.saturating_sub(self.config.write_recency_ms());
        if !is_recent {
            return None;
        }

        let size = safe_fs::len(latest.path());
        let max = self.config.max_segment_bytes;
        if size >= max || size.saturating_add(incoming) > max {
            return None;
        }

        // Without a readable sidecar the count is unknown, so start a new segment.
        let count = self
            .metadata
            .read(&latest.metadata_path())
            .ok()
            .flatten()?
            .item_count;
        (count < self.config.max_items_per_segment).then_some(count)
    }

    fn persist_item_count(&self, segment: &Segment, count: u64) {
        let path = segment.metadata_path();
        if let Err(e) = self.metadata.update(&path, |m| m.item_count = count) {
            tracing::debug!(target: "batchlog", error = %e, "sidecar update failed");
            self.sink.report(Diagnostic::MetadataWriteFailed { path });
        }
    }

    fn create_segment(&self, state: &mut WritableState, latest: Option<&Segment>) -> Option<Segment> {
        let now = self.clock.now_ms();
        let timestamp = latest.map_or(now, |l| now.max(l.timestamp().saturating_add(1)));
        let segment = Segment::new(&self.root, timestamp);

        if !safe_fs::touch(segment.path()) {
            self.sink.report(Diagnostic::WriteFailed {
                path: segment.path().to_path_buf(),
                reason: "unable to create segment".to_string(),
            });
            return None;
        }

        let path = segment.metadata_path();
        let metadata = SegmentMetadata {
            item_count: 1,
            producer: None,
        };
        if let Err(e) = self.metadata.write(&path, &metadata) {
            tracing::debug!(target: "batchlog", error = %e, "sidecar write failed");
            self.sink.report(Diagnostic::MetadataWriteFailed { path });
        }

        if let Some(closed) = state.current.take() {
            self.observer.batch_closed(
                &closed,
                BatchClosedInfo {
                    last_access_ms: state.last_access_ms,
                    item_count: state.item_count,
                },
            );
        }
        state.current = Some(segment.clone());
        state.item_count = 1;
        state.last_access_ms = now;
        self.pending.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(target: "batchlog", segment = %segment, "created segment");
        Some(segment)
    }
}

impl FileOrchestrator for BatchFileOrchestrator {
    fn get_writable_file_for(&self, force_new: bool, incoming_bytes: u64) -> Option<Segment> {
        if incoming_bytes > self.config.max_segment_bytes {
            self.sink.report(Diagnostic::ItemTooLarge {
                size: incoming_bytes,
                max: self.config.max_segment_bytes,
            });
            return None;
        }
        if !self.ensure_root() {
            return None;
        }
        self.cleanup_if_due();

        let mut state = self.writable.lock();
        let segments = self.list_segments();
        let latest = segments.last();

        if !force_new {
            if let Some(latest) = latest {
                if let Some(count) = self.reusable_item_count(latest, incoming_bytes) {
                    let count = count + 1;
                    self.persist_item_count(latest, count);
                    if state.current.as_ref() != Some(latest) {
                        state.current = Some(latest.clone());
                    }
                    state.item_count = count;
                    state.last_access_ms = self.clock.now_ms();
                    return Some(latest.clone());
                }
            }
        }

        self.create_segment(&mut state, latest)
    }

    fn get_readable_file(&self, excluding: &HashSet<Segment>) -> Option<Segment> {
        if !self.ensure_root() {
            return None;
        }
        self.cleanup_if_due();

        let segments = self.list_segments();
        self.pending
            .store(i64::try_from(segments.len()).unwrap_or(i64::MAX), Ordering::SeqCst);

        let threshold = self
            .clock
            .now_ms()
            .saturating_sub(self.config.read_recency_ms());
        segments
            .into_iter()
            .find(|segment| !excluding.contains(segment) && segment.timestamp() < threshold)
    }

    fn get_all_files(&self) -> Vec<Segment> {
        if !self.ensure_root() {
            return Vec::new();
        }
        self.list_segments()
    }

    fn get_root_dir(&self) -> Option<PathBuf> {
        self.ensure_root().then(|| self.root.clone())
    }

    fn get_metadata_file(&self, file: &Path) -> Option<PathBuf> {
        if file.parent() != Some(self.root.as_path()) {
            self.sink.report(Diagnostic::SegmentOutsideRoot {
                path: file.to_path_buf(),
                root: self.root.clone(),
            });
        }

        match Segment::from_path(file) {
            Some(segment) => Some(segment.metadata_path()),
            None => {
                self.sink.report(Diagnostic::NotASegmentFile {
                    path: file.to_path_buf(),
                });
                None
            }
        }
    }

    fn current_writable_file(&self) -> Option<Segment> {
        self.writable
            .lock()
            .current
            .clone()
            .filter(|segment| safe_fs::is_file(segment.path()))
    }

    fn delete_segment(&self, segment: &Segment, reason: RemovalReason) -> bool {
        let deleted = safe_fs::delete(segment.path());
        if deleted {
            let pending = self.pending.fetch_sub(1, Ordering::SeqCst) - 1;
            tracing::debug!(target: "batchlog", segment = %segment, reason = reason.as_str(), "deleted segment");
            self.observer.batch_deleted(segment, reason, pending);
        } else if safe_fs::exists(segment.path()) {
            self.sink.report(Diagnostic::DeleteFailed {
                path: segment.path().to_path_buf(),
            });
        }

        let sidecar = segment.metadata_path();
        if safe_fs::exists(&sidecar) && !safe_fs::delete(&sidecar) {
            self.sink.report(Diagnostic::DeleteFailed { path: sidecar });
        }
        deleted
    }

    fn decrement_and_get_pending_files_count(&self) -> i64 {
        self.pending.fetch_sub(1, Ordering::SeqCst) - 1
    }
}

impl std::fmt::Debug for BatchFileOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchFileOrchestrator")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("pending", &self.pending.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FakeClock;
    use batchlog_storage::{create_file_reader_writer, RecordingSink};
    use std::fs;
    use std::time::Duration;
    use tempfile::{tempdir, TempDir};

    const START: u64 = 1_700_000_000_000;

    #[derive(Default)]
    struct RecordingObserver {
        closed: Mutex<Vec<(Segment, BatchClosedInfo)>>,
        deleted: Mutex<Vec<(Segment, RemovalReason)>>,
    }

    impl BatchObserver for RecordingObserver {
        fn batch_closed(&self, segment: &Segment, info: BatchClosedInfo) {
            self.closed.lock().push((segment.clone(), info));
        }

        fn batch_deleted(&self, segment: &Segment, reason: RemovalReason, _pending: i64) {
            self.deleted.lock().push((segment.clone(), reason));
        }
    }

    struct Fixture {
        dir: TempDir,
        clock: Arc<FakeClock>,
        sink: Arc<RecordingSink>,
        observer: Arc<RecordingObserver>,
        orchestrator: BatchFileOrchestrator,
    }

    impl Fixture {
        fn root(&self) -> PathBuf {
            self.dir.path().join("batches")
        }

        fn put_segment(&self, timestamp: u64, size: usize) -> Segment {
            let segment = Segment::new(&self.root(), timestamp);
            fs::create_dir_all(self.root()).unwrap();
            fs::write(segment.path(), vec![0u8; size]).unwrap();
            segment
        }
    }

    fn test_config() -> PersistenceConfig {
        PersistenceConfig::new()
            .recency_window(Duration::from_millis(1_000))
            .max_segment_bytes(1_024)
            .max_item_bytes(256)
            .max_items_per_segment(32)
            .old_file_threshold(Duration::from_secs(3_600))
            .max_disk_space_bytes(1024 * 1024)
            .cleanup_interval(Duration::ZERO)
    }

    fn fixture(config: PersistenceConfig) -> Fixture {
        let dir = tempdir().unwrap();
        let clock = Arc::new(FakeClock::new(START));
        let sink = Arc::new(RecordingSink::new());
        let observer = Arc::new(RecordingObserver::default());
        let orchestrator = BatchFileOrchestrator::new(
            dir.path().join("batches"),
            config,
            MetadataStore::new(create_file_reader_writer(None)),
            clock.clone(),
            sink.clone(),
        )
        .with_observer(observer.clone());
        Fixture {
            dir,
            clock,
            sink,
            observer,
            orchestrator,
        }
    }

    #[test]
    fn root_is_created_lazily() {
        let f = fixture(test_config());
        assert!(!f.root().exists());

        assert_eq!(f.orchestrator.get_root_dir(), Some(f.root()));
        assert!(f.root().is_dir());
    }

    #[test]
    fn root_creation_is_safe_under_concurrency() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("a").join("b").join("c");
        let orchestrator = Arc::new(BatchFileOrchestrator::new(
            root.clone(),
            test_config(),
            MetadataStore::new(create_file_reader_writer(None)),
            Arc::new(FakeClock::new(START)),
            Arc::new(RecordingSink::new()),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let o = Arc::clone(&orchestrator);
                std::thread::spawn(move || o.get_root_dir())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(root.clone()));
        }
    }

    #[test]
    fn root_that_is_a_file_is_rejected() {
        let f = fixture(test_config());
        fs::write(f.root(), b"not a dir").unwrap();

        assert!(f.orchestrator.get_writable_file(false).is_none());
        assert!(f.orchestrator.get_readable_file(&HashSet::new()).is_none());
        assert!(f.orchestrator.get_all_files().is_empty());
        assert!(f
            .sink
            .any(|d| matches!(d, Diagnostic::RootNotDirectory { path } if path == &f.root())));
    }

    #[test]
    fn uncreatable_root_is_reported() {
        let f = fixture(test_config());
        let blocker = f.dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let orchestrator = BatchFileOrchestrator::new(
            blocker.join("batches"),
            test_config(),
            MetadataStore::new(create_file_reader_writer(None)),
            f.clock.clone(),
            f.sink.clone(),
        );

        assert!(orchestrator.get_writable_file(false).is_none());
        assert!(f.sink.any(|d| matches!(d, Diagnostic::RootNotCreated { .. })));
    }

    #[test]
    fn first_writable_file_is_named_by_now() {
        let f = fixture(test_config());

        let segment = f.orchestrator.get_writable_file(false).unwrap();

        assert_eq!(segment.timestamp(), START);
        assert!(segment.path().is_file());
        let metadata = MetadataStore::new(create_file_reader_writer(None))
            .read(&segment.metadata_path())
            .unwrap()
            .unwrap();
        assert_eq!(metadata.item_count, 1);
    }

    #[test]
    fn reuses_segment_until_item_cap() {
        let f = fixture(test_config());

        let first = f.orchestrator.get_writable_file(false).unwrap();
        for _ in 1..32 {
            assert_eq!(f.orchestrator.get_writable_file(false).unwrap(), first);
        }

        let next = f.orchestrator.get_writable_file(false).unwrap();
        assert!(next.timestamp() > first.timestamp());

        let closed = f.observer.closed.lock();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].0, first);
        assert_eq!(closed[0].1.item_count, 32);
    }

    #[test]
    fn rotates_when_size_cap_reached() {
        let f = fixture(test_config());

        let first = f.orchestrator.get_writable_file(false).unwrap();
        fs::write(first.path(), vec![0u8; 1_024]).unwrap();

        let next = f.orchestrator.get_writable_file(false).unwrap();
        assert_ne!(next, first);
    }

    #[test]
    fn rotates_when_incoming_would_overflow() {
        let f = fixture(test_config());

        let first = f.orchestrator.get_writable_file(false).unwrap();
        fs::write(first.path(), vec![0u8; 1_000]).unwrap();

        assert_eq!(f.orchestrator.get_writable_file_for(false, 24), Some(first.clone()));
        assert_ne!(f.orchestrator.get_writable_file_for(false, 25), Some(first));
    }

    #[test]
    fn record_larger_than_any_segment_gets_none() {
        let f = fixture(test_config());
        let first = f.orchestrator.get_writable_file(false).unwrap();

        assert_eq!(f.orchestrator.get_writable_file_for(false, 1_025), None);
        assert_eq!(f.orchestrator.get_writable_file_for(true, 1_025), None);
        assert!(f
            .sink
            .any(|d| *d == Diagnostic::ItemTooLarge { size: 1_025, max: 1_024 }));
        assert_eq!(f.orchestrator.get_all_files(), vec![first.clone()]);
        assert_eq!(f.orchestrator.get_writable_file_for(false, 1_024), Some(first));
    }

    #[test]
    fn rotates_when_segment_is_too_old_to_write() {
        let f = fixture(test_config());

        let first = f.orchestrator.get_writable_file(false).unwrap();
        f.clock.advance_ms(900);
        assert_eq!(f.orchestrator.get_writable_file(false), Some(first.clone()));

        f.clock.advance_ms(100);
        let next = f.orchestrator.get_writable_file(false).unwrap();
        assert_eq!(next.timestamp(), START + 1_000);
    }

    #[test]
    fn force_new_names_strictly_increase() {
        let f = fixture(test_config());

        let a = f.orchestrator.get_writable_file(false).unwrap();
        let b = f.orchestrator.get_writable_file(true).unwrap();
        let c = f.orchestrator.get_writable_file(true).unwrap();

        assert_eq!(a.timestamp(), START);
        assert_eq!(b.timestamp(), START + 1);
        assert_eq!(c.timestamp(), START + 2);
        assert_eq!(f.orchestrator.current_writable_file(), Some(c));
    }

    #[test]
    fn segment_without_sidecar_is_not_reused() {
        let f = fixture(test_config());
        let stray = f.put_segment(START, 10);

        let segment = f.orchestrator.get_writable_file(false).unwrap();
        assert_ne!(segment, stray);
        assert_eq!(segment.timestamp(), START + 1);
    }

    #[test]
    fn readable_only_after_recency_window() {
        let f = fixture(test_config());
        f.put_segment(START - 500, 10);
        assert!(f.orchestrator.get_readable_file(&HashSet::new()).is_none());

        let old = f.put_segment(START - 2_000, 10);
        assert_eq!(f.orchestrator.get_readable_file(&HashSet::new()), Some(old));
    }

    #[test]
    fn readable_skips_excluded_and_returns_oldest() {
        let f = fixture(test_config());
        let a = f.put_segment(START - 5_000, 10);
        let b = f.put_segment(START - 4_000, 10);

        assert_eq!(f.orchestrator.get_readable_file(&HashSet::new()), Some(a.clone()));

        let excluding: HashSet<_> = [a].into_iter().collect();
        assert_eq!(f.orchestrator.get_readable_file(&excluding), Some(b));
    }

    #[test]
    fn non_segment_files_are_ignored() {
        let f = fixture(test_config());
        let segment = f.put_segment(START - 5_000, 10);
        fs::write(f.root().join("notes.txt"), b"x").unwrap();
        fs::create_dir(f.root().join("123")).unwrap();

        assert_eq!(f.orchestrator.get_all_files(), vec![segment.clone()]);
        assert_eq!(f.orchestrator.get_flushable_files(), vec![segment]);
    }

    #[test]
    fn obsolete_segments_are_deleted() {
        let f = fixture(test_config());
        let old = f.put_segment(START - 3_700_000, 10);
        fs::write(old.metadata_path(), b"{}").unwrap();
        let kept = f.put_segment(START - 10_000, 10);

        assert_eq!(f.orchestrator.get_readable_file(&HashSet::new()), Some(kept));
        assert!(!old.path().exists());
        assert!(!old.metadata_path().exists());
        assert_eq!(
            f.observer.deleted.lock().as_slice(),
            &[(old, RemovalReason::Obsolete)]
        );
    }

    #[test]
    fn orphan_sidecars_are_deleted() {
        let f = fixture(test_config());
        fs::create_dir_all(f.root()).unwrap();
        let orphan = f.root().join("42_metadata");
        fs::write(&orphan, b"{}").unwrap();

        f.orchestrator.get_readable_file(&HashSet::new());

        assert!(!orphan.exists());
    }

    #[test]
    fn disk_budget_evicts_oldest_first() {
        let f = fixture(test_config().max_disk_space_bytes(250));
        let segments: Vec<_> = (0..4)
            .map(|i| f.put_segment(START - 10_000 + i * 1_000, 100))
            .collect();

        f.orchestrator.get_readable_file(&HashSet::new());

        assert!(!segments[0].path().exists());
        assert!(!segments[1].path().exists());
        assert!(segments[2].path().exists());
        assert!(segments[3].path().exists());
        assert!(f.sink.any(|d| *d
            == Diagnostic::DiskFull {
                total: 400,
                budget: 250,
                overage: 150
            }));
        let reasons: Vec<_> = f.observer.deleted.lock().iter().map(|(_, r)| *r).collect();
        assert_eq!(reasons, vec![RemovalReason::Purged, RemovalReason::Purged]);
    }

    #[test]
    fn cleanup_is_throttled() {
        let f = fixture(test_config().cleanup_interval(Duration::from_secs(1)));
        f.orchestrator.get_readable_file(&HashSet::new());

        let old = f.put_segment(START - 3_700_000, 10);
        f.orchestrator.get_readable_file(&HashSet::new());
        assert!(old.path().exists());

        f.clock.advance_ms(1_000);
        f.orchestrator.get_readable_file(&HashSet::new());
        assert!(!old.path().exists());
    }

    #[test]
    fn cleanup_gate_ignores_wall_clock_jumps() {
        let f = fixture(test_config().cleanup_interval(Duration::from_secs(1)));
        f.orchestrator.get_readable_file(&HashSet::new());

        let old = f.put_segment(START - 3_700_000, 10);
        f.clock.set_now_ms(START + 10_000_000);
        f.orchestrator.get_readable_file(&HashSet::new());
        assert!(old.path().exists());
    }

    #[test]
    fn metadata_file_checks() {
        let f = fixture(test_config());
        let inside = f.root().join("123");
        assert_eq!(
            f.orchestrator.get_metadata_file(&inside),
            Some(f.root().join("123_metadata"))
        );
        assert!(f.sink.is_empty());

        let outside = f.dir.path().join("456");
        assert_eq!(
            f.orchestrator.get_metadata_file(&outside),
            Some(f.dir.path().join("456_metadata"))
        );
        assert!(f.sink.any(|d| matches!(d, Diagnostic::SegmentOutsideRoot { .. })));

        assert!(f
            .orchestrator
            .get_metadata_file(&f.root().join("file.txt"))
            .is_none());
        assert!(f.sink.any(|d| matches!(d, Diagnostic::NotASegmentFile { .. })));
    }

    #[test]
    fn pending_count_follows_scans_and_creations() {
        let f = fixture(test_config());
        f.put_segment(START - 5_000, 10);
        f.put_segment(START - 4_000, 10);

        f.orchestrator.get_readable_file(&HashSet::new());
        f.orchestrator.get_writable_file(false);

        assert_eq!(f.orchestrator.decrement_and_get_pending_files_count(), 2);
    }

    #[test]
    fn delete_segment_removes_sidecar_and_notifies() {
        let f = fixture(test_config());
        let segment = f.orchestrator.get_writable_file(false).unwrap();

        assert!(f.orchestrator.delete_segment(&segment, RemovalReason::Flushed));
        assert!(!segment.path().exists());
        assert!(!segment.metadata_path().exists());
        assert!(!f.orchestrator.delete_segment(&segment, RemovalReason::Flushed));
        assert_eq!(f.observer.deleted.lock().len(), 1);
        assert!(f.orchestrator.current_writable_file().is_none());
    }
}
