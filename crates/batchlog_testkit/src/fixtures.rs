//! Test fixtures and store helpers.
//!
//! Provides a [`TestStore`] on a temporary directory, driven by a
//! [`FakeClock`] and recording every diagnostic and lifecycle event.

use batchlog_core::{
    BatchClosedInfo, BatchObserver, BatchStore, FakeClock, PayloadDecoration, PersistenceConfig,
    RemovalReason, Segment, StoreConfig,
};
use batchlog_storage::{AesGcmEncryption, EncryptionKey, RecordingSink};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Wall clock start of every fixture (2023-11-14T22:13:20Z).
pub const START_MS: u64 = 1_700_000_000_000;

/// Recency window of [`fast_config`].
pub const RECENCY_MS: u64 = 1_000;

/// Persistence settings small enough to exercise rotation in a few writes.
#[must_use]
pub fn fast_config() -> PersistenceConfig {
    PersistenceConfig::new()
        .recency_window(Duration::from_millis(RECENCY_MS))
        .max_items_per_segment(32)
        .max_item_bytes(1024)
        .max_segment_bytes(16 * 1024)
        .cleanup_interval(Duration::ZERO)
}

/// A lifecycle event seen by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The writer moved off a segment.
    Closed {
        /// Segment name.
        segment: String,
        /// Events routed to it.
        item_count: u64,
    },
    /// A segment was deleted.
    Deleted {
        /// Segment name.
        segment: String,
        /// Why it went away.
        reason: RemovalReason,
    },
}

/// Observer keeping every lifecycle event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingObserver {
    /// Creates an empty observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events seen so far.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }

    /// Names of segments deleted for `reason`.
    #[must_use]
    pub fn deleted(&self, reason: RemovalReason) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                LifecycleEvent::Deleted { segment, reason: r } if *r == reason => {
                    Some(segment.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl BatchObserver for RecordingObserver {
    fn batch_closed(&self, segment: &Segment, info: BatchClosedInfo) {
        self.events.lock().push(LifecycleEvent::Closed {
            segment: segment.name(),
            item_count: info.item_count,
        });
    }

    fn batch_deleted(&self, segment: &Segment, reason: RemovalReason, _pending: i64) {
        self.events.lock().push(LifecycleEvent::Deleted {
            segment: segment.name(),
            reason,
        });
    }
}

/// A store on a temporary directory with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: BatchStore,
    /// Clock driving the store.
    pub clock: Arc<FakeClock>,
    /// Every diagnostic the store reported.
    pub sink: Arc<RecordingSink>,
    /// Every lifecycle event the store emitted.
    pub observer: Arc<RecordingObserver>,
    _temp_dir: TempDir,
}

impl TestStore {
    /// Creates a store with [`fast_config`] and newline-separated batches.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(fast_config())
    }

    /// Creates a store with the given persistence settings.
    #[must_use]
    pub fn with_config(persistence: PersistenceConfig) -> Self {
        Self::build(persistence, |config| config)
    }

    /// Creates a store encrypting payloads with a fresh AES-GCM key.
    #[must_use]
    pub fn encrypted() -> Self {
        let key = EncryptionKey::generate();
        Self::build(fast_config(), |config| {
            config.encryption(Arc::new(AesGcmEncryption::new(&key)))
        })
    }

    /// Creates a store after letting `customize` adjust its configuration.
    pub fn build(
        persistence: PersistenceConfig,
        customize: impl FnOnce(StoreConfig) -> StoreConfig,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let clock = Arc::new(FakeClock::new(START_MS));
        let sink = Arc::new(RecordingSink::new());
        let observer = Arc::new(RecordingObserver::new());

        let config = StoreConfig::new(temp_dir.path().join("batches"))
            .persistence(persistence)
            .decoration(PayloadDecoration::newline_separated())
            .clock(clock.clone())
            .sink(sink.clone())
            .observer(observer.clone());
        let store = BatchStore::open(customize(config)).expect("Failed to open store");

        Self {
            store,
            clock,
            sink,
            observer,
            _temp_dir: temp_dir,
        }
    }

    /// The store root directory.
    #[must_use]
    pub fn root(&self) -> PathBuf {
        self.store.root().to_path_buf()
    }

    /// Moves the clock past the reader recency window.
    pub fn age_past_recency(&self) {
        self.clock.advance_ms(RECENCY_MS * 2);
    }

    /// Path of the segment named `id`.
    #[must_use]
    pub fn segment_path(&self, id: &str) -> PathBuf {
        self.store.root().join(id)
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = BatchStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary store.
///
/// # Example
///
/// ```rust
/// use batchlog_codec::RawBatchEvent;
/// use batchlog_testkit::with_temp_store;
///
/// with_temp_store(|store| {
///     store.write(RawBatchEvent::new(b"a".to_vec()), None);
///     store.age_past_recency();
///     assert_eq!(store.lock_and_read_next().unwrap().data, b"a".to_vec());
/// });
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&TestStore) -> R,
{
    let store = TestStore::new();
    f(&store)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use batchlog_codec::RawBatchEvent;

    /// Creates a store holding `segments` readable segments of `per_segment`
    /// events each. Event `i` of segment `s` has data `s-i`.
    pub fn populated_store(segments: usize, per_segment: usize) -> TestStore {
        let store = TestStore::new();
        for s in 0..segments {
            store.force_new_batch();
            for i in 0..per_segment {
                let outcome = store.write(RawBatchEvent::new(format!("{s}-{i}").into_bytes()), None);
                assert!(outcome.is_written(), "Failed to write event");
            }
            store.clock.advance_ms(1);
        }
        store.age_past_recency();
        store
    }
}
