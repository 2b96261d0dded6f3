//! # batchlog Core
//!
//! Durable on-device batching of telemetry events.
//!
//! Producers append events to time-named segment files under a root
//! directory. Once a segment is older than the recency window, consumers
//! lock it, upload its content and drop it. Nothing here ever returns an
//! error to a producer or a consumer: failures degrade to "nothing written"
//! or "nothing to read" plus a [`Diagnostic`](batchlog_storage::Diagnostic).
//!
//! This crate provides:
//! - [`BatchFileOrchestrator`]: segment rotation, retention and disk budget
//! - [`BatchWriter`]: event persistence with size caps and sidecar metadata
//! - [`LockingBatchReader`]: exclusive batch hand-out to concurrent consumers
//! - [`BatchStore`]: all of the above wired from a [`StoreConfig`]
//!
//! ## Layout
//!
//! ```text
//! <root>/
//! ├─ 1700000000000            # segment, named by its creation time (ms)
//! ├─ 1700000000000_metadata   # sidecar: item count, producer metadata
//! └─ 1700000004711
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod metadata;
mod observer;
mod orchestrator;
mod reader;
mod segment;
mod store;
mod time;
mod writer;

pub use config::{PayloadDecoration, PersistenceConfig};
pub use error::{CoreError, CoreResult};
pub use metadata::{MetadataStore, SegmentMetadata};
pub use observer::{BatchClosedInfo, BatchObserver, NoopObserver, RemovalReason};
pub use orchestrator::{BatchFileOrchestrator, FileOrchestrator};
pub use reader::{Batch, LockingBatchReader};
pub use segment::{parse_segment_name, Segment, METADATA_SUFFIX};
pub use store::{BatchStore, StoreConfig};
pub use time::{FakeClock, SystemTimeProvider, TimeProvider};
pub use writer::{BatchWriter, WriteOutcome};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
