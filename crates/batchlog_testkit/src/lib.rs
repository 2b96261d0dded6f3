//! # batchlog Testkit
//!
//! Test utilities for batchlog.
//!
//! This crate provides:
//! - Store fixtures on a temporary directory with a fake clock
//! - Property-based test generators using proptest
//! - Helpers that damage segment files the way crashes and bad disks do
//! - Concurrent stress drivers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use batchlog_testkit::prelude::*;
//!
//! #[test]
//! fn events_come_back() {
//!     with_temp_store(|store| {
//!         store.write(RawBatchEvent::new(b"{}".to_vec()), None);
//!         store.age_past_recency();
//!         assert!(store.lock_and_read_next().is_some());
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod corruption;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::corruption::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use batchlog_codec::RawBatchEvent;
}

pub use corruption::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
