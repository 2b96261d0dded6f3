//! # batchlog Storage
//!
//! File reader/writers for batchlog segments and their sidecars.
//!
//! This crate sits between the block codec and the segment orchestrator.
//! It turns events into framed bytes on disk and back, optionally through
//! an application-supplied [`Encryption`] provider, and reports every
//! recoverable anomaly to a [`DiagnosticSink`] instead of failing.
//!
//! ## Available Reader/Writers
//!
//! - [`PlainBatchFileReaderWriter`] - Framed events, no transformation
//! - [`EncryptedBatchFileReaderWriter`] - Encrypts event data around another reader/writer
//! - [`PlainFileReaderWriter`] / [`EncryptedFileReaderWriter`] - Whole-file bytes for sidecars
//!
//! Use [`create_batch_reader_writer`] and [`create_file_reader_writer`] to
//! pick the right one from an optional provider.
//!
//! ## Example
//!
//! ```rust
//! use batchlog_codec::{RawBatchEvent, RawMetaFormat};
//! use batchlog_storage::{create_batch_reader_writer, RecordingSink};
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("1700000000000");
//! let rw = create_batch_reader_writer(None, Arc::new(RawMetaFormat), Arc::new(RecordingSink::new()));
//!
//! rw.write_data(&path, &RawBatchEvent::new(b"hello".to_vec()), true).unwrap();
//! assert_eq!(rw.read_data(&path).unwrap()[0].data, b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod crypto;
pub mod diagnostics;
mod encrypted;
mod error;
mod file;
pub mod safe_fs;

pub use backend::{
    create_batch_reader_writer, create_file_reader_writer, BatchFileReaderWriter,
    FileReaderWriter,
};
pub use crypto::{AesGcmEncryption, EncryptionKey, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use diagnostics::{Diagnostic, DiagnosticSink, Level, RecordingSink, TracingSink};
pub use encrypted::{EncryptedBatchFileReaderWriter, EncryptedFileReaderWriter, Encryption};
pub use error::{StorageError, StorageResult};
pub use file::{PlainBatchFileReaderWriter, PlainFileReaderWriter};
