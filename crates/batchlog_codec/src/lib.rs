//! # batchlog Codec
//!
//! Block framing for batchlog segment files.
//!
//! A segment file is a plain concatenation of records. Every record is one
//! meta block immediately followed by one data block:
//!
//! ```text
//! +-- 2 bytes --+---- 4 bytes ----+-- n bytes --+
//! | block type  | payload len (n) |   payload   |
//! +-------------+-----------------+-------------+
//! ```
//!
//! Both integers are big-endian. Block type `0x0000` is a data block and
//! `0x0001` a meta block.
//!
//! ## Decoding
//!
//! Segment files live on phones and get cut short by process death, so a
//! damaged tail is the normal case. [`decode_batch`] never fails: it returns
//! every record it could read before the first structural anomaly, together
//! with a description of where and why it stopped.
//!
//! ## Usage
//!
//! ```
//! use batchlog_codec::{decode_batch, encode_event, RawBatchEvent, RawMetaFormat};
//!
//! let event = RawBatchEvent::with_metadata(b"{\"msg\":\"hi\"}".to_vec(), b"ts=1".to_vec());
//! let bytes = encode_event(&event, &RawMetaFormat).unwrap();
//!
//! let decoded = decode_batch(&bytes, &RawMetaFormat);
//! assert!(decoded.is_complete());
//! assert_eq!(decoded.events, vec![event]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod block;
mod decoder;
mod encoder;
mod error;
mod meta;

pub use block::{BlockType, RawBatchEvent, BLOCK_HEADER_SIZE};
pub use decoder::{decode_batch, BlockCursor, DecodeStop, DecodedBatch, MalformedMeta};
pub use encoder::{encode_event, encoded_len, BatchEncoder};
pub use error::{CodecError, CodecResult};
pub use meta::{JsonMetaFormat, MetaFormat, RawMetaFormat};
