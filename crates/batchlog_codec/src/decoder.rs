//! Crash-tolerant record decoder.
//!
//! Decoding walks the bytes once, front to back, and never backtracks.
//!
//! ## Recovery Policy
//!
//! ### Stop and keep what was read
//!
//! - **Truncated header or payload**: the file ends inside a block.
//! - **Unexpected block type**: a block that is not the expected meta/data
//!   block. Nothing after it is trusted.
//!
//! ### Skip and continue
//!
//! - **Malformed meta**: the meta payload was rejected by the
//!   [`MetaFormat`]. The whole (meta, data) record is dropped and decoding
//!   resumes with the next record.
//!
//! Decoding never fails. The result carries the events plus a description
//! of any anomaly so callers can report it.

use crate::block::{BlockType, RawBatchEvent, BLOCK_HEADER_SIZE};
use crate::meta::MetaFormat;
use std::fmt;

/// Why decoding stopped before the end of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStop {
    /// The input ends inside a block header or payload.
    Truncated {
        /// Offset of the incomplete block.
        offset: usize,
        /// Bytes the block needed from `offset`.
        needed: usize,
        /// Bytes actually left from `offset`.
        available: usize,
    },
    /// A block carried a type other than the one expected at that position.
    UnexpectedBlockType {
        /// Offset of the offending block.
        offset: usize,
        /// The block type expected at this position.
        expected: BlockType,
        /// The raw type found in the header.
        found: u16,
    },
}

impl fmt::Display for DecodeStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated {
                offset,
                needed,
                available,
            } => write!(
                f,
                "truncated block at offset {offset}: needed {needed} bytes, {available} available"
            ),
            Self::UnexpectedBlockType {
                offset,
                expected,
                found,
            } => write!(
                f,
                "unexpected block type {found:#06x} at offset {offset}, expected {:#06x}",
                expected.as_u16()
            ),
        }
    }
}

/// A record dropped because its meta payload did not parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedMeta {
    /// Offset of the record's meta block.
    pub offset: usize,
    /// Parser message.
    pub reason: String,
}

/// Outcome of decoding a segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBatch {
    /// Events decoded, in append order.
    pub events: Vec<RawBatchEvent>,
    /// Set when decoding stopped before the end of the input.
    pub stop: Option<DecodeStop>,
    /// Records skipped because of a malformed meta payload.
    pub malformed: Vec<MalformedMeta>,
}

impl DecodedBatch {
    /// Returns true if the whole input was consumed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.stop.is_none()
    }

    /// Consumes the batch, keeping only the event data payloads.
    #[must_use]
    pub fn into_data(self) -> Vec<Vec<u8>> {
        self.events.into_iter().map(|e| e.data).collect()
    }
}

/// Forward-only cursor over the blocks of a segment.
#[derive(Debug, Clone)]
pub struct BlockCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BlockCursor<'a> {
    /// Create a cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset in the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns true once every byte was consumed.
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads the next block, which must be of type `expected`.
    ///
    /// The cursor only advances when a complete block of the right type was
    /// read.
    ///
    /// # Errors
    ///
    /// Returns the reason decoding has to stop at this block.
    pub fn read_block(&mut self, expected: BlockType) -> Result<&'a [u8], DecodeStop> {
        let offset = self.pos;
        let available = self.remaining();

        if available < BLOCK_HEADER_SIZE {
            return Err(DecodeStop::Truncated {
                offset,
                needed: BLOCK_HEADER_SIZE,
                available,
            });
        }

        let header = &self.data[offset..offset + BLOCK_HEADER_SIZE];
        let found = u16::from_be_bytes([header[0], header[1]]);
        if BlockType::from_u16(found) != Some(expected) {
            return Err(DecodeStop::UnexpectedBlockType {
                offset,
                expected,
                found,
            });
        }

        let len = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
        let needed = BLOCK_HEADER_SIZE.saturating_add(len);
        if available < needed {
            return Err(DecodeStop::Truncated {
                offset,
                needed,
                available,
            });
        }

        let start = offset + BLOCK_HEADER_SIZE;
        self.pos = start + len;
        Ok(&self.data[start..start + len])
    }
}

/// Decode every record in `bytes`.
///
/// This is a pure function of its input: decoding the same bytes twice
/// yields the same result.
pub fn decode_batch(bytes: &[u8], meta_format: &dyn MetaFormat) -> DecodedBatch {
    let mut cursor = BlockCursor::new(bytes);
    let mut batch = DecodedBatch::default();

    while !cursor.is_at_end() {
        let meta_offset = cursor.position();

        let meta = match cursor.read_block(BlockType::Meta) {
            Ok(payload) => payload,
            Err(stop) => {
                batch.stop = Some(stop);
                break;
            }
        };

        let data = match cursor.read_block(BlockType::Data) {
            Ok(payload) => payload,
            Err(stop) => {
                batch.stop = Some(stop);
                break;
            }
        };

        match meta_format.parse(meta) {
            Ok(metadata) => batch.events.push(RawBatchEvent {
                data: data.to_vec(),
                metadata,
            }),
            Err(e) => batch.malformed.push(MalformedMeta {
                offset: meta_offset,
                reason: e.to_string(),
            }),
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode_event, BatchEncoder};
    use crate::meta::{JsonMetaFormat, RawMetaFormat};
    use proptest::prelude::*;

    fn encode_all(events: &[RawBatchEvent]) -> Vec<u8> {
        let mut encoder = BatchEncoder::new(&RawMetaFormat);
        for event in events {
            encoder.encode(event).unwrap();
        }
        encoder.into_bytes()
    }

    fn raw_block(block_type: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&block_type.to_be_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn empty_input_decodes_to_nothing() {
        let decoded = decode_batch(&[], &RawMetaFormat);
        assert!(decoded.is_complete());
        assert!(decoded.events.is_empty());
        assert!(decoded.malformed.is_empty());
    }

    #[test]
    fn truncated_header_keeps_prefix() {
        let events = vec![
            RawBatchEvent::new(b"a".to_vec()),
            RawBatchEvent::new(b"b".to_vec()),
        ];
        let mut bytes = encode_all(&events);
        bytes.extend_from_slice(&[0x00, 0x01, 0x00]);

        let decoded = decode_batch(&bytes, &RawMetaFormat);
        assert_eq!(decoded.events, events);
        assert!(matches!(
            decoded.stop,
            Some(DecodeStop::Truncated {
                needed: BLOCK_HEADER_SIZE,
                available: 3,
                ..
            })
        ));
    }

    #[test]
    fn meta_without_data_is_truncation() {
        let mut bytes = encode_all(&[RawBatchEvent::new(b"kept".to_vec())]);
        bytes.extend(raw_block(1, b"orphan meta"));

        let decoded = decode_batch(&bytes, &RawMetaFormat);
        assert_eq!(decoded.events.len(), 1);
        assert!(matches!(decoded.stop, Some(DecodeStop::Truncated { .. })));
    }

    #[test]
    fn unknown_block_type_stops_decoding() {
        let mut bytes = encode_all(&[RawBatchEvent::new(b"first".to_vec())]);
        let bad_at = bytes.len();
        bytes.extend(raw_block(7, b"??"));
        bytes.extend(encode_all(&[RawBatchEvent::new(b"never".to_vec())]));

        let decoded = decode_batch(&bytes, &RawMetaFormat);
        assert_eq!(decoded.events, vec![RawBatchEvent::new(b"first".to_vec())]);
        assert_eq!(
            decoded.stop,
            Some(DecodeStop::UnexpectedBlockType {
                offset: bad_at,
                expected: BlockType::Meta,
                found: 7,
            })
        );
    }

    #[test]
    fn data_where_meta_expected_stops_decoding() {
        let mut bytes = raw_block(0, b"data first");
        bytes.extend(encode_all(&[RawBatchEvent::new(b"x".to_vec())]));

        let decoded = decode_batch(&bytes, &RawMetaFormat);
        assert!(decoded.events.is_empty());
        assert!(matches!(
            decoded.stop,
            Some(DecodeStop::UnexpectedBlockType { found: 0, .. })
        ));
    }

    #[test]
    fn malformed_meta_skips_only_that_record() {
        let good = |d: &[u8]| {
            encode_event(
                &RawBatchEvent::with_metadata(d.to_vec(), b"{\"ok\":true}".to_vec()),
                &JsonMetaFormat,
            )
            .unwrap()
        };

        let mut bytes = good(b"one");
        let bad_at = bytes.len();
        bytes.extend(raw_block(1, b"{broken"));
        bytes.extend(raw_block(0, b"lost"));
        bytes.extend(good(b"three"));

        let decoded = decode_batch(&bytes, &JsonMetaFormat);
        assert!(decoded.is_complete());
        assert_eq!(decoded.malformed.len(), 1);
        assert_eq!(decoded.malformed[0].offset, bad_at);
        assert_eq!(
            decoded.into_data(),
            vec![b"one".to_vec(), b"three".to_vec()]
        );
    }

    #[test]
    fn malformed_meta_is_reported_with_offset() {
        let mut bytes = raw_block(1, b"nope");
        bytes.extend(raw_block(0, b"lost"));

        let decoded = decode_batch(&bytes, &JsonMetaFormat);
        assert!(decoded.events.is_empty());
        assert_eq!(decoded.malformed.len(), 1);
        assert_eq!(decoded.malformed[0].offset, 0);
    }

    #[test]
    fn huge_declared_length_is_truncation() {
        let mut bytes = vec![0x00, 0x01, 0xFF, 0xFF, 0xFF, 0xFF];
        bytes.extend_from_slice(b"short");

        let decoded = decode_batch(&bytes, &RawMetaFormat);
        assert!(decoded.events.is_empty());
        assert!(matches!(decoded.stop, Some(DecodeStop::Truncated { offset: 0, .. })));
    }

    fn event_strategy() -> impl Strategy<Value = RawBatchEvent> {
        (
            prop::collection::vec(any::<u8>(), 0..256),
            prop::collection::vec(any::<u8>(), 0..32),
        )
            .prop_map(|(data, metadata)| RawBatchEvent { data, metadata })
    }

    proptest! {
        #[test]
        fn roundtrip(events in prop::collection::vec(event_strategy(), 0..20)) {
            let bytes = encode_all(&events);
            let decoded = decode_batch(&bytes, &RawMetaFormat);
            prop_assert!(decoded.is_complete());
            prop_assert_eq!(decoded.events, events);
        }

        #[test]
        fn decoding_is_idempotent(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
            let first = decode_batch(&bytes, &RawMetaFormat);
            let second = decode_batch(&bytes, &RawMetaFormat);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn truncated_tail_drops_only_last_record(
            events in prop::collection::vec(event_strategy(), 1..10),
            cut in 1usize..10_000,
        ) {
            let bytes = encode_all(&events);
            let last = encode_all(&events[events.len() - 1..]);
            let cut = 1 + cut % (last.len() - 1).max(1);
            prop_assume!(cut < last.len());

            let decoded = decode_batch(&bytes[..bytes.len() - cut], &RawMetaFormat);
            let truncated = matches!(decoded.stop, Some(DecodeStop::Truncated { .. }));
            prop_assert!(truncated);
            prop_assert_eq!(&decoded.events[..], &events[..events.len() - 1]);
        }

        #[test]
        fn arbitrary_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..1024)) {
            let decoded = decode_batch(&bytes, &JsonMetaFormat);
            prop_assert!(decoded.events.len() <= bytes.len() / (2 * BLOCK_HEADER_SIZE));
        }
    }
}
