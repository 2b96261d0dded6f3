//! Record encoder.

use crate::block::{BlockType, RawBatchEvent, BLOCK_HEADER_SIZE};
use crate::error::{CodecError, CodecResult};
use crate::meta::MetaFormat;
use bytes::BufMut;

/// Encode one event as a (meta, data) record.
///
/// # Errors
///
/// Returns an error if the meta format rejects the metadata or a payload
/// is larger than `u32::MAX` bytes.
pub fn encode_event(event: &RawBatchEvent, meta_format: &dyn MetaFormat) -> CodecResult<Vec<u8>> {
    let mut encoder = BatchEncoder::new(meta_format);
    encoder.encode(event)?;
    Ok(encoder.into_bytes())
}

/// Number of bytes a record with the given payload sizes occupies on disk.
#[must_use]
pub const fn encoded_len(meta_len: usize, data_len: usize) -> usize {
    2 * BLOCK_HEADER_SIZE + meta_len + data_len
}

/// Appends records to an in-memory buffer.
///
/// The buffer holds whole records only, so it can be written to the end of
/// a segment with a single append.
pub struct BatchEncoder<'a> {
    meta_format: &'a dyn MetaFormat,
    buffer: Vec<u8>,
}

impl<'a> BatchEncoder<'a> {
    /// Create a new encoder.
    pub fn new(meta_format: &'a dyn MetaFormat) -> Self {
        Self {
            meta_format,
            buffer: Vec::new(),
        }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(meta_format: &'a dyn MetaFormat, capacity: usize) -> Self {
        Self {
            meta_format,
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encode one event.
    ///
    /// On error the buffer is left as it was before the call.
    pub fn encode(&mut self, event: &RawBatchEvent) -> CodecResult<()> {
        let meta = self.meta_format.serialize(&event.metadata)?;
        check_len(meta.len())?;
        check_len(event.data.len())?;

        self.buffer.reserve(encoded_len(meta.len(), event.data.len()));
        put_block(&mut self.buffer, BlockType::Meta, &meta);
        put_block(&mut self.buffer, BlockType::Data, &event.data);
        Ok(())
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of bytes encoded so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing was encoded yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

fn check_len(len: usize) -> CodecResult<()> {
    if u32::try_from(len).is_err() {
        return Err(CodecError::PayloadTooLarge { len });
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn put_block(buf: &mut impl BufMut, block_type: BlockType, payload: &[u8]) {
    // length checked by the caller
    buf.put_u16(block_type.as_u16());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
}
