//! Block and record types.

/// Size of a block header: type (2) + length (4).
pub const BLOCK_HEADER_SIZE: usize = 6;

/// Type tag carried in the first two bytes of every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    /// Event payload.
    Data,
    /// Per-event metadata payload.
    Meta,
}

impl BlockType {
    /// Returns the wire value of this block type.
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::Data => 0x0000,
            Self::Meta => 0x0001,
        }
    }

    /// Parses a wire value.
    #[must_use]
    pub const fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0000 => Some(Self::Data),
            0x0001 => Some(Self::Meta),
            _ => None,
        }
    }
}

/// One event as stored in a segment: opaque data plus optional metadata.
///
/// An empty `metadata` means the event carries none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RawBatchEvent {
    /// The serialized event.
    pub data: Vec<u8>,
    /// Small structured descriptor for the event (may be empty).
    pub metadata: Vec<u8>,
}

impl RawBatchEvent {
    /// Creates an event without metadata.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            metadata: Vec::new(),
        }
    }

    /// Creates an event with metadata.
    #[must_use]
    pub fn with_metadata(data: Vec<u8>, metadata: Vec<u8>) -> Self {
        Self { data, metadata }
    }

    /// Returns true if the event has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
