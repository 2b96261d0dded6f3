//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while framing or parsing blocks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A block payload does not fit in the 32-bit length field.
    #[error("payload too large for a block: {len} bytes")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
    },

    /// A meta payload was rejected by the meta format.
    #[error("malformed {format} meta: {message}")]
    MalformedMeta {
        /// Name of the meta format that rejected the payload.
        format: &'static str,
        /// Description of the problem.
        message: String,
    },
}

impl CodecError {
    /// Creates a malformed meta error.
    pub fn malformed_meta(format: &'static str, message: impl Into<String>) -> Self {
        Self::MalformedMeta {
            format,
            message: message.into(),
        }
    }
}
