//! Pluggable meta block formats.
//!
//! The meta block of every record is produced by [`MetaFormat::serialize`]
//! on write and checked by [`MetaFormat::parse`] on read. A record whose meta
//! payload fails to parse is skipped by the decoder; later records are still
//! returned.

use crate::error::{CodecError, CodecResult};
use std::fmt;

/// Serializer/parser pair for meta block payloads.
pub trait MetaFormat: Send + Sync + fmt::Debug {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Turns event metadata into a meta block payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be represented in this format.
    fn serialize(&self, metadata: &[u8]) -> CodecResult<Vec<u8>>;

    /// Turns a meta block payload back into event metadata.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::MalformedMeta`] if the payload is not valid.
    fn parse(&self, payload: &[u8]) -> CodecResult<Vec<u8>>;
}

/// Stores metadata bytes verbatim. Every payload parses.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawMetaFormat;

impl MetaFormat for RawMetaFormat {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn serialize(&self, metadata: &[u8]) -> CodecResult<Vec<u8>> {
        Ok(metadata.to_vec())
    }

    fn parse(&self, payload: &[u8]) -> CodecResult<Vec<u8>> {
        Ok(payload.to_vec())
    }
}

/// Requires metadata to be a single JSON document.
///
/// An empty payload stands for "no metadata" and is always accepted. The
/// bytes are stored as given, so a round-trip returns them unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMetaFormat;

impl JsonMetaFormat {
    fn check(payload: &[u8]) -> CodecResult<()> {
        if payload.is_empty() {
            return Ok(());
        }
        serde_json::from_slice::<serde_json::Value>(payload)
            .map(|_| ())
            .map_err(|e| CodecError::malformed_meta("json", e.to_string()))
    }
}

impl MetaFormat for JsonMetaFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn serialize(&self, metadata: &[u8]) -> CodecResult<Vec<u8>> {
        Self::check(metadata)?;
        Ok(metadata.to_vec())
    }

    fn parse(&self, payload: &[u8]) -> CodecResult<Vec<u8>> {
        Self::check(payload)?;
        Ok(payload.to_vec())
    }
}
