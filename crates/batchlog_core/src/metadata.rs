//! Segment sidecar documents.

use crate::error::CoreResult;
use batchlog_storage::{FileReaderWriter, StorageError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Content of a `<segment>_metadata` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    /// Events handed to this segment so far.
    #[serde(default)]
    pub item_count: u64,

    /// Opaque batch metadata supplied by the producer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<Vec<u8>>,
}

impl SegmentMetadata {
    /// Encodes the document as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> CoreResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decodes a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not a sidecar document.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Reads and writes sidecars through a [`FileReaderWriter`].
#[derive(Clone)]
pub struct MetadataStore {
    rw: Arc<dyn FileReaderWriter>,
}

impl MetadataStore {
    /// Creates a store writing through `rw`.
    pub fn new(rw: Arc<dyn FileReaderWriter>) -> Self {
        Self { rw }
    }

    /// Reads the sidecar at `path`. A missing sidecar is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sidecar exists but cannot be read or decoded.
    pub fn read(&self, path: &Path) -> CoreResult<Option<SegmentMetadata>> {
        match self.rw.read_data(path) {
            Ok(bytes) => SegmentMetadata::from_bytes(&bytes).map(Some),
            Err(StorageError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replaces the sidecar at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sidecar cannot be written.
    pub fn write(&self, path: &Path, metadata: &SegmentMetadata) -> CoreResult<()> {
        let bytes = metadata.to_bytes()?;
        self.rw.write_data(path, &bytes, false)?;
        Ok(())
    }

    /// Reads the sidecar (or a default one), applies `f` and writes it back.
    ///
    /// # Errors
    ///
    /// Returns an error if the sidecar cannot be written. An unreadable
    /// sidecar is replaced.
    pub fn update<F>(&self, path: &Path, f: F) -> CoreResult<SegmentMetadata>
    where
        F: FnOnce(&mut SegmentMetadata),
    {
        let mut metadata = self.read(path).ok().flatten().unwrap_or_default();
        f(&mut metadata);
        self.write(path, &metadata)?;
        Ok(metadata)
    }
}

impl std::fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataStore").finish_non_exhaustive()
    }
}
