//! Encrypting decorators around the plain reader/writers.
//!
//! Only payload bytes go through the provider. Block framing and the
//! per-event metadata stay in clear, so a segment can still be walked
//! record by record without the key.

use crate::backend::{BatchFileReaderWriter, FileReaderWriter};
use crate::error::{StorageError, StorageResult};
use batchlog_codec::RawBatchEvent;
use std::path::Path;
use std::sync::Arc;

/// A symmetric byte transform supplied by the application.
///
/// `decrypt(encrypt(x)) == x` is the caller's contract; the decorators do
/// not verify it. Failures are signalled by returning an empty vector.
pub trait Encryption: Send + Sync {
    /// Encrypts `data`.
    fn encrypt(&self, data: &[u8]) -> Vec<u8>;

    /// Decrypts `data`.
    fn decrypt(&self, data: &[u8]) -> Vec<u8>;

    /// Length of the ciphertext of a `len`-byte input, when it depends on
    /// the length alone. `None` makes callers encrypt to find out.
    fn encrypted_len(&self, len: usize) -> Option<usize> {
        let _ = len;
        None
    }
}

fn encrypt_checked(encryption: &dyn Encryption, data: &[u8]) -> StorageResult<Vec<u8>> {
    let encrypted = encryption.encrypt(data);
    if !data.is_empty() && encrypted.is_empty() {
        return Err(StorageError::BadEncryptionResult);
    }
    Ok(encrypted)
}

/// Encrypts the data of every event before handing it to `delegate`.
pub struct EncryptedBatchFileReaderWriter {
    encryption: Arc<dyn Encryption>,
    delegate: Box<dyn BatchFileReaderWriter>,
}

impl EncryptedBatchFileReaderWriter {
    /// Wraps `delegate`.
    pub fn new(encryption: Arc<dyn Encryption>, delegate: Box<dyn BatchFileReaderWriter>) -> Self {
        Self {
            encryption,
            delegate,
        }
    }
}

impl BatchFileReaderWriter for EncryptedBatchFileReaderWriter {
    fn write_data(&self, path: &Path, event: &RawBatchEvent, append: bool) -> StorageResult<()> {
        let data = encrypt_checked(self.encryption.as_ref(), &event.data)?;
        let encrypted = RawBatchEvent {
            data,
            metadata: event.metadata.clone(),
        };
        self.delegate.write_data(path, &encrypted, append)
    }

    fn read_data(&self, path: &Path) -> StorageResult<Vec<RawBatchEvent>> {
        let events = self.delegate.read_data(path)?;
        Ok(events
            .into_iter()
            .map(|event| RawBatchEvent {
                data: self.encryption.decrypt(&event.data),
                metadata: event.metadata,
            })
            .collect())
    }

    fn encoded_len(&self, event: &RawBatchEvent) -> StorageResult<u64> {
        let data_len = match self.encryption.encrypted_len(event.data.len()) {
            Some(len) => len,
            None => encrypt_checked(self.encryption.as_ref(), &event.data)?.len(),
        };
        Ok(batchlog_codec::encoded_len(event.metadata.len(), data_len) as u64)
    }
}

/// Encrypts whole files.
///
/// The file is a single ciphertext, so appending to it is rejected.
pub struct EncryptedFileReaderWriter {
    encryption: Arc<dyn Encryption>,
    delegate: Box<dyn FileReaderWriter>,
}

impl EncryptedFileReaderWriter {
    /// Wraps `delegate`.
    pub fn new(encryption: Arc<dyn Encryption>, delegate: Box<dyn FileReaderWriter>) -> Self {
        Self {
            encryption,
            delegate,
        }
    }
}

impl FileReaderWriter for EncryptedFileReaderWriter {
    fn write_data(&self, path: &Path, data: &[u8], append: bool) -> StorageResult<()> {
        if append {
            return Err(StorageError::AppendNotSupported);
        }
        let encrypted = encrypt_checked(self.encryption.as_ref(), data)?;
        self.delegate.write_data(path, &encrypted, false)
    }

    fn read_data(&self, path: &Path) -> StorageResult<Vec<u8>> {
        let encrypted = self.delegate.read_data(path)?;
        Ok(self.encryption.decrypt(&encrypted))
    }
}
