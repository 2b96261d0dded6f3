//! AES-256-GCM encryption provider.
//!
//! Each payload is sealed independently: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.

use crate::encrypted::Encryption;
use crate::error::{StorageError, StorageResult};
use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// Size of the GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Key for [`AesGcmEncryption`]. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    /// Generates a random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Creates a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if `bytes` is not exactly 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> StorageResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(StorageError::Encryption(format!(
                "invalid key size: expected {KEY_SIZE}, got {}",
                bytes.len()
            )));
        }
        let mut key_bytes = [0u8; KEY_SIZE];
        key_bytes.copy_from_slice(bytes);
        Ok(Self { bytes: key_bytes })
    }

    /// Derives a key from a password using HKDF-SHA256.
    ///
    /// HKDF is not a password hash. Use it only when the password already
    /// carries enough entropy.
    ///
    /// # Errors
    ///
    /// Returns an error if the HKDF expansion fails.
    pub fn derive_from_password(password: &[u8], salt: &[u8]) -> StorageResult<Self> {
        use hkdf::Hkdf;
        use sha2::Sha256;

        let hk = Hkdf::<Sha256>::new(Some(salt), password);
        let mut bytes = [0u8; KEY_SIZE];
        hk.expand(b"batchlog-encryption-key-v1", &mut bytes)
            .map_err(|_| StorageError::Encryption("HKDF expand failed".to_string()))?;
        Ok(Self { bytes })
    }

    /// Returns the raw key bytes. Don't log the result.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// [`Encryption`] provider backed by AES-256-GCM with random nonces.
///
/// A failed seal or open is logged and yields an empty vector, which the
/// encrypting reader/writers treat as a bad result.
pub struct AesGcmEncryption {
    cipher: Aes256Gcm,
}

impl AesGcmEncryption {
    /// Creates a provider for `key`.
    #[must_use]
    pub fn new(key: &EncryptionKey) -> Self {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key.as_bytes()));
        Self { cipher }
    }

    fn seal(&self, plaintext: &[u8]) -> StorageResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| StorageError::Encryption("encryption error".to_string()))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend(ciphertext);
        Ok(result)
    }

    fn open(&self, sealed: &[u8]) -> StorageResult<Vec<u8>> {
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(StorageError::Encryption("ciphertext too short".to_string()));
        }
        let nonce = Nonce::from_slice(&sealed[..NONCE_SIZE]);
        self.cipher
            .decrypt(nonce, &sealed[NONCE_SIZE..])
            .map_err(|_| StorageError::Encryption("decryption error".to_string()))
    }
}

impl Encryption for AesGcmEncryption {
    fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        self.seal(data).unwrap_or_else(|e| {
            tracing::error!(target: "batchlog", error = %e, "unable to encrypt payload");
            Vec::new()
        })
    }

    fn decrypt(&self, data: &[u8]) -> Vec<u8> {
        self.open(data).unwrap_or_else(|e| {
            tracing::error!(target: "batchlog", error = %e, "unable to decrypt payload");
            Vec::new()
        })
    }

    fn encrypted_len(&self, len: usize) -> Option<usize> {
        Some(NONCE_SIZE + len + TAG_SIZE)
    }
}

impl std::fmt::Debug for AesGcmEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmEncryption")
            .field("cipher", &"Aes256Gcm")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_differ() {
        assert_ne!(
            EncryptionKey::generate().as_bytes(),
            EncryptionKey::generate().as_bytes()
        );
    }

    #[test]
    fn key_wrong_size() {
        assert!(EncryptionKey::from_bytes(&[0u8; 16]).is_err());
        assert!(EncryptionKey::from_bytes(&[0u8; 64]).is_err());
        assert!(EncryptionKey::from_bytes(&[7u8; KEY_SIZE]).is_ok());
    }

    #[test]
    fn roundtrip() {
        let provider = AesGcmEncryption::new(&EncryptionKey::generate());
        let sealed = provider.encrypt(b"{\"message\":\"hello\"}");

        assert_eq!(sealed.len(), NONCE_SIZE + 19 + TAG_SIZE);
        assert_eq!(provider.decrypt(&sealed), b"{\"message\":\"hello\"}".to_vec());
    }

    #[test]
    fn encrypted_len_matches_sealed_output() {
        let provider = AesGcmEncryption::new(&EncryptionKey::generate());
        for len in [0usize, 1, 100, 4_096] {
            let sealed = provider.encrypt(&vec![7u8; len]);
            assert_eq!(provider.encrypted_len(len), Some(sealed.len()));
        }
    }

    #[test]
    fn nonces_are_random() {
        let provider = AesGcmEncryption::new(&EncryptionKey::generate());
        assert_ne!(provider.encrypt(b"same"), provider.encrypt(b"same"));
    }

    #[test]
    fn wrong_key_yields_empty() {
        let a = AesGcmEncryption::new(&EncryptionKey::generate());
        let b = AesGcmEncryption::new(&EncryptionKey::generate());

        assert!(b.decrypt(&a.encrypt(b"secret")).is_empty());
    }

    #[test]
    fn short_input_yields_empty() {
        let provider = AesGcmEncryption::new(&EncryptionKey::generate());
        assert!(provider.decrypt(&[0u8; 10]).is_empty());
    }

    #[test]
    fn password_derivation_is_deterministic() {
        let k1 = EncryptionKey::derive_from_password(b"pw", b"salt").unwrap();
        let k2 = EncryptionKey::derive_from_password(b"pw", b"salt").unwrap();
        let k3 = EncryptionKey::derive_from_password(b"pw", b"other").unwrap();

        assert_eq!(k1.as_bytes(), k2.as_bytes());
        assert_ne!(k1.as_bytes(), k3.as_bytes());
    }

    proptest::proptest! {
        #[test]
        fn any_payload_roundtrips(data in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..2048)) {
            let provider = AesGcmEncryption::new(&EncryptionKey::from_bytes(&[9u8; KEY_SIZE]).unwrap());
            proptest::prop_assert_eq!(provider.decrypt(&provider.encrypt(&data)), data);
        }
    }

    #[test]
    fn debug_redacts_key() {
        let key = EncryptionKey::from_bytes(&[1u8; KEY_SIZE]).unwrap();
        assert!(format!("{key:?}").contains("REDACTED"));
    }
}
