//! Contact vault backed by AES-256-GCM.
//!
//! Reach information (email addresses, phone numbers) is sealed at rest and
//! only opened at the moment of a dispatch attempt. Keys are derived from a
//! vault secret with BLAKE3 under a fixed domain-separation context, so the
//! same secret can safely serve other sealing uses elsewhere in a host
//! application.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    AeadCore, Aes256Gcm, Key,
};
use async_trait::async_trait;
use blake3::Hasher;
use haven_core::{ContactVault, Error, Result};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain-separation context for contact sealing keys.
const SEALING_CONTEXT: &[u8] = b"haven-contact-seal-v1";

/// Wire format of a sealed contact blob.
#[derive(Serialize, Deserialize)]
struct SealedBlob {
    /// Random nonce for GCM (12 bytes)
    nonce: [u8; 12],
    /// Encrypted contact payload
    ciphertext: Vec<u8>,
}

/// AES-256-GCM contact vault with a BLAKE3-derived key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SealedContactVault {
    secret: [u8; 32],
}

impl SealedContactVault {
    /// Create a vault from a 32-byte secret held in secure storage.
    pub fn new(secret: [u8; 32]) -> Self {
        Self { secret }
    }

    fn cipher(&self) -> Aes256Gcm {
        let mut hasher = Hasher::new();
        hasher.update(SEALING_CONTEXT);
        hasher.update(b":");
        hasher.update(&self.secret);
        let derived: [u8; 32] = hasher.finalize().into();
        let key: &Key<Aes256Gcm> = (&derived).into();
        Aes256Gcm::new(key)
    }
}

#[async_trait]
impl ContactVault for SealedContactVault {
    async fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext)
            .map_err(|e| Error::vault(format!("AES-GCM encryption failed: {e}")))?;

        let blob = SealedBlob {
            nonce: nonce.into(),
            ciphertext,
        };
        bincode::serialize(&blob).map_err(|e| Error::vault(format!("blob encoding failed: {e}")))
    }

    async fn open(&self, blob: &[u8]) -> Result<Vec<u8>> {
        let blob: SealedBlob = bincode::deserialize(blob)
            .map_err(|e| Error::vault(format!("blob decoding failed: {e}")))?;

        let gcm_nonce = &blob.nonce.into();
        self.cipher()
            .decrypt(gcm_nonce, blob.ciphertext.as_slice())
            .map_err(|e| Error::vault(format!("AES-GCM decryption failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn seal_open_roundtrip() {
        let vault = SealedContactVault::new([7u8; 32]);
        let sealed = vault.seal(b"guardian@example.com").await.unwrap();
        assert_ne!(sealed, b"guardian@example.com");

        let opened = vault.open(&sealed).await.unwrap();
        assert_eq!(opened, b"guardian@example.com");
    }

    #[tokio::test]
    async fn wrong_secret_fails_to_open() {
        let vault = SealedContactVault::new([7u8; 32]);
        let sealed = vault.seal(b"+15551234567").await.unwrap();

        let other = SealedContactVault::new([8u8; 32]);
        assert_matches!(other.open(&sealed).await, Err(Error::Vault { .. }));
    }

    #[tokio::test]
    async fn tampered_blob_fails_to_open() {
        let vault = SealedContactVault::new([7u8; 32]);
        let mut sealed = vault.seal(b"guardian@example.com").await.unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xff;

        assert_matches!(vault.open(&sealed).await, Err(Error::Vault { .. }));
    }

    #[tokio::test]
    async fn nonces_are_not_reused() {
        let vault = SealedContactVault::new([7u8; 32]);
        let a = vault.seal(b"same plaintext").await.unwrap();
        let b = vault.seal(b"same plaintext").await.unwrap();
        assert_ne!(a, b);
    }
}
