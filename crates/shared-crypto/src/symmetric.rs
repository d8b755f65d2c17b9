//! # Symmetric Encryption
//!
//! XChaCha20-Poly1305 payload encryption for packed envelopes.
//!
//! ## Security Properties
//!
//! - 192-bit random nonces, safe to generate per message
//! - Constant-time ARX design
//! - Keys zeroized on drop

use crate::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Secret key (256-bit).
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive a key by hashing a domain label with input key material.
    pub fn derive(label: &[u8], parts: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(label);
        for part in parts {
            hasher.update((part.len() as u64).to_be_bytes());
            hasher.update(part);
        }
        Self(hasher.finalize().into())
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Nonce for encryption.
#[derive(Clone)]
pub struct Nonce([u8; 24]); // XChaCha20 uses 24-byte nonce

impl Nonce {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 24]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let actual = bytes.len();
        let bytes: [u8; 24] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 24,
            actual,
        })?;
        Ok(Self(bytes))
    }

    /// Generate random nonce (safe with XChaCha20's 192-bit nonce).
    pub fn generate() -> Self {
        let mut bytes = [0u8; 24];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
        Self(bytes)
    }

    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; 24] {
        &self.0
    }
}

/// Encrypt plaintext with XChaCha20-Poly1305.
///
/// Returns (ciphertext, nonce).
///
/// # Errors
///
/// Returns `CryptoError::EncryptionFailed` if encryption fails.
pub fn encrypt(key: &SecretKey, plaintext: &[u8]) -> Result<(Vec<u8>, Nonce), CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let nonce = Nonce::generate();

    let ciphertext = cipher
        .encrypt(XNonce::from_slice(nonce.as_bytes()), plaintext)
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    Ok((ciphertext, nonce))
}

/// Decrypt ciphertext with XChaCha20-Poly1305.
///
/// # Errors
///
/// Returns `CryptoError::DecryptionFailed` if decryption fails.
pub fn decrypt(key: &SecretKey, ciphertext: &[u8], nonce: &Nonce) -> Result<Vec<u8>, CryptoError> {
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());

    cipher
        .decrypt(XNonce::from_slice(nonce.as_bytes()), ciphertext)
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}
