//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Key agreement produced a degenerate shared secret
    #[error("Key agreement failed")]
    KeyAgreementFailed,

    /// Envelope is not addressed to the supplied key
    #[error("Envelope recipient mismatch: expected {expected}, got {actual}")]
    RecipientMismatch {
        /// Verkey the caller tried to unpack with
        expected: String,
        /// Verkey named in the envelope
        actual: String,
    },

    /// Malformed envelope or encoding
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),
}
