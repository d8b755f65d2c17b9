//! # Ed25519 Keys
//!
//! Twisted Edwards curve signatures with deterministic nonces, plus the
//! verkey/DID encodings wallets hand out.
//!
//! ## Security Properties
//!
//! - No RNG dependency when signing (deterministic nonce from message)
//! - Secret scalars never leave the key pair; key agreement returns only
//!   the shared point

use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

/// Number of verkey bytes that make up an Indy-style DID.
const DID_KEY_PREFIX_LEN: usize = 16;

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        // Validate it's a valid point
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Decode a base58 verkey.
    pub fn from_verkey(verkey: &str) -> Result<Self, CryptoError> {
        let bytes = bs58::decode(verkey)
            .into_vec()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        let actual = bytes.len();
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual,
        })?;
        Self::from_bytes(bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base58 verkey encoding.
    pub fn to_verkey(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Indy-style DID: base58 of the first 16 key bytes.
    pub fn to_did(&self) -> String {
        bs58::encode(&self.0[..DID_KEY_PREFIX_LEN]).into_string()
    }

    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Returns `true` if `did` is the Indy-style DID of `verkey`.
pub fn did_matches_verkey(did: &str, verkey: &str) -> bool {
    Ed25519PublicKey::from_verkey(verkey)
        .map(|key| key.to_did() == did)
        .unwrap_or(false)
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// Ed25519 keypair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Get public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        let verifying_key = self.signing_key.verifying_key();
        Ed25519PublicKey(verifying_key.to_bytes())
    }

    /// Base58 verkey of this key pair.
    pub fn verkey(&self) -> String {
        self.public_key().to_verkey()
    }

    /// Sign a message (deterministic - no RNG needed).
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        let sig = self.signing_key.sign(message);
        Ed25519Signature(sig.to_bytes())
    }

    /// Get secret seed (for storage).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// X25519 Diffie-Hellman against a peer's Ed25519 key.
    ///
    /// Both keys are mapped to their Montgomery form, so
    /// `a.key_agreement(B) == b.key_agreement(A)`.
    pub fn key_agreement(&self, their: &Ed25519PublicKey) -> Result<[u8; 32], CryptoError> {
        let their_point = VerifyingKey::from_bytes(&their.0)
            .map_err(|_| CryptoError::InvalidPublicKey)?
            .to_montgomery();
        let shared = their_point
            .mul_clamped(self.signing_key.to_scalar_bytes())
            .to_bytes();

        // Low-order peer keys collapse to the identity
        if shared == [0u8; 32] {
            return Err(CryptoError::KeyAgreementFailed);
        }
        Ok(shared)
    }
}
