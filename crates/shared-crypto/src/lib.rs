//! # Shared Crypto - Wallet Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | DID keys, `connection~sig` signing |
//! | `symmetric` | XChaCha20-Poly1305 | Envelope payload encryption |
//! | `pack` | Ed25519→X25519 DH + XChaCha20 | Authcrypt and anoncrypt message packing |
//!
//! ## Encodings
//!
//! - **Verkeys**: base58 of the 32-byte Ed25519 public key
//! - **DIDs**: base58 of the first 16 bytes of the verkey (Indy convention)
//! - **Envelope fields**: unpadded base64url

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod pack;
pub mod signatures;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use pack::{anon_pack, pack, unpack, PackedEnvelope, ProtectedHeader};
pub use signatures::{did_matches_verkey, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use symmetric::{decrypt, encrypt, Nonce, SecretKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
