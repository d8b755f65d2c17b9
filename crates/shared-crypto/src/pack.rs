//! # Message Packing
//!
//! Packs a plaintext for one recipient so that only the recipient can read
//! it. Authcrypt also tells the recipient which key sent it; anoncrypt
//! hides the sender behind a one-time key.
//!
//! ## Envelope
//!
//! ```text
//! {
//!   "protected": { "alg": "Authcrypt" | "Anoncrypt",
//!                  "enc": "xchacha20poly1305_ietf",
//!                  "recipient": <verkey>,
//!                  "sender": <verkey>,      // Authcrypt only
//!                  "epk": <verkey> },       // Anoncrypt only
//!   "iv": <base64url>,
//!   "ciphertext": <base64url>
//! }
//! ```
//!
//! The content key is derived from the X25519 shared secret of the sender
//! (or ephemeral) and recipient keys plus both verkeys, so a forged
//! `sender` field fails decryption rather than impersonating anyone.

use crate::signatures::{Ed25519KeyPair, Ed25519PublicKey};
use crate::symmetric::{decrypt, encrypt, Nonce, SecretKey};
use crate::CryptoError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Authenticated envelope identifier.
pub const AUTHCRYPT_ALG: &str = "Authcrypt";

/// Anonymous envelope identifier.
pub const ANONCRYPT_ALG: &str = "Anoncrypt";

/// Content encryption identifier.
pub const CONTENT_ENC: &str = "xchacha20poly1305_ietf";

const AUTHCRYPT_LABEL: &[u8] = b"pairwise-agent/authcrypt/v1";
const ANONCRYPT_LABEL: &[u8] = b"pairwise-agent/anoncrypt/v1";

/// Cleartext header naming the keys involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedHeader {
    /// Envelope algorithm.
    pub alg: String,
    /// Content encryption algorithm.
    pub enc: String,
    /// Recipient verkey.
    pub recipient: String,
    /// Sender verkey, authcrypt only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    /// One-time public key, anoncrypt only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epk: Option<String>,
}

/// A packed message as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedEnvelope {
    /// Cleartext header.
    pub protected: ProtectedHeader,
    /// Nonce, base64url.
    pub iv: String,
    /// Ciphertext, base64url.
    pub ciphertext: String,
}

impl PackedEnvelope {
    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CryptoError> {
        serde_json::to_vec(self).map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))
    }

    /// Parse from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let envelope: Self = serde_json::from_slice(bytes)
            .map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))?;
        let header = &envelope.protected;
        let keys_match = match header.alg.as_str() {
            AUTHCRYPT_ALG => header.sender.is_some() && header.epk.is_none(),
            ANONCRYPT_ALG => header.sender.is_none() && header.epk.is_some(),
            _ => false,
        };
        if !keys_match || header.enc != CONTENT_ENC {
            return Err(CryptoError::MalformedEnvelope(format!(
                "unsupported algorithm {}/{}",
                header.alg, header.enc
            )));
        }
        Ok(envelope)
    }

    /// Verkey the envelope is addressed to.
    pub fn recipient(&self) -> &str {
        &self.protected.recipient
    }

    /// Whether the envelope names its sender.
    pub fn is_authenticated(&self) -> bool {
        self.protected.sender.is_some()
    }
}

fn content_key(label: &[u8], shared: &[u8; 32], sender: &str, recipient: &str) -> SecretKey {
    SecretKey::derive(
        label,
        &[shared.as_slice(), sender.as_bytes(), recipient.as_bytes()],
    )
}

fn seal(
    label: &[u8],
    message: &[u8],
    from: &Ed25519KeyPair,
    recipient: &Ed25519PublicKey,
) -> Result<(String, String, String), CryptoError> {
    let from_verkey = from.verkey();
    let recipient_verkey = recipient.to_verkey();

    let shared = from.key_agreement(recipient)?;
    let key = content_key(label, &shared, &from_verkey, &recipient_verkey);
    let (ciphertext, nonce) = encrypt(&key, message)?;
    Ok((
        from_verkey,
        URL_SAFE_NO_PAD.encode(nonce.as_bytes()),
        URL_SAFE_NO_PAD.encode(ciphertext),
    ))
}

/// Pack `message` from `sender` to `recipient`.
///
/// # Errors
///
/// Fails if key agreement or encryption fails.
pub fn pack(
    message: &[u8],
    sender: &Ed25519KeyPair,
    recipient: &Ed25519PublicKey,
) -> Result<PackedEnvelope, CryptoError> {
    let (sender_verkey, iv, ciphertext) = seal(AUTHCRYPT_LABEL, message, sender, recipient)?;
    Ok(PackedEnvelope {
        protected: ProtectedHeader {
            alg: AUTHCRYPT_ALG.to_string(),
            enc: CONTENT_ENC.to_string(),
            recipient: recipient.to_verkey(),
            sender: Some(sender_verkey),
            epk: None,
        },
        iv,
        ciphertext,
    })
}

/// Pack `message` for `recipient` without revealing who sent it.
///
/// A fresh key pair is generated per message and dropped afterwards.
///
/// # Errors
///
/// Fails if key agreement or encryption fails.
pub fn anon_pack(
    message: &[u8],
    recipient: &Ed25519PublicKey,
) -> Result<PackedEnvelope, CryptoError> {
    let ephemeral = Ed25519KeyPair::generate();
    let (epk, iv, ciphertext) = seal(ANONCRYPT_LABEL, message, &ephemeral, recipient)?;
    Ok(PackedEnvelope {
        protected: ProtectedHeader {
            alg: ANONCRYPT_ALG.to_string(),
            enc: CONTENT_ENC.to_string(),
            recipient: recipient.to_verkey(),
            sender: None,
            epk: Some(epk),
        },
        iv,
        ciphertext,
    })
}

/// Unpack an envelope with the recipient's key pair.
///
/// Returns the plaintext and, for authcrypt, the authenticated sender
/// verkey.
///
/// # Errors
///
/// Fails if the envelope is addressed to another key, is malformed, or
/// does not authenticate.
pub fn unpack(
    envelope: &PackedEnvelope,
    recipient: &Ed25519KeyPair,
) -> Result<(Vec<u8>, Option<String>), CryptoError> {
    let my_verkey = recipient.verkey();
    if envelope.protected.recipient != my_verkey {
        return Err(CryptoError::RecipientMismatch {
            expected: my_verkey,
            actual: envelope.protected.recipient.clone(),
        });
    }

    let (label, from) = match (&envelope.protected.sender, &envelope.protected.epk) {
        (Some(sender), None) => (AUTHCRYPT_LABEL, sender),
        (None, Some(epk)) => (ANONCRYPT_LABEL, epk),
        _ => {
            return Err(CryptoError::MalformedEnvelope(
                "envelope must carry exactly one of sender and epk".into(),
            ))
        }
    };
    let from_key = Ed25519PublicKey::from_verkey(from)?;
    let iv = URL_SAFE_NO_PAD
        .decode(&envelope.iv)
        .map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))?;
    let ciphertext = URL_SAFE_NO_PAD
        .decode(&envelope.ciphertext)
        .map_err(|e| CryptoError::MalformedEnvelope(e.to_string()))?;

    let shared = recipient.key_agreement(&from_key)?;
    let key = content_key(label, &shared, from, &my_verkey);
    let plaintext = decrypt(&key, &ciphertext, &Nonce::from_slice(&iv)?)?;

    Ok((plaintext, envelope.protected.sender.clone()))
}
