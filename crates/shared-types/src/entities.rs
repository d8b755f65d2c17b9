//! # Core Domain Entities
//!
//! Defines the entities shared across the agent crates.
//!
//! ## Clusters
//!
//! - **Identity**: `WalletHandle`, `DidInfo`
//! - **Relationships**: `PairwiseConnection`, `Invitation`
//! - **Transport**: `WireMessage`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroize;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A decentralized identifier (base58, Indy-style).
pub type Did = String;

/// A base58-encoded Ed25519 verification key.
pub type Verkey = String;

/// JSON metadata attached to a pairwise record.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Wallet passphrase, zeroized on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Passphrase(String);

impl Passphrase {
    /// Wrap a passphrase.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// SHA-256 digest of the passphrase.
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        Sha256::digest(self.0.as_bytes()).into()
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

/// Credentials identifying a cryptographic wallet.
///
/// Constructed per request from caller-supplied credentials; never
/// persisted outside the wallet store.
#[derive(Clone, Debug)]
pub struct WalletHandle {
    name: String,
    passphrase: Passphrase,
}

impl WalletHandle {
    /// Create a handle for the wallet `name`.
    pub fn new(name: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passphrase: Passphrase::new(passphrase),
        }
    }

    /// Unique wallet name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wallet passphrase.
    #[must_use]
    pub fn passphrase(&self) -> &Passphrase {
        &self.passphrase
    }
}

/// A DID together with its verification key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidInfo {
    /// The DID.
    pub did: Did,
    /// The verkey the DID resolves to.
    pub verkey: Verkey,
}

// =============================================================================
// CLUSTER B: RELATIONSHIPS
// =============================================================================

/// A stored record of a completed, mutually authenticated relationship.
///
/// Owned by the wallet store; the protocol engine only touches it through
/// gateway calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairwiseConnection {
    /// The remote party's DID.
    pub their_did: Did,
    /// The remote party's verkey.
    pub their_verkey: Verkey,
    /// Our DID for this relationship.
    pub my_did: Did,
    /// Our verkey for this relationship.
    pub my_verkey: Verkey,
    /// Arbitrary metadata (label, endpoint, handshake status).
    #[serde(default)]
    pub metadata: Metadata,
}

/// An out-of-band connection invitation.
///
/// Immutable value object. Its validity is decided entirely by whether the
/// inviter still runs a machine willing to accept the resulting request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Message id.
    #[serde(rename = "@id")]
    pub id: String,
    /// Human-readable label of the inviter.
    pub label: String,
    /// Keys the invitee must address its request to.
    #[serde(rename = "recipientKeys")]
    pub recipient_keys: Vec<Verkey>,
    /// Channel name (or URL) the request must be delivered to.
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
    /// Optional mediator keys.
    #[serde(rename = "routingKeys", default, skip_serializing_if = "Vec::is_empty")]
    pub routing_keys: Vec<Verkey>,
}

impl Invitation {
    /// Create an invitation addressed to a single connection key.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        service_endpoint: impl Into<String>,
        connection_key: Verkey,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            recipient_keys: vec![connection_key],
            service_endpoint: service_endpoint.into(),
            routing_keys: Vec::new(),
        }
    }

    /// The key the request must be packed for.
    #[must_use]
    pub fn connection_key(&self) -> Option<&str> {
        self.recipient_keys.first().map(String::as_str)
    }
}

// =============================================================================
// CLUSTER C: TRANSPORT
// =============================================================================

/// A raw message at a channel boundary. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    /// Content type tag (e.g. `application/ssi-agent-wire`).
    pub content_type: String,
    /// Opaque payload.
    pub payload: Vec<u8>,
}

impl WireMessage {
    /// Create a wire message.
    pub fn new(content_type: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            payload: payload.into(),
        }
    }
}
