//! Requests and responses exchanged with a wallet worker.

use serde::{Deserialize, Serialize};
use shared_types::{Did, DidInfo, Metadata, PairwiseConnection, Verkey};
use std::sync::atomic::AtomicU64;

/// Result of unpacking an inbound wire payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpackedMessage {
    /// Decrypted message bytes.
    pub message: Vec<u8>,
    /// Authenticated sender key; `None` for anoncrypted payloads.
    pub sender_verkey: Option<Verkey>,
    /// Our key the payload was addressed to.
    pub recipient_verkey: Verkey,
}

/// A data operation executed by a worker against its open wallet.
#[derive(Debug, Clone)]
pub enum WalletRequest {
    /// Create a DID and key pair, optionally from a seed.
    CreateAndStoreMyDid {
        /// Deterministic key seed.
        seed: Option<[u8; 32]>,
    },
    /// Resolve a DID to its verkey.
    KeyForLocalDid {
        /// DID to resolve.
        did: Did,
    },
    /// Sign bytes with a stored key.
    Sign {
        /// Signing key.
        verkey: Verkey,
        /// Bytes to sign.
        message: Vec<u8>,
    },
    /// Verify a signature.
    Verify {
        /// Claimed signer.
        verkey: Verkey,
        /// Signed bytes.
        message: Vec<u8>,
        /// Signature bytes.
        signature: Vec<u8>,
    },
    /// Authenticated encryption for one recipient.
    PackMessage {
        /// Plaintext.
        message: Vec<u8>,
        /// Recipient key.
        recipient_verkey: Verkey,
        /// Stored sender key.
        sender_verkey: Verkey,
    },
    /// Anonymous encryption for one recipient.
    AnonPackMessage {
        /// Plaintext.
        message: Vec<u8>,
        /// Recipient key.
        recipient_verkey: Verkey,
    },
    /// Decrypt a packed payload addressed to one of our keys.
    UnpackMessage {
        /// Packed bytes.
        payload: Vec<u8>,
    },
    /// Store a pairwise record.
    CreatePairwise {
        /// Remote DID.
        their_did: Did,
        /// Remote verkey.
        their_verkey: Verkey,
        /// Our DID.
        my_did: Did,
        /// Initial metadata.
        metadata: Metadata,
    },
    /// List every pairwise record.
    ListPairwise,
    /// Fetch one pairwise record.
    GetPairwise {
        /// Remote DID.
        their_did: Did,
    },
    /// Replace the metadata of a pairwise record.
    SetPairwiseMetadata {
        /// Remote DID.
        their_did: Did,
        /// New metadata.
        metadata: Metadata,
    },
}

impl WalletRequest {
    /// Operation name for logs and timeout errors.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::CreateAndStoreMyDid { .. } => "create_and_store_my_did",
            Self::KeyForLocalDid { .. } => "key_for_local_did",
            Self::Sign { .. } => "sign",
            Self::Verify { .. } => "verify",
            Self::PackMessage { .. } => "pack_message",
            Self::AnonPackMessage { .. } => "anon_pack_message",
            Self::UnpackMessage { .. } => "unpack_message",
            Self::CreatePairwise { .. } => "create_pairwise",
            Self::ListPairwise => "list_pairwise",
            Self::GetPairwise { .. } => "get_pairwise",
            Self::SetPairwiseMetadata { .. } => "set_pairwise_metadata",
        }
    }
}

/// Worker reply to a `WalletRequest`.
#[derive(Debug, Clone)]
pub enum WalletResponse {
    /// New DID.
    Did(DidInfo),
    /// A verkey.
    Verkey(Verkey),
    /// Signature or packed bytes.
    Bytes(Vec<u8>),
    /// Verification outcome.
    Verified(bool),
    /// Unpacked payload.
    Unpacked(UnpackedMessage),
    /// One pairwise record.
    Pairwise(PairwiseConnection),
    /// Every pairwise record.
    PairwiseList(Vec<PairwiseConnection>),
    /// Completed with nothing to return.
    Done,
}

/// Gateway counters.
#[derive(Debug, Default)]
pub struct GatewayStats {
    /// Workers started.
    pub opens: AtomicU64,
    /// Workers closed cleanly.
    pub closes: AtomicU64,
    /// Requests dispatched to workers.
    pub requests: AtomicU64,
    /// Calls that hit their timeout.
    pub timeouts: AtomicU64,
    /// Workers aborted after a close timed out.
    pub forced_releases: AtomicU64,
}
