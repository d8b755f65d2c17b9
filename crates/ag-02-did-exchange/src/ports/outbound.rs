//! Outbound (Driven) ports for DID exchange.
//!
//! The machines never touch key material; every cryptographic step and
//! every pairwise record goes through this port.

use ag_01_wallet_gateway::UnpackedMessage;
use async_trait::async_trait;
use shared_types::{DidInfo, Metadata, PairwiseConnection, WalletError, WalletHandle};

/// Wallet operations the handshake needs.
#[async_trait]
pub trait WalletPort: Send + Sync {
    /// Fresh DID and key pair.
    async fn create_and_store_my_did(&self, handle: &WalletHandle)
        -> Result<DidInfo, WalletError>;

    /// Sign with a stored key.
    async fn sign(
        &self,
        handle: &WalletHandle,
        verkey: &str,
        message: &[u8],
    ) -> Result<Vec<u8>, WalletError>;

    /// Verify a signature by any key.
    async fn verify(
        &self,
        handle: &WalletHandle,
        verkey: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, WalletError>;

    /// Authenticated encryption from our `sender_verkey`.
    async fn pack_message(
        &self,
        handle: &WalletHandle,
        message: &[u8],
        recipient_verkey: &str,
        sender_verkey: &str,
    ) -> Result<Vec<u8>, WalletError>;

    /// Decrypt a payload addressed to one of our keys.
    async fn unpack_message(
        &self,
        handle: &WalletHandle,
        payload: &[u8],
    ) -> Result<UnpackedMessage, WalletError>;

    /// Store a pairwise record.
    async fn create_pairwise(
        &self,
        handle: &WalletHandle,
        their_did: &str,
        their_verkey: &str,
        my_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError>;

    /// Fetch a pairwise record.
    async fn get_pairwise(
        &self,
        handle: &WalletHandle,
        their_did: &str,
    ) -> Result<PairwiseConnection, WalletError>;

    /// Replace pairwise metadata.
    async fn set_pairwise_metadata(
        &self,
        handle: &WalletHandle,
        their_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError>;
}
