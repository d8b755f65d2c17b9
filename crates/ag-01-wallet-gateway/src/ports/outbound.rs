//! Outbound (Driven) ports for the wallet gateway.
//!
//! The external wallet store and crypto backend. The gateway owns at most
//! one `OpenWallet` per name at a time and hands it to a worker task.

use crate::domain::UnpackedMessage;
use async_trait::async_trait;
use shared_types::{DidInfo, Metadata, PairwiseConnection, Passphrase, Verkey, WalletError};

/// Wallet storage provisioning.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    /// Provision a new wallet.
    ///
    /// # Errors
    /// `WalletAlreadyExists` if the name is taken.
    async fn create(&self, name: &str, passphrase: &Passphrase) -> Result<(), WalletError>;

    /// Open a wallet for exclusive use.
    ///
    /// # Errors
    /// `WalletNotFound` for unknown names, `AccessDenied` on a wrong passphrase.
    async fn open(
        &self,
        name: &str,
        passphrase: &Passphrase,
    ) -> Result<Box<dyn OpenWallet>, WalletError>;

    /// Remove a wallet and everything in it.
    ///
    /// # Errors
    /// `WalletNotFound`, `AccessDenied`, or `WalletOperationFailed` while the
    /// wallet is still open.
    async fn delete(&self, name: &str, passphrase: &Passphrase) -> Result<(), WalletError>;
}

/// An opened wallet. Owned by exactly one worker.
#[async_trait]
pub trait OpenWallet: Send + Sync {
    /// Create a DID and key pair, optionally from a seed.
    async fn create_and_store_my_did(
        &mut self,
        seed: Option<[u8; 32]>,
    ) -> Result<DidInfo, WalletError>;

    /// Verkey of a DID known to this wallet.
    async fn key_for_local_did(&self, did: &str) -> Result<Verkey, WalletError>;

    /// Sign with a stored key.
    async fn sign(&self, verkey: &str, message: &[u8]) -> Result<Vec<u8>, WalletError>;

    /// Verify a signature by any key.
    async fn verify(
        &self,
        verkey: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, WalletError>;

    /// Authenticated encryption from a stored key to `recipient_verkey`.
    async fn pack_message(
        &self,
        message: &[u8],
        recipient_verkey: &str,
        sender_verkey: &str,
    ) -> Result<Vec<u8>, WalletError>;

    /// Anonymous encryption to `recipient_verkey`; needs no stored key.
    async fn anon_pack_message(
        &self,
        message: &[u8],
        recipient_verkey: &str,
    ) -> Result<Vec<u8>, WalletError>;

    /// Decrypt a payload addressed to one of our keys, authcrypted or
    /// anoncrypted.
    async fn unpack_message(&self, payload: &[u8]) -> Result<UnpackedMessage, WalletError>;

    /// Store a pairwise record.
    async fn create_pairwise(
        &mut self,
        their_did: &str,
        their_verkey: &str,
        my_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError>;

    /// Every pairwise record.
    async fn list_pairwise(&self) -> Result<Vec<PairwiseConnection>, WalletError>;

    /// One pairwise record.
    async fn get_pairwise(&self, their_did: &str) -> Result<PairwiseConnection, WalletError>;

    /// Replace pairwise metadata.
    async fn set_pairwise_metadata(
        &mut self,
        their_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError>;

    /// Release the wallet.
    async fn close(self: Box<Self>) -> Result<(), WalletError>;
}
