//! `WalletPort` backed by the wallet gateway.

use crate::ports::WalletPort;
use ag_01_wallet_gateway::{UnpackedMessage, WalletGateway};
use async_trait::async_trait;
use shared_types::{DidInfo, Metadata, PairwiseConnection, WalletError, WalletHandle};

#[async_trait]
impl WalletPort for WalletGateway {
    async fn create_and_store_my_did(
        &self,
        handle: &WalletHandle,
    ) -> Result<DidInfo, WalletError> {
        WalletGateway::create_and_store_my_did(self, handle, None).await
    }

    async fn sign(
        &self,
        handle: &WalletHandle,
        verkey: &str,
        message: &[u8],
    ) -> Result<Vec<u8>, WalletError> {
        WalletGateway::sign(self, handle, verkey, message).await
    }

    async fn verify(
        &self,
        handle: &WalletHandle,
        verkey: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, WalletError> {
        WalletGateway::verify(self, handle, verkey, message, signature).await
    }

    async fn pack_message(
        &self,
        handle: &WalletHandle,
        message: &[u8],
        recipient_verkey: &str,
        sender_verkey: &str,
    ) -> Result<Vec<u8>, WalletError> {
        WalletGateway::pack_message(self, handle, message, recipient_verkey, sender_verkey).await
    }

    async fn unpack_message(
        &self,
        handle: &WalletHandle,
        payload: &[u8],
    ) -> Result<UnpackedMessage, WalletError> {
        WalletGateway::unpack_message(self, handle, payload).await
    }

    async fn create_pairwise(
        &self,
        handle: &WalletHandle,
        their_did: &str,
        their_verkey: &str,
        my_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError> {
        WalletGateway::create_pairwise(self, handle, their_did, their_verkey, my_did, metadata)
            .await
    }

    async fn get_pairwise(
        &self,
        handle: &WalletHandle,
        their_did: &str,
    ) -> Result<PairwiseConnection, WalletError> {
        WalletGateway::get_pairwise(self, handle, their_did).await
    }

    async fn set_pairwise_metadata(
        &self,
        handle: &WalletHandle,
        their_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError> {
        WalletGateway::set_pairwise_metadata(self, handle, their_did, metadata).await
    }
}
