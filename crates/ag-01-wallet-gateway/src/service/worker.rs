//! Per-wallet worker loop.
//!
//! A worker owns one `OpenWallet` exclusively and serves commands from a
//! bounded queue, one at a time, until it is told to close or every sender
//! is gone.

use crate::domain::{WalletRequest, WalletResponse};
use crate::ports::OpenWallet;
use shared_types::WalletError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Reply channel for one command.
pub(crate) type Reply<T> = oneshot::Sender<Result<T, WalletError>>;

/// Commands accepted by a worker.
pub(crate) enum WorkerCommand {
    /// Run a data operation.
    Execute {
        request: WalletRequest,
        reply: Reply<WalletResponse>,
    },
    /// Close the wallet and stop.
    Close { reply: Reply<()> },
}

/// Serve commands until closed.
pub(crate) async fn run(
    name: String,
    mut wallet: Box<dyn OpenWallet>,
    mut commands: mpsc::Receiver<WorkerCommand>,
) {
    debug!(wallet = %name, "Wallet worker started");

    while let Some(command) = commands.recv().await {
        match command {
            WorkerCommand::Execute { request, reply } => {
                let operation = request.operation();
                let result = execute(wallet.as_mut(), request).await;
                if let Err(e) = &result {
                    debug!(wallet = %name, operation, error = %e, "Wallet operation failed");
                }
                if reply.send(result).is_err() {
                    debug!(wallet = %name, operation, "Caller gone before reply");
                }
            }
            WorkerCommand::Close { reply } => {
                let result = wallet.close().await;
                info!(wallet = %name, ok = result.is_ok(), "Wallet worker closed");
                let _ = reply.send(result);
                return;
            }
        }
    }

    // Gateway dropped every sender without an explicit close
    if let Err(e) = wallet.close().await {
        warn!(wallet = %name, error = %e, "Wallet close on worker exit failed");
    }
    debug!(wallet = %name, "Wallet worker stopped");
}

async fn execute(
    wallet: &mut dyn OpenWallet,
    request: WalletRequest,
) -> Result<WalletResponse, WalletError> {
    match request {
        WalletRequest::CreateAndStoreMyDid { seed } => wallet
            .create_and_store_my_did(seed)
            .await
            .map(WalletResponse::Did),
        WalletRequest::KeyForLocalDid { did } => wallet
            .key_for_local_did(&did)
            .await
            .map(WalletResponse::Verkey),
        WalletRequest::Sign { verkey, message } => wallet
            .sign(&verkey, &message)
            .await
            .map(WalletResponse::Bytes),
        WalletRequest::Verify {
            verkey,
            message,
            signature,
        } => wallet
            .verify(&verkey, &message, &signature)
            .await
            .map(WalletResponse::Verified),
        WalletRequest::PackMessage {
            message,
            recipient_verkey,
            sender_verkey,
        } => wallet
            .pack_message(&message, &recipient_verkey, &sender_verkey)
            .await
            .map(WalletResponse::Bytes),
        WalletRequest::AnonPackMessage {
            message,
            recipient_verkey,
        } => wallet
            .anon_pack_message(&message, &recipient_verkey)
            .await
            .map(WalletResponse::Bytes),
        WalletRequest::UnpackMessage { payload } => wallet
            .unpack_message(&payload)
            .await
            .map(WalletResponse::Unpacked),
        WalletRequest::CreatePairwise {
            their_did,
            their_verkey,
            my_did,
            metadata,
        } => wallet
            .create_pairwise(&their_did, &their_verkey, &my_did, metadata)
            .await
            .map(|()| WalletResponse::Done),
        WalletRequest::ListPairwise => wallet
            .list_pairwise()
            .await
            .map(WalletResponse::PairwiseList),
        WalletRequest::GetPairwise { their_did } => wallet
            .get_pairwise(&their_did)
            .await
            .map(WalletResponse::Pairwise),
        WalletRequest::SetPairwiseMetadata {
            their_did,
            metadata,
        } => wallet
            .set_pairwise_metadata(&their_did, metadata)
            .await
            .map(|()| WalletResponse::Done),
    }
}
