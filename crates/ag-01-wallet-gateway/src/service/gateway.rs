//! The wallet gateway: registry of per-wallet workers.

use super::worker::{self, WorkerCommand};
use crate::domain::{GatewayConfig, GatewayStats, UnpackedMessage, WalletRequest, WalletResponse};
use crate::ports::WalletBackend;
use shared_types::{DidInfo, Metadata, PairwiseConnection, Verkey, WalletError, WalletHandle};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running worker.
struct WorkerHandle {
    sender: mpsc::Sender<WorkerCommand>,
    passphrase_digest: [u8; 32],
    task: JoinHandle<()>,
}

impl WorkerHandle {
    fn is_alive(&self) -> bool {
        !self.task.is_finished() && !self.sender.is_closed()
    }
}

/// Registry entry for one wallet name.
///
/// The async mutex makes open and close for one name mutually exclusive,
/// so there is never more than one live worker per name.
#[derive(Default)]
struct WalletSlot {
    worker: tokio::sync::Mutex<Option<WorkerHandle>>,
}

/// Request/response front for wallet workers.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct WalletGateway {
    backend: Arc<dyn WalletBackend>,
    config: GatewayConfig,
    slots: parking_lot::Mutex<HashMap<String, Arc<WalletSlot>>>,
    stats: GatewayStats,
}

impl WalletGateway {
    /// Create a gateway over `backend`.
    pub fn new(backend: Arc<dyn WalletBackend>, config: GatewayConfig) -> Self {
        Self {
            backend,
            config,
            slots: parking_lot::Mutex::new(HashMap::new()),
            stats: GatewayStats::default(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Counters.
    #[must_use]
    pub fn stats(&self) -> &GatewayStats {
        &self.stats
    }

    fn slot(&self, name: &str) -> Arc<WalletSlot> {
        self.slots.lock().entry(name.to_string()).or_default().clone()
    }

    fn existing_slot(&self, name: &str) -> Option<Arc<WalletSlot>> {
        self.slots.lock().get(name).cloned()
    }

    /// Bound `future` by `timeout`, mapping expiry to `AgentTimeout`.
    async fn bounded<T, F>(
        &self,
        operation: &str,
        timeout: Duration,
        future: F,
    ) -> Result<T, WalletError>
    where
        F: Future<Output = Result<T, WalletError>>,
    {
        match tokio::time::timeout(timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                self.stats.timeouts.fetch_add(1, Ordering::Relaxed);
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(operation, timeout_ms, "Wallet call timed out");
                Err(WalletError::AgentTimeout {
                    operation: operation.to_string(),
                    timeout_ms,
                })
            }
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Provision a new wallet.
    pub async fn create(&self, handle: &WalletHandle) -> Result<(), WalletError> {
        let timeout = self.config.lifecycle_timeout;
        self.bounded(
            "create",
            timeout,
            self.backend.create(handle.name(), handle.passphrase()),
        )
        .await?;
        info!(wallet = %handle.name(), "Wallet created");
        Ok(())
    }

    /// Open the wallet unless a worker already holds it.
    ///
    /// Concurrent callers for the same name wait for the first open rather
    /// than opening again.
    ///
    /// # Errors
    /// `AccessDenied` if the wallet is held under a different passphrase.
    pub async fn ensure_open(&self, handle: &WalletHandle) -> Result<(), WalletError> {
        self.sender_for(handle).await.map(|_| ())
    }

    async fn sender_for(
        &self,
        handle: &WalletHandle,
    ) -> Result<mpsc::Sender<WorkerCommand>, WalletError> {
        let name = handle.name();
        let digest = handle.passphrase().digest();
        let slot = self.slot(name);
        let mut worker = slot.worker.lock().await;

        if let Some(existing) = worker.as_ref() {
            if existing.is_alive() {
                if existing.passphrase_digest != digest {
                    return Err(WalletError::AccessDenied(name.to_string()));
                }
                return Ok(existing.sender.clone());
            }
            debug!(wallet = %name, "Replacing stopped worker");
        }

        let timeout = self.config.lifecycle_timeout;
        let wallet = self
            .bounded("open", timeout, self.backend.open(name, handle.passphrase()))
            .await?;

        let (sender, receiver) = mpsc::channel(self.config.queue_capacity.max(1));
        let task = tokio::spawn(worker::run(name.to_string(), wallet, receiver));
        *worker = Some(WorkerHandle {
            sender: sender.clone(),
            passphrase_digest: digest,
            task,
        });

        self.stats.opens.fetch_add(1, Ordering::Relaxed);
        info!(wallet = %name, "Wallet opened");
        Ok(sender)
    }

    /// Close the wallet. Closing a wallet that is not open succeeds.
    ///
    /// If the worker does not acknowledge within the lifecycle timeout it is
    /// aborted, releasing the wallet, and `AgentTimeout` is returned.
    pub async fn close(&self, handle: &WalletHandle) -> Result<(), WalletError> {
        let name = handle.name();
        let Some(slot) = self.existing_slot(name) else {
            return Ok(());
        };

        let mut guard = slot.worker.lock().await;
        match guard.as_ref() {
            None => return Ok(()),
            Some(worker) if worker.passphrase_digest != handle.passphrase().digest() => {
                return Err(WalletError::AccessDenied(name.to_string()));
            }
            Some(_) => {}
        }

        match guard.take() {
            Some(worker) => self.stop_worker(name, worker).await,
            None => Ok(()),
        }
    }

    async fn stop_worker(&self, name: &str, worker: WorkerHandle) -> Result<(), WalletError> {
        let WorkerHandle { sender, task, .. } = worker;
        let timeout = self.config.lifecycle_timeout;
        let (reply, response) = oneshot::channel();

        let closing = dispatch(name, &sender, WorkerCommand::Close { reply }, response);
        match self.bounded("close", timeout, closing).await {
            Ok(()) => {
                self.stats.closes.fetch_add(1, Ordering::Relaxed);
                info!(wallet = %name, "Wallet closed");
                Ok(())
            }
            Err(WalletError::WalletNotOpen(_)) => {
                debug!(wallet = %name, "Worker already stopped");
                Ok(())
            }
            Err(e @ WalletError::AgentTimeout { .. }) => {
                task.abort();
                let _ = tokio::time::timeout(timeout, task).await;
                self.stats.forced_releases.fetch_add(1, Ordering::Relaxed);
                warn!(wallet = %name, "Close timed out, worker aborted");
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Remove a wallet from the backend.
    pub async fn delete(&self, handle: &WalletHandle) -> Result<(), WalletError> {
        let timeout = self.config.lifecycle_timeout;
        self.bounded(
            "delete",
            timeout,
            self.backend.delete(handle.name(), handle.passphrase()),
        )
        .await?;
        info!(wallet = %handle.name(), "Wallet deleted");
        Ok(())
    }

    /// Close (best effort) then delete.
    ///
    /// A failed or timed-out close does not stop the deletion; a timed-out
    /// worker has already been aborted by `close`. Deletion failures
    /// propagate.
    pub async fn destroy(&self, handle: &WalletHandle) -> Result<(), WalletError> {
        match self.close(handle).await {
            Ok(()) => {}
            Err(e @ WalletError::AccessDenied(_)) => return Err(e),
            Err(e) => {
                warn!(wallet = %handle.name(), error = %e, "Close failed during destroy, deleting anyway");
            }
        }
        self.delete(handle).await
    }

    /// Whether a live worker holds `name`.
    pub async fn is_open(&self, name: &str) -> bool {
        match self.existing_slot(name) {
            Some(slot) => slot
                .worker
                .lock()
                .await
                .as_ref()
                .is_some_and(WorkerHandle::is_alive),
            None => false,
        }
    }

    /// Close every open wallet. Failures are logged.
    pub async fn shutdown(&self) {
        let slots: Vec<(String, Arc<WalletSlot>)> = self
            .slots
            .lock()
            .iter()
            .map(|(name, slot)| (name.clone(), slot.clone()))
            .collect();

        for (name, slot) in slots {
            let worker = slot.worker.lock().await.take();
            if let Some(worker) = worker {
                if let Err(e) = self.stop_worker(&name, worker).await {
                    warn!(wallet = %name, error = %e, "Close during shutdown failed");
                }
            }
        }
        info!("Wallet gateway shut down");
    }

    // =========================================================================
    // DATA OPERATIONS
    // =========================================================================

    async fn call(
        &self,
        handle: &WalletHandle,
        request: WalletRequest,
    ) -> Result<WalletResponse, WalletError> {
        let operation = request.operation();
        let sender = self.sender_for(handle).await?;
        self.stats.requests.fetch_add(1, Ordering::Relaxed);

        let (reply, response) = oneshot::channel();
        let command = WorkerCommand::Execute { request, reply };
        self.bounded(
            operation,
            self.config.request_timeout,
            dispatch(handle.name(), &sender, command, response),
        )
        .await
    }

    /// Create a DID and key pair.
    pub async fn create_and_store_my_did(
        &self,
        handle: &WalletHandle,
        seed: Option<[u8; 32]>,
    ) -> Result<DidInfo, WalletError> {
        let request = WalletRequest::CreateAndStoreMyDid { seed };
        match self.call(handle, request).await? {
            WalletResponse::Did(info) => Ok(info),
            _ => Err(unexpected("create_and_store_my_did")),
        }
    }

    /// Verkey of a DID the wallet knows.
    pub async fn key_for_local_did(
        &self,
        handle: &WalletHandle,
        did: &str,
    ) -> Result<Verkey, WalletError> {
        let request = WalletRequest::KeyForLocalDid {
            did: did.to_string(),
        };
        match self.call(handle, request).await? {
            WalletResponse::Verkey(verkey) => Ok(verkey),
            _ => Err(unexpected("key_for_local_did")),
        }
    }

    /// Sign with a stored key.
    pub async fn sign(
        &self,
        handle: &WalletHandle,
        verkey: &str,
        message: &[u8],
    ) -> Result<Vec<u8>, WalletError> {
        let request = WalletRequest::Sign {
            verkey: verkey.to_string(),
            message: message.to_vec(),
        };
        match self.call(handle, request).await? {
            WalletResponse::Bytes(signature) => Ok(signature),
            _ => Err(unexpected("sign")),
        }
    }

    /// Verify a signature.
    pub async fn verify(
        &self,
        handle: &WalletHandle,
        verkey: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, WalletError> {
        let request = WalletRequest::Verify {
            verkey: verkey.to_string(),
            message: message.to_vec(),
            signature: signature.to_vec(),
        };
        match self.call(handle, request).await? {
            WalletResponse::Verified(valid) => Ok(valid),
            _ => Err(unexpected("verify")),
        }
    }

    /// Pack `message` from our `sender_verkey` to `recipient_verkey`.
    pub async fn pack_message(
        &self,
        handle: &WalletHandle,
        message: &[u8],
        recipient_verkey: &str,
        sender_verkey: &str,
    ) -> Result<Vec<u8>, WalletError> {
        let request = WalletRequest::PackMessage {
            message: message.to_vec(),
            recipient_verkey: recipient_verkey.to_string(),
            sender_verkey: sender_verkey.to_string(),
        };
        match self.call(handle, request).await? {
            WalletResponse::Bytes(packed) => Ok(packed),
            _ => Err(unexpected("pack_message")),
        }
    }

    /// Pack `message` for `recipient_verkey` without naming a sender.
    pub async fn anon_pack_message(
        &self,
        handle: &WalletHandle,
        message: &[u8],
        recipient_verkey: &str,
    ) -> Result<Vec<u8>, WalletError> {
        let request = WalletRequest::AnonPackMessage {
            message: message.to_vec(),
            recipient_verkey: recipient_verkey.to_string(),
        };
        match self.call(handle, request).await? {
            WalletResponse::Bytes(packed) => Ok(packed),
            _ => Err(unexpected("anon_pack_message")),
        }
    }

    /// Unpack a payload addressed to one of our keys.
    pub async fn unpack_message(
        &self,
        handle: &WalletHandle,
        payload: &[u8],
    ) -> Result<UnpackedMessage, WalletError> {
        let request = WalletRequest::UnpackMessage {
            payload: payload.to_vec(),
        };
        match self.call(handle, request).await? {
            WalletResponse::Unpacked(unpacked) => Ok(unpacked),
            _ => Err(unexpected("unpack_message")),
        }
    }

    /// Store a pairwise record.
    pub async fn create_pairwise(
        &self,
        handle: &WalletHandle,
        their_did: &str,
        their_verkey: &str,
        my_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError> {
        let request = WalletRequest::CreatePairwise {
            their_did: their_did.to_string(),
            their_verkey: their_verkey.to_string(),
            my_did: my_did.to_string(),
            metadata,
        };
        match self.call(handle, request).await? {
            WalletResponse::Done => Ok(()),
            _ => Err(unexpected("create_pairwise")),
        }
    }

    /// Every pairwise record in the wallet.
    pub async fn list_pairwise(
        &self,
        handle: &WalletHandle,
    ) -> Result<Vec<PairwiseConnection>, WalletError> {
        match self.call(handle, WalletRequest::ListPairwise).await? {
            WalletResponse::PairwiseList(records) => Ok(records),
            _ => Err(unexpected("list_pairwise")),
        }
    }

    /// One pairwise record.
    pub async fn get_pairwise(
        &self,
        handle: &WalletHandle,
        their_did: &str,
    ) -> Result<PairwiseConnection, WalletError> {
        let request = WalletRequest::GetPairwise {
            their_did: their_did.to_string(),
        };
        match self.call(handle, request).await? {
            WalletResponse::Pairwise(record) => Ok(record),
            _ => Err(unexpected("get_pairwise")),
        }
    }

    /// Replace pairwise metadata.
    pub async fn set_pairwise_metadata(
        &self,
        handle: &WalletHandle,
        their_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError> {
        let request = WalletRequest::SetPairwiseMetadata {
            their_did: their_did.to_string(),
            metadata,
        };
        match self.call(handle, request).await? {
            WalletResponse::Done => Ok(()),
            _ => Err(unexpected("set_pairwise_metadata")),
        }
    }
}

/// Send `command` and wait for its reply.
///
/// A closed queue or dropped reply means the worker is gone.
async fn dispatch<T>(
    name: &str,
    sender: &mpsc::Sender<WorkerCommand>,
    command: WorkerCommand,
    response: oneshot::Receiver<Result<T, WalletError>>,
) -> Result<T, WalletError> {
    sender
        .send(command)
        .await
        .map_err(|_| WalletError::WalletNotOpen(name.to_string()))?;
    match response.await {
        Ok(result) => result,
        Err(_) => Err(WalletError::WalletNotOpen(name.to_string())),
    }
}

fn unexpected(operation: &str) -> WalletError {
    WalletError::WalletOperationFailed(format!("unexpected worker response to {operation}"))
}
