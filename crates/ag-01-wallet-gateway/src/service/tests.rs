use super::WalletGateway;
use crate::adapters::InMemoryWalletBackend;
use crate::domain::{GatewayConfig, UnpackedMessage};
use crate::ports::{OpenWallet, WalletBackend};
use async_trait::async_trait;
use shared_types::{
    DidInfo, Metadata, PairwiseConnection, Passphrase, Verkey, WalletError, WalletHandle,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Test doubles
// =============================================================================

/// Delays injected by `SlowBackend`.
#[derive(Clone, Copy, Default)]
struct Delays {
    open: Duration,
    sign: Duration,
    close: Duration,
}

/// Wraps the in-memory backend and sleeps before selected operations.
struct SlowBackend {
    inner: Arc<InMemoryWalletBackend>,
    delays: Delays,
}

#[async_trait]
impl WalletBackend for SlowBackend {
    async fn create(&self, name: &str, passphrase: &Passphrase) -> Result<(), WalletError> {
        self.inner.create(name, passphrase).await
    }

    async fn open(
        &self,
        name: &str,
        passphrase: &Passphrase,
    ) -> Result<Box<dyn OpenWallet>, WalletError> {
        tokio::time::sleep(self.delays.open).await;
        let inner = self.inner.open(name, passphrase).await?;
        Ok(Box::new(SlowWallet {
            inner,
            delays: self.delays,
        }))
    }

    async fn delete(&self, name: &str, passphrase: &Passphrase) -> Result<(), WalletError> {
        self.inner.delete(name, passphrase).await
    }
}

struct SlowWallet {
    inner: Box<dyn OpenWallet>,
    delays: Delays,
}

#[async_trait]
impl OpenWallet for SlowWallet {
    async fn create_and_store_my_did(
        &mut self,
        seed: Option<[u8; 32]>,
    ) -> Result<DidInfo, WalletError> {
        self.inner.create_and_store_my_did(seed).await
    }

    async fn key_for_local_did(&self, did: &str) -> Result<Verkey, WalletError> {
        self.inner.key_for_local_did(did).await
    }

    async fn sign(&self, verkey: &str, message: &[u8]) -> Result<Vec<u8>, WalletError> {
        tokio::time::sleep(self.delays.sign).await;
        self.inner.sign(verkey, message).await
    }

    async fn verify(
        &self,
        verkey: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, WalletError> {
        self.inner.verify(verkey, message, signature).await
    }

    async fn pack_message(
        &self,
        message: &[u8],
        recipient_verkey: &str,
        sender_verkey: &str,
    ) -> Result<Vec<u8>, WalletError> {
        self.inner
            .pack_message(message, recipient_verkey, sender_verkey)
            .await
    }

    async fn anon_pack_message(
        &self,
        message: &[u8],
        recipient_verkey: &str,
    ) -> Result<Vec<u8>, WalletError> {
        self.inner.anon_pack_message(message, recipient_verkey).await
    }

    async fn unpack_message(&self, payload: &[u8]) -> Result<UnpackedMessage, WalletError> {
        self.inner.unpack_message(payload).await
    }

    async fn create_pairwise(
        &mut self,
        their_did: &str,
        their_verkey: &str,
        my_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError> {
        self.inner
            .create_pairwise(their_did, their_verkey, my_did, metadata)
            .await
    }

    async fn list_pairwise(&self) -> Result<Vec<PairwiseConnection>, WalletError> {
        self.inner.list_pairwise().await
    }

    async fn get_pairwise(&self, their_did: &str) -> Result<PairwiseConnection, WalletError> {
        self.inner.get_pairwise(their_did).await
    }

    async fn set_pairwise_metadata(
        &mut self,
        their_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError> {
        self.inner.set_pairwise_metadata(their_did, metadata).await
    }

    async fn close(self: Box<Self>) -> Result<(), WalletError> {
        tokio::time::sleep(self.delays.close).await;
        self.inner.close().await
    }
}

fn fast_config() -> GatewayConfig {
    GatewayConfig::default()
        .with_request_timeout(Duration::from_millis(100))
        .with_lifecycle_timeout(Duration::from_millis(200))
}

fn gateway_with(delays: Delays) -> (Arc<WalletGateway>, Arc<InMemoryWalletBackend>) {
    let memory = Arc::new(InMemoryWalletBackend::new());
    let backend = SlowBackend {
        inner: memory.clone(),
        delays,
    };
    (
        Arc::new(WalletGateway::new(Arc::new(backend), fast_config())),
        memory,
    )
}

async fn created(gateway: &WalletGateway, name: &str) -> WalletHandle {
    let handle = WalletHandle::new(name, format!("{name}-pass"));
    gateway.create(&handle).await.unwrap();
    handle
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_concurrent_ensure_open_opens_once() {
    let (gateway, memory) = gateway_with(Delays {
        open: Duration::from_millis(30),
        ..Delays::default()
    });
    let handle = created(&gateway, "alice").await;

    let mut tasks = Vec::new();
    for _ in 0..10 {
        let gateway = gateway.clone();
        let handle = handle.clone();
        tasks.push(tokio::spawn(
            async move { gateway.ensure_open(&handle).await },
        ));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(memory.open_count(), 1);
    assert_eq!(gateway.stats().opens.load(Ordering::Relaxed), 1);
    assert!(gateway.is_open("alice").await);
}

#[tokio::test]
async fn test_close_twice_succeeds() {
    let (gateway, memory) = gateway_with(Delays::default());
    let handle = created(&gateway, "alice").await;
    gateway.ensure_open(&handle).await.unwrap();

    gateway.close(&handle).await.unwrap();
    gateway.close(&handle).await.unwrap();

    assert!(!gateway.is_open("alice").await);
    assert!(!memory.is_held("alice"));
}

#[tokio::test]
async fn test_close_never_opened_wallet_succeeds() {
    let (gateway, _) = gateway_with(Delays::default());
    let handle = WalletHandle::new("ghost", "pw");

    assert!(gateway.close(&handle).await.is_ok());
}

#[tokio::test]
async fn test_reopen_after_close() {
    let (gateway, memory) = gateway_with(Delays::default());
    let handle = created(&gateway, "alice").await;

    let did = gateway.create_and_store_my_did(&handle, None).await.unwrap();
    gateway.close(&handle).await.unwrap();
    let verkey = gateway.key_for_local_did(&handle, &did.did).await.unwrap();

    assert_eq!(verkey, did.verkey);
    assert_eq!(memory.open_count(), 2);
}

#[tokio::test]
async fn test_create_existing_wallet_fails() {
    let (gateway, _) = gateway_with(Delays::default());
    let handle = created(&gateway, "alice").await;

    assert!(matches!(
        gateway.create(&handle).await,
        Err(WalletError::WalletAlreadyExists(_))
    ));
}

#[tokio::test]
async fn test_unknown_wallet_reports_not_found() {
    let (gateway, _) = gateway_with(Delays::default());
    let handle = WalletHandle::new("nobody", "pw");

    assert!(matches!(
        gateway.list_pairwise(&handle).await,
        Err(WalletError::WalletNotFound(_))
    ));
}

#[tokio::test]
async fn test_wrong_passphrase_against_open_wallet_is_denied() {
    let (gateway, _) = gateway_with(Delays::default());
    let handle = created(&gateway, "alice").await;
    gateway.ensure_open(&handle).await.unwrap();

    let intruder = WalletHandle::new("alice", "guess");
    assert!(matches!(
        gateway.list_pairwise(&intruder).await,
        Err(WalletError::AccessDenied(_))
    ));
    assert!(matches!(
        gateway.close(&intruder).await,
        Err(WalletError::AccessDenied(_))
    ));
    assert!(gateway.is_open("alice").await);
}

// =============================================================================
// Timeouts
// =============================================================================

#[tokio::test]
async fn test_slow_open_times_out() {
    let (gateway, _) = gateway_with(Delays {
        open: Duration::from_secs(5),
        ..Delays::default()
    });
    let handle = created(&gateway, "alice").await;

    let result = gateway.ensure_open(&handle).await;

    assert!(matches!(
        result,
        Err(WalletError::AgentTimeout { ref operation, timeout_ms: 200 }) if operation == "open"
    ));
    assert!(!gateway.is_open("alice").await);
}

#[tokio::test]
async fn test_slow_request_times_out_and_worker_survives() {
    let (gateway, _) = gateway_with(Delays {
        sign: Duration::from_millis(300),
        ..Delays::default()
    });
    let handle = created(&gateway, "alice").await;
    let did = gateway.create_and_store_my_did(&handle, None).await.unwrap();

    let result = gateway.sign(&handle, &did.verkey, b"payload").await;
    assert!(matches!(
        result,
        Err(WalletError::AgentTimeout { ref operation, .. }) if operation == "sign"
    ));
    assert_eq!(gateway.stats().timeouts.load(Ordering::Relaxed), 1);

    // The worker is still serving once the slow call drains
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        gateway.key_for_local_did(&handle, &did.did).await.unwrap(),
        did.verkey
    );
}

#[tokio::test]
async fn test_close_timeout_force_releases_worker() {
    let (gateway, memory) = gateway_with(Delays {
        close: Duration::from_secs(5),
        ..Delays::default()
    });
    let handle = created(&gateway, "alice").await;
    gateway.ensure_open(&handle).await.unwrap();

    let result = gateway.close(&handle).await;

    assert!(matches!(result, Err(WalletError::AgentTimeout { .. })));
    assert_eq!(gateway.stats().forced_releases.load(Ordering::Relaxed), 1);
    assert!(!gateway.is_open("alice").await);
    assert!(!memory.is_held("alice"));
}

#[tokio::test]
async fn test_destroy_tolerates_close_timeout() {
    let (gateway, memory) = gateway_with(Delays {
        close: Duration::from_secs(5),
        ..Delays::default()
    });
    let handle = created(&gateway, "alice").await;
    gateway.ensure_open(&handle).await.unwrap();

    gateway.destroy(&handle).await.unwrap();

    assert!(!memory.exists("alice"));
}

#[tokio::test]
async fn test_destroy_propagates_delete_failure() {
    let (gateway, _) = gateway_with(Delays::default());
    let handle = WalletHandle::new("never-created", "pw");

    assert!(matches!(
        gateway.destroy(&handle).await,
        Err(WalletError::WalletNotFound(_))
    ));
}

// =============================================================================
// Data operations
// =============================================================================

#[tokio::test]
async fn test_pairwise_through_gateway() {
    let (gateway, _) = gateway_with(Delays::default());
    let alice = created(&gateway, "alice").await;
    let bob = created(&gateway, "bob").await;

    let a = gateway.create_and_store_my_did(&alice, None).await.unwrap();
    let b = gateway.create_and_store_my_did(&bob, None).await.unwrap();

    let packed = gateway
        .pack_message(&alice, b"hello", &b.verkey, &a.verkey)
        .await
        .unwrap();
    let unpacked = gateway.unpack_message(&bob, &packed).await.unwrap();
    assert_eq!(unpacked.message, b"hello");
    assert_eq!(unpacked.sender_verkey, Some(a.verkey.clone()));

    let anonymous = gateway
        .anon_pack_message(&alice, b"who am i", &b.verkey)
        .await
        .unwrap();
    let unpacked = gateway.unpack_message(&bob, &anonymous).await.unwrap();
    assert_eq!(unpacked.message, b"who am i");
    assert_eq!(unpacked.sender_verkey, None);

    gateway
        .create_pairwise(&bob, &a.did, &a.verkey, &b.did, Metadata::new())
        .await
        .unwrap();
    let record = gateway.get_pairwise(&bob, &a.did).await.unwrap();
    assert_eq!(record.my_did, b.did);
    assert_eq!(gateway.list_pairwise(&alice).await.unwrap().len(), 0);
    assert_eq!(gateway.list_pairwise(&bob).await.unwrap().len(), 1);

    let signature = gateway.sign(&alice, &a.verkey, b"data").await.unwrap();
    assert!(gateway
        .verify(&bob, &a.verkey, b"data", &signature)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_shutdown_closes_all_wallets() {
    let (gateway, memory) = gateway_with(Delays::default());
    let alice = created(&gateway, "alice").await;
    let bob = created(&gateway, "bob").await;
    gateway.ensure_open(&alice).await.unwrap();
    gateway.ensure_open(&bob).await.unwrap();

    gateway.shutdown().await;

    assert!(!gateway.is_open("alice").await);
    assert!(!gateway.is_open("bob").await);
    assert!(!memory.is_held("alice"));
    assert!(!memory.is_held("bob"));
    assert_eq!(gateway.stats().closes.load(Ordering::Relaxed), 2);
}
