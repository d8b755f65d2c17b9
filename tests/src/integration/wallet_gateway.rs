//! # Wallet Gateway Tests
//!
//! Lifecycle races and cleanup paths of the gateway over the in-memory
//! backend.

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use ag_01_wallet_gateway::{GatewayConfig, InMemoryWalletBackend, WalletGateway};

#[cfg(test)]
use shared_types::{WalletError, WalletHandle};

#[cfg(test)]
fn gateway() -> (Arc<InMemoryWalletBackend>, Arc<WalletGateway>) {
    let backend = Arc::new(InMemoryWalletBackend::new());
    let gateway = Arc::new(WalletGateway::new(backend.clone(), GatewayConfig::default()));
    (backend, gateway)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;

    #[tokio::test]
    async fn test_concurrent_ensure_open_opens_once() {
        let (backend, gateway) = gateway();
        let handle = WalletHandle::new("alice", "pass");
        gateway.create(&handle).await.unwrap();

        let tasks = (0..16).map(|_| {
            let gateway = Arc::clone(&gateway);
            let handle = handle.clone();
            tokio::spawn(async move { gateway.ensure_open(&handle).await })
        });
        let results = join_all(tasks).await;

        assert!(results.into_iter().all(|joined| joined.unwrap().is_ok()));
        assert_eq!(backend.open_count(), 1);
        assert!(gateway.is_open("alice").await);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let (backend, gateway) = gateway();
        let handle = WalletHandle::new("alice", "pass");
        gateway.create(&handle).await.unwrap();
        gateway.ensure_open(&handle).await.unwrap();

        gateway.close(&handle).await.unwrap();
        gateway.close(&handle).await.unwrap();

        assert!(!gateway.is_open("alice").await);
        assert!(!backend.is_held("alice"));
    }

    #[tokio::test]
    async fn test_data_calls_reopen_after_close() {
        let (backend, gateway) = gateway();
        let handle = WalletHandle::new("alice", "pass");
        gateway.create(&handle).await.unwrap();
        let did = gateway.create_and_store_my_did(&handle, None).await.unwrap();

        gateway.close(&handle).await.unwrap();
        let verkey = gateway.key_for_local_did(&handle, &did.did).await.unwrap();

        assert_eq!(verkey, did.verkey);
        assert_eq!(backend.open_count(), 2);
    }

    #[tokio::test]
    async fn test_destroy_removes_wallet() {
        let (backend, gateway) = gateway();
        let handle = WalletHandle::new("alice", "pass");
        gateway.create(&handle).await.unwrap();
        gateway.ensure_open(&handle).await.unwrap();

        gateway.destroy(&handle).await.unwrap();

        assert!(!backend.exists("alice"));
        assert!(matches!(
            gateway.ensure_open(&handle).await,
            Err(WalletError::WalletNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_wallets_are_isolated() {
        let (_, gateway) = gateway();
        let alice = WalletHandle::new("alice", "pass");
        let bob = WalletHandle::new("bob", "pass");
        gateway.create(&alice).await.unwrap();
        gateway.create(&bob).await.unwrap();

        let did = gateway.create_and_store_my_did(&alice, None).await.unwrap();

        assert!(matches!(
            gateway.key_for_local_did(&bob, &did.did).await,
            Err(WalletError::WalletItemNotFound(_))
        ));
        assert!(gateway.list_pairwise(&bob).await.unwrap().is_empty());
    }
}
