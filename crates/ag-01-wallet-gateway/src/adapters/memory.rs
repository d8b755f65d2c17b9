//! In-memory wallet backend.
//!
//! Keeps every wallet in process memory, keyed by name. Keys are stored as
//! Ed25519 seeds and zeroized when removed.

use crate::domain::UnpackedMessage;
use crate::ports::{OpenWallet, WalletBackend};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_crypto::{
    anon_pack, pack, unpack, CryptoError, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, PackedEnvelope,
};
use shared_types::{Did, DidInfo, Metadata, PairwiseConnection, Passphrase, Verkey, WalletError};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

type Store = Arc<RwLock<HashMap<String, WalletRecord>>>;

/// Everything one wallet holds.
struct WalletRecord {
    passphrase_digest: [u8; 32],
    keys: HashMap<Verkey, Zeroizing<[u8; 32]>>,
    dids: HashMap<Did, Verkey>,
    pairwise: BTreeMap<Did, PairwiseConnection>,
    held: bool,
}

impl WalletRecord {
    fn new(passphrase: &Passphrase) -> Self {
        Self {
            passphrase_digest: passphrase.digest(),
            keys: HashMap::new(),
            dids: HashMap::new(),
            pairwise: BTreeMap::new(),
            held: false,
        }
    }

    fn check_passphrase(&self, name: &str, passphrase: &Passphrase) -> Result<(), WalletError> {
        if self.passphrase_digest == passphrase.digest() {
            Ok(())
        } else {
            Err(WalletError::AccessDenied(name.to_string()))
        }
    }

    fn keypair(&self, verkey: &str) -> Result<Ed25519KeyPair, WalletError> {
        self.keys
            .get(verkey)
            .map(|seed| Ed25519KeyPair::from_seed(**seed))
            .ok_or_else(|| WalletError::WalletItemNotFound(format!("key {verkey}")))
    }
}

fn crypto_failure(e: CryptoError) -> WalletError {
    WalletError::WalletOperationFailed(e.to_string())
}

/// Wallet backend held entirely in memory.
#[derive(Default)]
pub struct InMemoryWalletBackend {
    store: Store,
    opens: AtomicU64,
}

impl InMemoryWalletBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful opens so far.
    #[must_use]
    pub fn open_count(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    /// Whether a wallet named `name` exists.
    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.store.read().contains_key(name)
    }

    /// Whether `name` is currently opened by someone.
    #[must_use]
    pub fn is_held(&self, name: &str) -> bool {
        self.store.read().get(name).is_some_and(|record| record.held)
    }
}

#[async_trait]
impl WalletBackend for InMemoryWalletBackend {
    async fn create(&self, name: &str, passphrase: &Passphrase) -> Result<(), WalletError> {
        let mut store = self.store.write();
        if store.contains_key(name) {
            return Err(WalletError::WalletAlreadyExists(name.to_string()));
        }
        store.insert(name.to_string(), WalletRecord::new(passphrase));
        Ok(())
    }

    async fn open(
        &self,
        name: &str,
        passphrase: &Passphrase,
    ) -> Result<Box<dyn OpenWallet>, WalletError> {
        let mut store = self.store.write();
        let record = store
            .get_mut(name)
            .ok_or_else(|| WalletError::WalletNotFound(name.to_string()))?;
        record.check_passphrase(name, passphrase)?;
        if record.held {
            return Err(WalletError::WalletOperationFailed(format!(
                "wallet {name} is already open"
            )));
        }
        record.held = true;
        self.opens.fetch_add(1, Ordering::SeqCst);
        debug!(wallet = %name, "In-memory wallet opened");

        Ok(Box::new(MemoryWallet {
            name: name.to_string(),
            store: self.store.clone(),
        }))
    }

    async fn delete(&self, name: &str, passphrase: &Passphrase) -> Result<(), WalletError> {
        let mut store = self.store.write();
        let record = store
            .get(name)
            .ok_or_else(|| WalletError::WalletNotFound(name.to_string()))?;
        record.check_passphrase(name, passphrase)?;
        if record.held {
            return Err(WalletError::WalletOperationFailed(format!(
                "wallet {name} is open"
            )));
        }
        store.remove(name);
        Ok(())
    }
}

/// An opened in-memory wallet. Releases its hold when dropped.
struct MemoryWallet {
    name: String,
    store: Store,
}

impl MemoryWallet {
    fn read<T>(
        &self,
        f: impl FnOnce(&WalletRecord) -> Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        let store = self.store.read();
        let record = store
            .get(&self.name)
            .ok_or_else(|| WalletError::WalletNotFound(self.name.clone()))?;
        f(record)
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut WalletRecord) -> Result<T, WalletError>,
    ) -> Result<T, WalletError> {
        let mut store = self.store.write();
        let record = store
            .get_mut(&self.name)
            .ok_or_else(|| WalletError::WalletNotFound(self.name.clone()))?;
        f(record)
    }
}

impl Drop for MemoryWallet {
    fn drop(&mut self) {
        if let Some(record) = self.store.write().get_mut(&self.name) {
            record.held = false;
        }
    }
}

#[async_trait]
impl OpenWallet for MemoryWallet {
    async fn create_and_store_my_did(
        &mut self,
        seed: Option<[u8; 32]>,
    ) -> Result<DidInfo, WalletError> {
        let keypair = seed.map_or_else(Ed25519KeyPair::generate, Ed25519KeyPair::from_seed);
        let public = keypair.public_key();
        let info = DidInfo {
            did: public.to_did(),
            verkey: public.to_verkey(),
        };

        self.write(|record| {
            record
                .keys
                .insert(info.verkey.clone(), Zeroizing::new(keypair.to_seed()));
            record.dids.insert(info.did.clone(), info.verkey.clone());
            Ok(())
        })?;
        Ok(info)
    }

    async fn key_for_local_did(&self, did: &str) -> Result<Verkey, WalletError> {
        self.read(|record| {
            record
                .dids
                .get(did)
                .or_else(|| record.pairwise.get(did).map(|p| &p.their_verkey))
                .cloned()
                .ok_or_else(|| WalletError::WalletItemNotFound(format!("did {did}")))
        })
    }

    async fn sign(&self, verkey: &str, message: &[u8]) -> Result<Vec<u8>, WalletError> {
        let keypair = self.read(|record| record.keypair(verkey))?;
        Ok(keypair.sign(message).as_bytes().to_vec())
    }

    async fn verify(
        &self,
        verkey: &str,
        message: &[u8],
        signature: &[u8],
    ) -> Result<bool, WalletError> {
        let key = Ed25519PublicKey::from_verkey(verkey).map_err(crypto_failure)?;
        let Ok(signature) = Ed25519Signature::from_slice(signature) else {
            return Ok(false);
        };
        Ok(key.verify(message, &signature).is_ok())
    }

    async fn pack_message(
        &self,
        message: &[u8],
        recipient_verkey: &str,
        sender_verkey: &str,
    ) -> Result<Vec<u8>, WalletError> {
        let sender = self.read(|record| record.keypair(sender_verkey))?;
        let recipient = Ed25519PublicKey::from_verkey(recipient_verkey).map_err(crypto_failure)?;
        pack(message, &sender, &recipient)
            .and_then(|envelope| envelope.to_bytes())
            .map_err(crypto_failure)
    }

    async fn anon_pack_message(
        &self,
        message: &[u8],
        recipient_verkey: &str,
    ) -> Result<Vec<u8>, WalletError> {
        let recipient = Ed25519PublicKey::from_verkey(recipient_verkey).map_err(crypto_failure)?;
        anon_pack(message, &recipient)
            .and_then(|envelope| envelope.to_bytes())
            .map_err(crypto_failure)
    }

    async fn unpack_message(&self, payload: &[u8]) -> Result<UnpackedMessage, WalletError> {
        let envelope = PackedEnvelope::from_bytes(payload).map_err(crypto_failure)?;
        let recipient_verkey = envelope.recipient().to_string();
        let keypair = self.read(|record| record.keypair(&recipient_verkey))?;
        let (message, sender_verkey) = unpack(&envelope, &keypair).map_err(crypto_failure)?;

        Ok(UnpackedMessage {
            message,
            sender_verkey,
            recipient_verkey,
        })
    }

    async fn create_pairwise(
        &mut self,
        their_did: &str,
        their_verkey: &str,
        my_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError> {
        Ed25519PublicKey::from_verkey(their_verkey).map_err(crypto_failure)?;

        self.write(|record| {
            let my_verkey = record
                .dids
                .get(my_did)
                .cloned()
                .ok_or_else(|| WalletError::WalletItemNotFound(format!("did {my_did}")))?;
            if record.pairwise.contains_key(their_did) {
                return Err(WalletError::WalletOperationFailed(format!(
                    "pairwise {their_did} already exists"
                )));
            }
            record.pairwise.insert(
                their_did.to_string(),
                PairwiseConnection {
                    their_did: their_did.to_string(),
                    their_verkey: their_verkey.to_string(),
                    my_did: my_did.to_string(),
                    my_verkey,
                    metadata,
                },
            );
            Ok(())
        })
    }

    async fn list_pairwise(&self) -> Result<Vec<PairwiseConnection>, WalletError> {
        self.read(|record| Ok(record.pairwise.values().cloned().collect()))
    }

    async fn get_pairwise(&self, their_did: &str) -> Result<PairwiseConnection, WalletError> {
        self.read(|record| {
            record
                .pairwise
                .get(their_did)
                .cloned()
                .ok_or_else(|| WalletError::WalletItemNotFound(format!("pairwise {their_did}")))
        })
    }

    async fn set_pairwise_metadata(
        &mut self,
        their_did: &str,
        metadata: Metadata,
    ) -> Result<(), WalletError> {
        self.write(|record| {
            let pairwise = record.pairwise.get_mut(their_did).ok_or_else(|| {
                WalletError::WalletItemNotFound(format!("pairwise {their_did}"))
            })?;
            pairwise.metadata = metadata;
            Ok(())
        })
    }

    async fn close(self: Box<Self>) -> Result<(), WalletError> {
        debug!(wallet = %self.name, "In-memory wallet closed");
        Ok(())
    }
}
