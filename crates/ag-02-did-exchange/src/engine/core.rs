//! Engine: instance registry, serialization and message plumbing.

use super::machine::{InboundMessage, MachineContext, OutboundMessage, StateMachine};
use crate::domain::{EngineConfig, ProtocolError};
use crate::ports::WalletPort;
use parking_lot::Mutex;
use shared_bus::ChannelBus;
use shared_types::{WalletHandle, PLAINTEXT_CONTENT_TYPE, WIRE_CONTENT_TYPE};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Non-error outcome of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// The machine advanced and expects more messages.
    Pending,
    /// The handshake completed; the id is now terminal.
    Done,
}

/// Builds a machine for an id seen for the first time.
type Factory<M> = Box<dyn Fn(&str) -> M + Send + Sync>;

struct Instance<M> {
    machine: M,
    expires_at: Instant,
    finished: bool,
}

type Slot<M> = Arc<tokio::sync::Mutex<Instance<M>>>;

/// Runs many instances of one machine type.
///
/// Each instance sits behind its own async mutex, so invocations for one id
/// queue in arrival order while different ids proceed concurrently.
pub struct StateMachineEngine<M: StateMachine> {
    wallet: Arc<dyn WalletPort>,
    channels: Arc<dyn ChannelBus>,
    config: EngineConfig,
    factory: Factory<M>,
    instances: Mutex<HashMap<String, Slot<M>>>,
    /// Recently finished ids and when they finished.
    tombstones: Mutex<HashMap<String, Instant>>,
    /// Ids whose tombstone was swept. Never handed to the factory again.
    retired: Mutex<HashSet<Box<str>>>,
}

impl<M: StateMachine> StateMachineEngine<M> {
    /// Create an engine; `factory` builds machines for new ids.
    pub fn new(
        wallet: Arc<dyn WalletPort>,
        channels: Arc<dyn ChannelBus>,
        config: EngineConfig,
        factory: impl Fn(&str) -> M + Send + Sync + 'static,
    ) -> Self {
        Self {
            wallet,
            channels,
            config,
            factory: Box::new(factory),
            instances: Mutex::new(HashMap::new()),
            tombstones: Mutex::new(HashMap::new()),
            retired: Mutex::new(HashSet::new()),
        }
    }

    /// Register a machine built elsewhere (e.g. one that already minted an
    /// invitation).
    ///
    /// # Errors
    /// `MachineIsDone` if the id is terminal, `DuplicateInstance` if active.
    pub fn insert(&self, machine: M) -> Result<(), ProtocolError> {
        let id = machine.id().to_string();
        if self.is_done(&id) {
            return Err(ProtocolError::MachineIsDone(id));
        }

        let mut instances = self.instances.lock();
        if instances.contains_key(&id) {
            return Err(ProtocolError::DuplicateInstance(id));
        }
        instances.insert(id, Arc::new(tokio::sync::Mutex::new(self.instance(machine))));
        Ok(())
    }

    /// Whether `id` is tracked and unfinished.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.instances.lock().contains_key(id)
    }

    /// Whether `id` finished or was aborted, at any point in the past.
    #[must_use]
    pub fn is_done(&self, id: &str) -> bool {
        self.has_tombstone(id) || self.retired.lock().contains(id)
    }

    /// Whether `id` finished within the last `tombstone_ttl`.
    #[must_use]
    pub fn has_tombstone(&self, id: &str) -> bool {
        self.tombstones.lock().contains_key(id)
    }

    /// Number of tracked instances.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.instances.lock().len()
    }

    /// Current state of `id`, unless it is mid-transition or unknown.
    #[must_use]
    pub fn state_of(&self, id: &str) -> Option<&'static str> {
        let slot = self.instances.lock().get(id).cloned()?;
        let instance = slot.try_lock().ok()?;
        Some(instance.machine.state())
    }

    fn instance(&self, machine: M) -> Instance<M> {
        Instance {
            machine,
            expires_at: Instant::now() + self.config.instance_ttl,
            finished: false,
        }
    }

    /// Look up `id`, creating it on first sight.
    fn slot(&self, id: &str) -> Result<Slot<M>, ProtocolError> {
        if self.is_done(id) {
            return Err(ProtocolError::MachineIsDone(id.to_string()));
        }

        let mut instances = self.instances.lock();
        if let Some(slot) = instances.get(id) {
            return Ok(slot.clone());
        }

        debug!(instance_id = %id, "Creating state machine instance");
        let slot = Arc::new(tokio::sync::Mutex::new(self.instance((self.factory)(id))));
        instances.insert(id.to_string(), slot.clone());
        Ok(slot)
    }

    /// Stop tracking `id` and remember it as terminal.
    fn retire(&self, id: &str, slot: &Slot<M>) {
        let mut instances = self.instances.lock();
        if instances.get(id).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            instances.remove(id);
        }
        drop(instances);
        self.tombstones.lock().insert(id.to_string(), Instant::now());
    }

    /// Feed a raw inbound message to instance `id`.
    ///
    /// Wire payloads are unpacked through the wallet first; plaintext JSON
    /// is taken as is. The unpacked body decides the message type, not the
    /// content type tag.
    ///
    /// # Errors
    /// `MachineIsDone` for terminal ids, `ProtocolViolation` for messages
    /// the current state does not accept, or whatever aborted the transition.
    pub async fn invoke(
        &self,
        id: &str,
        content_type: &str,
        payload: &[u8],
        handle: &WalletHandle,
    ) -> Result<Invocation, ProtocolError> {
        let slot = self.slot(id)?;
        // Hold the instance from the start so decoding cannot reorder messages
        let mut instance = slot.lock().await;
        if instance.finished {
            return Err(ProtocolError::MachineIsDone(id.to_string()));
        }

        let inbound = self.decode(content_type, payload, handle).await?;
        self.advance(id, &slot, &mut instance, inbound, handle).await
    }

    /// Feed an already-decoded message to instance `id`.
    pub async fn dispatch(
        &self,
        id: &str,
        inbound: InboundMessage<M::Message>,
        handle: &WalletHandle,
    ) -> Result<Invocation, ProtocolError> {
        let slot = self.slot(id)?;
        let mut instance = slot.lock().await;
        if instance.finished {
            return Err(ProtocolError::MachineIsDone(id.to_string()));
        }
        self.advance(id, &slot, &mut instance, inbound, handle).await
    }

    async fn decode(
        &self,
        content_type: &str,
        payload: &[u8],
        handle: &WalletHandle,
    ) -> Result<InboundMessage<M::Message>, ProtocolError> {
        match content_type {
            WIRE_CONTENT_TYPE => {
                let unpacked = self.wallet.unpack_message(handle, payload).await?;
                let message = serde_json::from_slice(&unpacked.message)?;
                Ok(InboundMessage::packed(
                    message,
                    unpacked.sender_verkey,
                    unpacked.recipient_verkey,
                ))
            }
            PLAINTEXT_CONTENT_TYPE => Ok(InboundMessage::plaintext(serde_json::from_slice(
                payload,
            )?)),
            other => Err(ProtocolError::MalformedMessage(format!(
                "unsupported content type {other}"
            ))),
        }
    }

    async fn advance(
        &self,
        id: &str,
        slot: &Slot<M>,
        instance: &mut Instance<M>,
        inbound: InboundMessage<M::Message>,
        handle: &WalletHandle,
    ) -> Result<Invocation, ProtocolError> {
        if Instant::now() >= instance.expires_at {
            instance.finished = true;
            self.retire(id, slot);
            warn!(instance_id = %id, "Handshake expired");
            return Err(ProtocolError::Expired(id.to_string()));
        }

        let from = instance.machine.state();
        let ctx = MachineContext {
            wallet: self.wallet.as_ref(),
            handle,
        };

        let outcome = match instance.machine.transition(inbound, &ctx).await {
            Ok(transition) => match transition.outbound {
                Some(outbound) => self.send(handle, outbound).await.map(|()| transition.done),
                None => Ok(transition.done),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(true) => {
                instance.finished = true;
                self.retire(id, slot);
                info!(instance_id = %id, state = instance.machine.state(), "Handshake complete");
                Ok(Invocation::Done)
            }
            Ok(false) => {
                debug!(instance_id = %id, from, to = instance.machine.state(), "Transition applied");
                Ok(Invocation::Pending)
            }
            Err(e) if e.leaves_state_unchanged() => {
                warn!(instance_id = %id, state = from, error = %e, "Message rejected");
                Err(e)
            }
            Err(e) => {
                instance.finished = true;
                self.retire(id, slot);
                error!(instance_id = %id, state = from, error = %e, "Handshake aborted");
                Err(e)
            }
        }
    }

    /// Pack `outbound` and hand it to the channel layer.
    async fn send(
        &self,
        handle: &WalletHandle,
        outbound: OutboundMessage<M::Message>,
    ) -> Result<(), ProtocolError> {
        let body = serde_json::to_vec(&outbound.message)?;
        let packed = self
            .wallet
            .pack_message(
                handle,
                &body,
                &outbound.recipient_verkey,
                &outbound.sender_verkey,
            )
            .await?;
        self.channels
            .write(&outbound.endpoint, WIRE_CONTENT_TYPE, packed)
            .await;
        Ok(())
    }

    /// Drop expired instances and fold stale tombstones into the retired set.
    ///
    /// Instances busy in a transition are skipped until the next sweep.
    /// Returns how many instances were evicted.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut evicted = Vec::new();

        {
            let mut instances = self.instances.lock();
            instances.retain(|id, slot| {
                let Ok(mut instance) = slot.try_lock() else {
                    return true;
                };
                if now < instance.expires_at {
                    return true;
                }
                instance.finished = true;
                evicted.push(id.clone());
                false
            });
        }

        let mut tombstones = self.tombstones.lock();
        for id in &evicted {
            tombstones.insert(id.clone(), now);
        }
        let ttl = self.config.tombstone_ttl;
        let mut retired = self.retired.lock();
        tombstones.retain(|id, finished_at| {
            if now.duration_since(*finished_at) < ttl {
                return true;
            }
            retired.insert(id.as_str().into());
            false
        });
        drop(retired);
        drop(tombstones);

        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted expired handshakes");
        }
        evicted.len()
    }
}
