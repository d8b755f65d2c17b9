//! One party's view of the handshake: both roles, one wallet port, routing.

use super::invitation::{invite_link_fragment, parse_invite_link};
use super::{InviteeMachine, InviterMachine};
use crate::domain::{DidExchangeMessage, EngineConfig, MachineConfig, ProtocolError};
use crate::engine::{InboundMessage, Invocation, StateMachineEngine};
use crate::ports::WalletPort;
use parking_lot::Mutex;
use shared_bus::ChannelBus;
use shared_types::{Invitation, Verkey, WalletHandle};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Routes inbound wire messages to the right machine.
///
/// - requests by the invitation key they were packed for
/// - responses by thread id to the invitee engine
/// - acks by thread id to the inviter that answered the request
pub struct DidExchangeAgent {
    config: MachineConfig,
    wallet: Arc<dyn WalletPort>,
    inviters: StateMachineEngine<InviterMachine>,
    invitees: StateMachineEngine<InviteeMachine>,
    /// Invitation key to inviter instance id.
    routes: Mutex<HashMap<Verkey, String>>,
    /// Request thread id to inviter instance id.
    threads: Mutex<HashMap<String, String>>,
}

impl DidExchangeAgent {
    /// Agent labelled `config.label`, receiving on `config.endpoint`.
    pub fn new(
        config: MachineConfig,
        wallet: Arc<dyn WalletPort>,
        channels: Arc<dyn ChannelBus>,
        engine_config: EngineConfig,
    ) -> Self {
        let inviter_config = config.clone();
        let invitee_config = config.clone();
        Self {
            inviters: StateMachineEngine::new(
                wallet.clone(),
                channels.clone(),
                engine_config,
                move |id| InviterMachine::new(id, inviter_config.clone()),
            ),
            invitees: StateMachineEngine::new(
                wallet.clone(),
                channels,
                engine_config,
                move |id| InviteeMachine::new(id, invitee_config.clone()),
            ),
            config,
            wallet,
            routes: Mutex::new(HashMap::new()),
            threads: Mutex::new(HashMap::new()),
        }
    }

    /// Label and endpoint.
    #[must_use]
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Inviter-side engine.
    #[must_use]
    pub fn inviters(&self) -> &StateMachineEngine<InviterMachine> {
        &self.inviters
    }

    /// Invitee-side engine.
    #[must_use]
    pub fn invitees(&self) -> &StateMachineEngine<InviteeMachine> {
        &self.invitees
    }

    /// Mint an invitation backed by a fresh inviter machine.
    ///
    /// Returns the `?c_i=` fragment and the invitation.
    pub async fn generate_invite_link(
        &self,
        handle: &WalletHandle,
    ) -> Result<(String, Invitation), ProtocolError> {
        let id = Uuid::new_v4().to_string();
        let mut machine = InviterMachine::new(id.clone(), self.config.clone());
        let invitation = machine.invite(self.wallet.as_ref(), handle).await?;
        let fragment = invite_link_fragment(&invitation)?;
        let key = invitation
            .connection_key()
            .ok_or_else(|| ProtocolError::InvalidInvitation("no recipient key".into()))?
            .to_string();

        self.inviters.insert(machine)?;
        self.routes.lock().insert(key, id.clone());
        info!(instance_id = %id, label = %self.config.label, "Invitation issued");
        Ok((fragment, invitation))
    }

    /// Accept an invite link and send the connection request.
    ///
    /// Returns the thread id of the new handshake.
    pub async fn receive_invite_link(
        &self,
        link: &str,
        handle: &WalletHandle,
    ) -> Result<String, ProtocolError> {
        let invitation = parse_invite_link(link)?;
        let id = Uuid::new_v4().to_string();
        debug!(instance_id = %id, inviter = %invitation.label, "Accepting invitation");

        self.invitees
            .dispatch(
                &id,
                InboundMessage::plaintext(DidExchangeMessage::Invitation(invitation)),
                handle,
            )
            .await?;
        Ok(id)
    }

    /// Unpack a wire payload received on our endpoint and advance the
    /// handshake it belongs to.
    pub async fn handle_wired_message(
        &self,
        payload: &[u8],
        handle: &WalletHandle,
    ) -> Result<Invocation, ProtocolError> {
        let unpacked = self.wallet.unpack_message(handle, payload).await?;
        let message: DidExchangeMessage = serde_json::from_slice(&unpacked.message)?;
        debug!(kind = message.kind(), thread = message.thread_id(), "Wire message received");

        let thread_id = message.thread_id().to_string();
        match message {
            DidExchangeMessage::Request(_) => {
                let id = self
                    .routes
                    .lock()
                    .get(&unpacked.recipient_verkey)
                    .cloned()
                    .ok_or_else(|| {
                        ProtocolError::InvalidInvitation(format!(
                            "no invitation for key {}",
                            unpacked.recipient_verkey
                        ))
                    })?;
                let inbound = InboundMessage::packed(
                    message,
                    unpacked.sender_verkey,
                    unpacked.recipient_verkey,
                );
                // Acks must find the route as soon as the response is on the wire
                let routed = match self.threads.lock().entry(thread_id.clone()) {
                    Entry::Occupied(_) => false,
                    Entry::Vacant(entry) => {
                        entry.insert(id.clone());
                        true
                    }
                };
                let outcome = self.inviters.dispatch(&id, inbound, handle).await;
                if outcome.is_err() && routed && !self.inviters.is_done(&id) {
                    self.threads.lock().remove(&thread_id);
                }
                outcome
            }
            DidExchangeMessage::Response(_) => {
                if !self.invitees.contains(&thread_id) && !self.invitees.is_done(&thread_id) {
                    return Err(ProtocolError::MalformedMessage(format!(
                        "response for unknown thread {thread_id}"
                    )));
                }
                let inbound = InboundMessage::packed(
                    message,
                    unpacked.sender_verkey,
                    unpacked.recipient_verkey,
                );
                self.invitees.dispatch(&thread_id, inbound, handle).await
            }
            DidExchangeMessage::Ack(_) => {
                let id = self.threads.lock().get(&thread_id).cloned().ok_or_else(|| {
                    ProtocolError::MalformedMessage(format!("ack for unknown thread {thread_id}"))
                })?;
                let inbound = InboundMessage::packed(
                    message,
                    unpacked.sender_verkey,
                    unpacked.recipient_verkey,
                );
                self.inviters.dispatch(&id, inbound, handle).await
            }
            DidExchangeMessage::Invitation(_) => Err(ProtocolError::MalformedMessage(
                "invitations travel out-of-band".into(),
            )),
        }
    }

    /// Sweep both engines, then drop routes to inviters the engine forgot.
    ///
    /// Routes to finished inviters stay until their tombstone expires, so
    /// replays keep failing with `MachineIsDone`.
    pub fn evict_expired(&self) -> usize {
        let evicted = self.inviters.evict_expired() + self.invitees.evict_expired();
        let known = |id: &String| self.inviters.contains(id) || self.inviters.has_tombstone(id);
        self.routes.lock().retain(|_, id| known(id));
        self.threads.lock().retain(|_, id| known(id));
        evicted
    }
}
