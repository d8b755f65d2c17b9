//! Inviter side of the handshake.

use super::{pairwise_metadata, unix_timestamp, STATUS_COMPLETE, STATUS_RESPONSE_SENT};
use crate::domain::{
    Connection, ConnectionRequest, ConnectionResponse, DidExchangeMessage, InviterState,
    MachineConfig, ProtocolError, SignatureField, Thread,
};
use crate::engine::{InboundMessage, MachineContext, OutboundMessage, StateMachine, Transition};
use crate::ports::WalletPort;
use crate::protocol::invitation::generate_invite_message;
use async_trait::async_trait;
use serde_json::Value;
use shared_crypto::did_matches_verkey;
use shared_types::{Did, Invitation, Verkey, WalletHandle};
use uuid::Uuid;

/// `START → INVITE_SENT → REQUEST_RECEIVED → RESPONSE_SENT → ACK_RECEIVED`.
///
/// `REQUEST_RECEIVED` holds while the response is built. The pairwise
/// record is stored only once the response is signed.
///
/// A machine created without an invitation (still in `START`) answers a
/// request addressed to any of the wallet's keys and signs with that key.
#[derive(Debug)]
pub struct InviterMachine {
    id: String,
    config: MachineConfig,
    state: InviterState,
    invitation: Option<Invitation>,
    thread_id: Option<String>,
    their_did: Option<Did>,
    my_did: Option<Did>,
}

impl InviterMachine {
    /// Machine `id` in `START`.
    pub fn new(id: impl Into<String>, config: MachineConfig) -> Self {
        Self {
            id: id.into(),
            config,
            state: InviterState::Start,
            invitation: None,
            thread_id: None,
            their_did: None,
            my_did: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn current(&self) -> InviterState {
        self.state
    }

    /// Invitation this machine answers, once minted.
    #[must_use]
    pub fn invitation(&self) -> Option<&Invitation> {
        self.invitation.as_ref()
    }

    /// Remote DID once the request was accepted.
    #[must_use]
    pub fn their_did(&self) -> Option<&str> {
        self.their_did.as_deref()
    }

    /// Local DID minted for this relationship.
    #[must_use]
    pub fn my_did(&self) -> Option<&str> {
        self.my_did.as_deref()
    }

    /// Locally triggered `START → INVITE_SENT`.
    pub async fn invite(
        &mut self,
        wallet: &dyn WalletPort,
        handle: &WalletHandle,
    ) -> Result<Invitation, ProtocolError> {
        if self.state != InviterState::Start {
            return Err(ProtocolError::violation(self.state.as_str(), "invite"));
        }

        let invitation =
            generate_invite_message(wallet, handle, &self.config.label, &self.config.endpoint)
                .await?;
        self.invitation = Some(invitation.clone());
        self.state = InviterState::InviteSent;
        Ok(invitation)
    }

    async fn on_request(
        &mut self,
        request: ConnectionRequest,
        sender: Option<Verkey>,
        recipient: Option<Verkey>,
        ctx: &MachineContext<'_>,
    ) -> Result<Transition<DidExchangeMessage>, ProtocolError> {
        let (Some(sender), Some(recipient)) = (sender, recipient) else {
            return Err(ProtocolError::MalformedMessage(
                "connection request must arrive authcrypted".into(),
            ));
        };

        let signing_key = match self.invitation.as_ref() {
            Some(invitation) => match invitation.connection_key() {
                Some(key) if key == recipient => key.to_string(),
                _ => {
                    return Err(ProtocolError::InvalidInvitation(format!(
                        "request addressed to {recipient}, not to the invitation key"
                    )))
                }
            },
            None => recipient,
        };

        let ConnectionRequest {
            id: thread_id,
            label,
            connection,
        } = request;
        let their_verkey = connection
            .did_doc
            .verkey()
            .ok_or_else(|| ProtocolError::MalformedMessage("DIDDoc lists no key".into()))?
            .to_string();
        if their_verkey != sender {
            return Err(ProtocolError::MalformedMessage(
                "request not packed by the DIDDoc key".into(),
            ));
        }
        if !did_matches_verkey(&connection.did, &their_verkey) {
            return Err(ProtocolError::MalformedMessage(format!(
                "DID {} does not belong to its DIDDoc key",
                connection.did
            )));
        }
        let their_endpoint = connection
            .did_doc
            .endpoint()
            .ok_or_else(|| ProtocolError::MalformedMessage("DIDDoc lists no endpoint".into()))?
            .to_string();

        self.state = InviterState::RequestReceived;

        let mine = ctx.wallet.create_and_store_my_did(ctx.handle).await?;
        let signed = Connection::new(&mine.did, &mine.verkey, &self.config.endpoint);
        let input = SignatureField::signing_input(&signed, unix_timestamp())?;
        let signature = ctx.wallet.sign(ctx.handle, &signing_key, &input).await?;

        let metadata = pairwise_metadata(&label, &their_endpoint, STATUS_RESPONSE_SENT, &thread_id);
        ctx.wallet
            .create_pairwise(ctx.handle, &connection.did, &their_verkey, &mine.did, metadata)
            .await?;
        let response = ConnectionResponse {
            id: Uuid::new_v4().to_string(),
            thread: Thread {
                thid: thread_id.clone(),
            },
            connection_sig: SignatureField::new(&input, &signature, &signing_key),
        };

        self.thread_id = Some(thread_id);
        self.their_did = Some(connection.did);
        self.my_did = Some(mine.did);
        self.state = InviterState::ResponseSent;

        Ok(Transition::send(OutboundMessage {
            endpoint: their_endpoint,
            message: DidExchangeMessage::Response(response),
            recipient_verkey: their_verkey,
            sender_verkey: mine.verkey,
        }))
    }

    async fn on_ack(
        &mut self,
        thid: &str,
        sender: Option<Verkey>,
        ctx: &MachineContext<'_>,
    ) -> Result<Transition<DidExchangeMessage>, ProtocolError> {
        if self.thread_id.as_deref() != Some(thid) {
            return Err(ProtocolError::MalformedMessage(format!(
                "ack for unknown thread {thid}"
            )));
        }
        let Some(sender) = sender else {
            return Err(ProtocolError::MalformedMessage("ack must arrive authcrypted".into()));
        };
        let their_did = self
            .their_did
            .clone()
            .ok_or_else(|| ProtocolError::violation(self.state.as_str(), "ack"))?;

        let pairwise = ctx.wallet.get_pairwise(ctx.handle, &their_did).await?;
        if pairwise.their_verkey != sender {
            return Err(ProtocolError::SignatureInvalid(format!(
                "ack packed by {sender}, expected {}",
                pairwise.their_verkey
            )));
        }

        let mut metadata = pairwise.metadata;
        metadata.insert("status".into(), Value::from(STATUS_COMPLETE));
        ctx.wallet
            .set_pairwise_metadata(ctx.handle, &their_did, metadata)
            .await?;

        self.state = InviterState::AckReceived;
        Ok(Transition::finish())
    }
}

#[async_trait]
impl StateMachine for InviterMachine {
    type Message = DidExchangeMessage;

    fn id(&self) -> &str {
        &self.id
    }

    fn state(&self) -> &'static str {
        self.state.as_str()
    }

    async fn transition(
        &mut self,
        inbound: InboundMessage<DidExchangeMessage>,
        ctx: &MachineContext<'_>,
    ) -> Result<Transition<DidExchangeMessage>, ProtocolError> {
        let InboundMessage {
            message,
            sender_verkey,
            recipient_verkey,
        } = inbound;

        match (self.state, message) {
            (InviterState::Start | InviterState::InviteSent, DidExchangeMessage::Request(request)) => {
                self.on_request(request, sender_verkey, recipient_verkey, ctx)
                    .await
            }
            (InviterState::ResponseSent, DidExchangeMessage::Ack(ack)) => {
                self.on_ack(&ack.thread.thid, sender_verkey, ctx).await
            }
            (state, other) => Err(ProtocolError::violation(state.as_str(), other.kind())),
        }
    }
}
