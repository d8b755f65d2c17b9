//! Invitee side of the handshake.

use super::{pairwise_metadata, STATUS_COMPLETE};
use crate::domain::{
    Ack, Connection, ConnectionRequest, ConnectionResponse, DidExchangeMessage, InviteeState,
    MachineConfig, ProtocolError, SignatureField,
};
use crate::engine::{InboundMessage, MachineContext, OutboundMessage, StateMachine, Transition};
use async_trait::async_trait;
use shared_crypto::{did_matches_verkey, Ed25519PublicKey};
use shared_types::{DidInfo, Invitation, Verkey};
use uuid::Uuid;

/// `START → INVITE_RECEIVED → REQUEST_SENT → RESPONSE_RECEIVED`.
///
/// `INVITE_RECEIVED` holds while the request is built; a wallet failure
/// there aborts the instance in that state.
///
/// The instance id doubles as the request `@id`, so the inviter's
/// response threads straight back to this machine.
#[derive(Debug)]
pub struct InviteeMachine {
    id: String,
    config: MachineConfig,
    state: InviteeState,
    invitation: Option<Invitation>,
    mine: Option<DidInfo>,
}

impl InviteeMachine {
    /// Machine `id` in `START`.
    pub fn new(id: impl Into<String>, config: MachineConfig) -> Self {
        Self {
            id: id.into(),
            config,
            state: InviteeState::Start,
            invitation: None,
            mine: None,
        }
    }

    /// Current state.
    #[must_use]
    pub fn current(&self) -> InviteeState {
        self.state
    }

    /// Local DID minted for this relationship.
    #[must_use]
    pub fn my_did(&self) -> Option<&str> {
        self.mine.as_ref().map(|mine| mine.did.as_str())
    }

    async fn on_invitation(
        &mut self,
        invitation: Invitation,
        ctx: &MachineContext<'_>,
    ) -> Result<Transition<DidExchangeMessage>, ProtocolError> {
        let key = invitation
            .connection_key()
            .ok_or_else(|| ProtocolError::InvalidInvitation("no recipient key".into()))?
            .to_string();
        Ed25519PublicKey::from_verkey(&key)
            .map_err(|e| ProtocolError::InvalidInvitation(format!("recipient key: {e}")))?;
        if invitation.service_endpoint.is_empty() {
            return Err(ProtocolError::InvalidInvitation("no service endpoint".into()));
        }
        self.state = InviteeState::InviteReceived;

        let mine = ctx.wallet.create_and_store_my_did(ctx.handle).await?;
        let request = ConnectionRequest {
            id: self.id.clone(),
            label: self.config.label.clone(),
            connection: Connection::new(&mine.did, &mine.verkey, &self.config.endpoint),
        };
        let outbound = OutboundMessage {
            endpoint: invitation.service_endpoint.clone(),
            message: DidExchangeMessage::Request(request),
            recipient_verkey: key,
            sender_verkey: mine.verkey.clone(),
        };

        self.invitation = Some(invitation);
        self.mine = Some(mine);
        self.state = InviteeState::RequestSent;
        Ok(Transition::send(outbound))
    }

    async fn on_response(
        &mut self,
        response: ConnectionResponse,
        sender: Option<Verkey>,
        ctx: &MachineContext<'_>,
    ) -> Result<Transition<DidExchangeMessage>, ProtocolError> {
        if response.thread.thid != self.id {
            return Err(ProtocolError::MalformedMessage(format!(
                "response for thread {}",
                response.thread.thid
            )));
        }
        let Some(sender) = sender else {
            return Err(ProtocolError::MalformedMessage(
                "connection response must arrive authcrypted".into(),
            ));
        };
        let (Some(invitation), Some(mine)) = (self.invitation.as_ref(), self.mine.as_ref()) else {
            return Err(ProtocolError::violation(self.state.as_str(), "response"));
        };

        let signer = &response.connection_sig.signer;
        if invitation.connection_key() != Some(signer.as_str()) {
            return Err(ProtocolError::SignatureInvalid(format!(
                "response signed by {signer}, not the invitation key"
            )));
        }
        let (signed, signature) = response.connection_sig.decode()?;
        if !ctx
            .wallet
            .verify(ctx.handle, signer, &signed, &signature)
            .await?
        {
            return Err(ProtocolError::SignatureInvalid(
                "connection~sig does not verify".into(),
            ));
        }

        let connection = SignatureField::connection(&signed)?;
        let their_verkey = connection
            .did_doc
            .verkey()
            .ok_or_else(|| ProtocolError::SignatureInvalid("signed DIDDoc lists no key".into()))?
            .to_string();
        if !did_matches_verkey(&connection.did, &their_verkey) || their_verkey != sender {
            return Err(ProtocolError::SignatureInvalid(
                "response not sent by the signed DID".into(),
            ));
        }
        let their_endpoint = connection
            .did_doc
            .endpoint()
            .ok_or_else(|| ProtocolError::MalformedMessage("DIDDoc lists no endpoint".into()))?
            .to_string();

        let metadata = pairwise_metadata(&invitation.label, &their_endpoint, STATUS_COMPLETE, &self.id);
        ctx.wallet
            .create_pairwise(ctx.handle, &connection.did, &their_verkey, &mine.did, metadata)
            .await?;

        let outbound = OutboundMessage {
            endpoint: their_endpoint,
            message: DidExchangeMessage::Ack(Ack::ok(Uuid::new_v4().to_string(), &self.id)),
            recipient_verkey: their_verkey,
            sender_verkey: mine.verkey.clone(),
        };
        self.state = InviteeState::ResponseReceived;
        Ok(Transition::finish_with(outbound))
    }
}

#[async_trait]
impl StateMachine for InviteeMachine {
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
        match (self.state, inbound.message) {
            (InviteeState::Start, DidExchangeMessage::Invitation(invitation)) => {
                self.on_invitation(invitation, ctx).await
            }
            (InviteeState::RequestSent, DidExchangeMessage::Response(response)) => {
                self.on_response(response, inbound.sender_verkey, ctx)
                    .await
            }
            (state, other) => Err(ProtocolError::violation(state.as_str(), other.kind())),
        }
    }
}
