//! The contract between the engine and a protocol machine.

use crate::domain::ProtocolError;
use crate::ports::WalletPort;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{Verkey, WalletHandle};

/// A decoded inbound message.
#[derive(Debug, Clone)]
pub struct InboundMessage<T> {
    /// The protocol message.
    pub message: T,
    /// Authenticated sender key; `None` for plaintext or anoncrypted delivery.
    pub sender_verkey: Option<Verkey>,
    /// Our key the message was packed for; `None` for plaintext delivery.
    pub recipient_verkey: Option<Verkey>,
}

impl<T> InboundMessage<T> {
    /// A message delivered in plaintext (out-of-band).
    pub fn plaintext(message: T) -> Self {
        Self {
            message,
            sender_verkey: None,
            recipient_verkey: None,
        }
    }

    /// A message that arrived packed, authcrypted if `sender_verkey` is set.
    pub fn packed(message: T, sender_verkey: Option<Verkey>, recipient_verkey: Verkey) -> Self {
        Self {
            message,
            sender_verkey,
            recipient_verkey: Some(recipient_verkey),
        }
    }
}

/// A message a transition wants delivered.
#[derive(Debug, Clone)]
pub struct OutboundMessage<T> {
    /// Channel to write to.
    pub endpoint: String,
    /// The protocol message.
    pub message: T,
    /// Key the message is packed for.
    pub recipient_verkey: Verkey,
    /// Our key the message is packed from.
    pub sender_verkey: Verkey,
}

/// Outcome of a successful transition.
#[derive(Debug, Clone)]
pub struct Transition<T> {
    /// Message to pack and send, if any.
    pub outbound: Option<OutboundMessage<T>>,
    /// Whether the handshake is complete.
    pub done: bool,
}

impl<T> Transition<T> {
    /// Move on and send `outbound`.
    pub fn send(outbound: OutboundMessage<T>) -> Self {
        Self {
            outbound: Some(outbound),
            done: false,
        }
    }

    /// Send `outbound` and finish.
    pub fn finish_with(outbound: OutboundMessage<T>) -> Self {
        Self {
            outbound: Some(outbound),
            done: true,
        }
    }

    /// Finish without sending anything.
    pub fn finish() -> Self {
        Self {
            outbound: None,
            done: true,
        }
    }
}

/// What a transition may use.
pub struct MachineContext<'a> {
    /// Wallet gateway.
    pub wallet: &'a dyn WalletPort,
    /// Wallet the handshake runs under.
    pub handle: &'a WalletHandle,
}

/// A protocol state machine driven by the engine.
///
/// Implementations must only update their own state after every fallible
/// step of a transition has succeeded, so a failed transition that reports
/// `leaves_state_unchanged` really did leave it unchanged.
#[async_trait]
pub trait StateMachine: Send + 'static {
    /// Message type the machine consumes and emits.
    type Message: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Instance id.
    fn id(&self) -> &str;

    /// Current state name.
    fn state(&self) -> &'static str;

    /// Advance on `inbound`.
    async fn transition(
        &mut self,
        inbound: InboundMessage<Self::Message>,
        ctx: &MachineContext<'_>,
    ) -> Result<Transition<Self::Message>, ProtocolError>;
}
