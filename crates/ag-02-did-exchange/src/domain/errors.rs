//! Protocol error types.

use shared_bus::ChannelError;
use shared_types::WalletError;
use thiserror::Error;

/// Errors raised by the engine and the DID-exchange machines.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The message type is not accepted in the current state.
    #[error("Protocol violation: {received} not accepted in state {state}")]
    ProtocolViolation { state: String, received: String },

    /// The instance finished (or was aborted); no more messages are expected.
    #[error("State machine {0} is done")]
    MachineIsDone(String),

    /// The instance outlived its deadline and was evicted.
    #[error("State machine {0} expired")]
    Expired(String),

    /// An instance with this id is already running.
    #[error("State machine {0} already exists")]
    DuplicateInstance(String),

    /// The payload could not be decoded or is internally inconsistent.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The invitation is unusable or unknown.
    #[error("Invalid invitation: {0}")]
    InvalidInvitation(String),

    /// A signature or sender key failed to authenticate.
    #[error("Signature invalid: {0}")]
    SignatureInvalid(String),

    /// A wallet gateway call failed.
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// A channel could not be allocated.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl ProtocolError {
    /// Whether this is the terminal control signal rather than a defect.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::MachineIsDone(_))
    }

    /// Whether the error was raised before the machine changed anything.
    ///
    /// The engine keeps the instance alive for these; every other
    /// transition failure aborts the handshake.
    #[must_use]
    pub fn leaves_state_unchanged(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation { .. } | Self::MalformedMessage(_) | Self::InvalidInvitation(_)
        )
    }

    pub(crate) fn violation(state: impl Into<String>, received: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            state: state.into(),
            received: received.into(),
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedMessage(e.to_string())
    }
}
