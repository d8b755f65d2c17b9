//! Domain layer: messages, states, errors and configuration.

pub mod config;
pub mod errors;
pub mod messages;
pub mod state;

pub use config::{EngineConfig, MachineConfig};
pub use errors::ProtocolError;
pub use messages::{
    Ack, Connection, ConnectionRequest, ConnectionResponse, DidDoc, DidExchangeMessage,
    SignatureField, Thread,
};
pub use state::{InviteeState, InviterState};
