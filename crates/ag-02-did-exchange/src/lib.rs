//! # AG-02 DID Exchange
//!
//! A generic state machine engine plus the two machines of the
//! connections/1.0 handshake.
//!
//! ## Handshake
//!
//! ```text
//!  Inviter                                   Invitee
//!  START ──invite()──► INVITE_SENT
//!            invitation (out-of-band) ─────► START
//!                                              │ request
//!  INVITE_SENT ◄──────── request ───────────── REQUEST_SENT
//!      │ response
//!  RESPONSE_SENT ─────── response ──────────► REQUEST_SENT
//!                                              │ ack, done
//!  RESPONSE_SENT ◄────── ack ──────────────── RESPONSE_RECEIVED
//!      │ done
//!  ACK_RECEIVED
//! ```
//!
//! Every wire message is packed through the wallet gateway before it is
//! written to a channel, and unpacked before a machine sees it.
//!
//! ## Engine Guarantees
//!
//! | Guarantee | Where |
//! |-----------|-------|
//! | Transitions on one instance id never overlap | `engine/core.rs` per-instance mutex |
//! | Mismatched message leaves state unchanged | `ProtocolError::leaves_state_unchanged` |
//! | Terminal ids keep failing with `MachineIsDone` | `engine/core.rs` tombstones |
//! | A failed transition aborts only its own handshake | `engine/core.rs` abort path |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! domain/   - messages, states, errors, config
//! ports/    - WalletPort
//! engine/   - StateMachine trait and StateMachineEngine
//! protocol/ - Inviter/Invitee machines, invitations, DidExchangeAgent
//! adapters/ - WalletPort for WalletGateway
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod engine;
pub mod ports;
pub mod protocol;

pub use domain::{DidExchangeMessage, EngineConfig, MachineConfig, ProtocolError};
pub use engine::{
    InboundMessage, Invocation, MachineContext, OutboundMessage, StateMachine, StateMachineEngine,
    Transition,
};
pub use ports::WalletPort;
pub use protocol::{
    generate_invite_link, generate_invite_message, parse_invite_link, DidExchangeAgent,
    InviteeMachine, InviterMachine,
};
