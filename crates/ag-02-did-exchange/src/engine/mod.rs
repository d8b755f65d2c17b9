//! Generic state machine engine.

mod core;
mod machine;


pub use self::core::{Invocation, StateMachineEngine};
pub use machine::{InboundMessage, MachineContext, OutboundMessage, StateMachine, Transition};
