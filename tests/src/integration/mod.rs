//! Cross-crate integration scenarios, using the in-memory wallet backend
//! and channel bus.

pub mod channels;
pub mod handshake;
pub mod wallet_gateway;
