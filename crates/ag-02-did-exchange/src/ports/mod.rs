//! Ports layer for DID exchange.

pub mod outbound;

pub use outbound::WalletPort;
