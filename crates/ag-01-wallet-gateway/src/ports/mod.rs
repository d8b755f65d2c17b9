//! Ports layer for the wallet gateway.

pub mod outbound;

pub use outbound::{OpenWallet, WalletBackend};
