//! Domain layer for the wallet gateway.

pub mod config;
pub mod entities;

pub use config::GatewayConfig;
pub use entities::{GatewayStats, UnpackedMessage, WalletRequest, WalletResponse};
