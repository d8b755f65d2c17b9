//! Adapters layer for DID exchange.

pub mod wallet;
