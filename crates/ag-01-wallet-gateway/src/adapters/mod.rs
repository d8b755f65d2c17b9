//! Adapters layer for the wallet gateway.
//!
//! Concrete wallet backends.

pub mod memory;

pub use memory::InMemoryWalletBackend;
