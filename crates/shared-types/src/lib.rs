//! # Shared Types Crate
//!
//! This crate contains the entities exchanged between the wallet gateway,
//! the channel layer and the DID-exchange state machines, plus the wallet
//! error taxonomy every caller branches on.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Secrets Stay Opaque**: Passphrases are zeroized on drop and never
//!   appear in `Debug` output.
//! - **Typed Failures**: Wallet failures are distinguishable kinds, never
//!   bare strings.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;

/// Content type tag for packed (encrypted) wire messages.
pub const WIRE_CONTENT_TYPE: &str = "application/ssi-agent-wire";

/// Content type tag for plaintext JSON messages delivered out-of-band.
pub const PLAINTEXT_CONTENT_TYPE: &str = "application/json";
