//! # Shared Bus - Named Channels Between Agents
//!
//! Delivers opaque `(content_type, payload)` tuples to an endpoint
//! identified by a stable name.
//!
//! ## Semantics
//!
//! - **Store-and-forward:** `write` never blocks and never fails the caller.
//!   Messages for a name nobody has opened yet are kept until someone reads.
//! - **Timed reads:** `read` waits up to a timeout and returns `None` when
//!   nothing arrived, so "no message yet" is not an error.
//! - **FIFO per name:** messages to one name are delivered in send order.
//!   Nothing is guaranteed across names.
//!
//! ```text
//!  producer A ──┐                        ┌── consumer X
//!               ├──► [ "inviter-chan" ] ─┤
//!  producer B ──┘      bounded queue     └── consumer Y
//! ```
//!
//! `InMemoryChannelBus` backs the `ChannelBus` contract with bounded tokio
//! queues for single-process deployments. A broker-backed implementation
//! can sit behind the same trait.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod publisher;
pub mod subscriber;

pub use publisher::{BusStats, ChannelBus, InMemoryChannelBus};
pub use subscriber::{ChannelError, ReadOnlyChannel};

/// Maximum messages buffered per channel before writes are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Maximum number of distinct channel names held at once.
pub const DEFAULT_MAX_CHANNELS: usize = 10_000;

/// Sizing of the in-memory bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Per-channel queue capacity.
    pub capacity: usize,
    /// Upper bound on live channel names.
    pub max_channels: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
            max_channels: DEFAULT_MAX_CHANNELS,
        }
    }
}
