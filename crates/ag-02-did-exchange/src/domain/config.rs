//! Engine and machine configuration.

use std::time::Duration;

/// Default lifetime of a handshake instance.
pub const DEFAULT_INSTANCE_TTL: Duration = Duration::from_secs(15 * 60);

/// Default time a finished id keeps its tombstone and agent routes.
pub const DEFAULT_TOMBSTONE_TTL: Duration = Duration::from_secs(60 * 60);

/// Lifetimes for engine bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long an instance may stay unfinished.
    pub instance_ttl: Duration,
    /// How long a finished id keeps its tombstone before it is retired.
    pub tombstone_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instance_ttl: DEFAULT_INSTANCE_TTL,
            tombstone_ttl: DEFAULT_TOMBSTONE_TTL,
        }
    }
}

/// Identity of the local party in a handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineConfig {
    /// Human-readable label sent to the other party.
    pub label: String,
    /// Channel name replies must be delivered to.
    pub endpoint: String,
}

impl MachineConfig {
    /// Create a machine configuration.
    pub fn new(label: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            endpoint: endpoint.into(),
        }
    }
}
