//! # Agent Configuration
//!
//! One struct per component, aggregated by [`AgentConfig`]. Every value has
//! a default and can be overridden from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `AGENT_REQUEST_TIMEOUT_SECS` | `gateway.request_timeout` |
//! | `AGENT_LIFECYCLE_TIMEOUT_SECS` | `gateway.lifecycle_timeout` |
//! | `AGENT_WORKER_QUEUE` | `gateway.queue_capacity` |
//! | `AGENT_CHANNEL_CAPACITY` | `channels.capacity` |
//! | `AGENT_MAX_CHANNELS` | `channels.max_channels` |
//! | `AGENT_HANDSHAKE_TTL_SECS` | `engine.instance_ttl` |
//! | `AGENT_MAINTENANCE_SECS` | `maintenance_interval` |
//! | `AGENT_LOG_LEVEL` | `log_level` |

use ag_01_wallet_gateway::GatewayConfig;
use ag_02_did_exchange::EngineConfig;
use shared_bus::ChannelConfig;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Default interval between maintenance sweeps.
pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(30);

/// Default log filter when neither `RUST_LOG` nor `AGENT_LOG_LEVEL` is set.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Wallet gateway timeouts and queue depth.
    pub gateway: GatewayConfig,
    /// Channel bus sizing.
    pub channels: ChannelConfig,
    /// Handshake lifetimes.
    pub engine: EngineConfig,
    /// How often expired handshakes are swept.
    pub maintenance_interval: Duration,
    /// Fallback `EnvFilter` directive.
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            channels: ChannelConfig::default(),
            engine: EngineConfig::default(),
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A timeout or interval is zero.
    #[error("{0} must be non-zero")]
    ZeroDuration(&'static str),

    /// A queue or limit is zero.
    #[error("{0} must be at least 1")]
    ZeroCapacity(&'static str),

    /// Lifecycle calls would time out before ordinary calls.
    #[error("lifecycle timeout ({lifecycle:?}) is shorter than request timeout ({request:?})")]
    LifecycleShorterThanRequest {
        /// Configured lifecycle timeout.
        lifecycle: Duration,
        /// Configured request timeout.
        request: Duration,
    },
}

impl AgentConfig {
    /// Defaults with overrides from the process environment.
    pub fn load_config() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults with overrides from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(secs) = parse(&lookup, "AGENT_REQUEST_TIMEOUT_SECS") {
            config.gateway.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "AGENT_LIFECYCLE_TIMEOUT_SECS") {
            config.gateway.lifecycle_timeout = Duration::from_secs(secs);
        }
        if let Some(depth) = parse(&lookup, "AGENT_WORKER_QUEUE") {
            config.gateway.queue_capacity = depth;
        }
        if let Some(capacity) = parse(&lookup, "AGENT_CHANNEL_CAPACITY") {
            config.channels.capacity = capacity;
        }
        if let Some(max) = parse(&lookup, "AGENT_MAX_CHANNELS") {
            config.channels.max_channels = max;
        }
        if let Some(secs) = parse(&lookup, "AGENT_HANDSHAKE_TTL_SECS") {
            config.engine.instance_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parse(&lookup, "AGENT_MAINTENANCE_SECS") {
            config.maintenance_interval = Duration::from_secs(secs);
        }
        if let Some(level) = lookup("AGENT_LOG_LEVEL") {
            config.log_level = level;
        }

        config
    }

    /// Reject settings the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("request timeout", self.gateway.request_timeout),
            ("lifecycle timeout", self.gateway.lifecycle_timeout),
            ("handshake ttl", self.engine.instance_ttl),
            ("maintenance interval", self.maintenance_interval),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, value)| value.is_zero()) {
            return Err(ConfigError::ZeroDuration(*name));
        }

        let capacities = [
            ("worker queue", self.gateway.queue_capacity),
            ("channel capacity", self.channels.capacity),
            ("max channels", self.channels.max_channels),
        ];
        if let Some((name, _)) = capacities.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroCapacity(*name));
        }

        if self.gateway.lifecycle_timeout < self.gateway.request_timeout {
            return Err(ConfigError::LifecycleShorterThanRequest {
                lifecycle: self.gateway.lifecycle_timeout,
                request: self.gateway.request_timeout,
            });
        }
        Ok(())
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparsable override");
            None
        }
    }
}
