//! # Agent Runtime Library
//!
//! Wiring for pairwise agents. The `agent-runtime` binary is a thin
//! shell around this library.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, then environment)
//! 2. Validate it
//! 3. Install the tracing subscriber
//! 4. Build the bus and the wallet gateway
//! 5. Start the maintenance loop
//!
//! ## Modules
//!
//! - `config/` - `AgentConfig` and environment overrides
//! - `runtime/` - `AgentRuntime`: shared infrastructure, agents, maintenance

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod runtime;

pub use config::{AgentConfig, ConfigError};
pub use runtime::AgentRuntime;

use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `config.log_level` is used.
pub fn init_tracing(config: &AgentConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
