//! # Agent Runtime
//!
//! Owns the shared infrastructure and the agents built on it.
//!
//! ```text
//!             ┌────────────────────────┐
//!  agents ───►│   InMemoryChannelBus   │◄─── endpoints ("inviter-chan", ...)
//!     │       └────────────────────────┘
//!     │       ┌────────────────────────┐     ┌──────────────────────────┐
//!     └──────►│     WalletGateway      │────►│  one worker per wallet   │
//!             └────────────────────────┘     └──────────────────────────┘
//!                         ▲
//!  maintenance loop ──────┘ evicts expired handshakes every interval
//! ```

use crate::config::AgentConfig;
use ag_01_wallet_gateway::{InMemoryWalletBackend, WalletGateway};
use ag_02_did_exchange::{DidExchangeAgent, Invocation, MachineConfig, ProtocolError};
use parking_lot::{Mutex, RwLock};
use shared_bus::{ChannelBus, InMemoryChannelBus};
use shared_types::WalletHandle;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Shared bus, wallet gateway and the agents wired to them.
pub struct AgentRuntime {
    config: AgentConfig,
    bus: Arc<InMemoryChannelBus>,
    backend: Arc<InMemoryWalletBackend>,
    gateway: Arc<WalletGateway>,
    /// One agent per endpoint; it is the only reader of that channel.
    agents: Arc<RwLock<HashMap<String, Arc<DidExchangeAgent>>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl AgentRuntime {
    /// Build the shared infrastructure. Nothing runs until [`start`](Self::start).
    pub fn new(config: AgentConfig) -> Self {
        info!("Creating agent runtime");

        let bus = Arc::new(InMemoryChannelBus::with_config(config.channels));
        let backend = Arc::new(InMemoryWalletBackend::new());
        let gateway = Arc::new(WalletGateway::new(backend.clone(), config.gateway));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            bus,
            backend,
            gateway,
            agents: Arc::new(RwLock::new(HashMap::new())),
            shutdown_tx,
            shutdown_rx,
            maintenance: Mutex::new(None),
        }
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The channel bus all agents share.
    pub fn bus(&self) -> Arc<InMemoryChannelBus> {
        Arc::clone(&self.bus)
    }

    /// The wallet gateway all agents share.
    pub fn gateway(&self) -> Arc<WalletGateway> {
        Arc::clone(&self.gateway)
    }

    /// The wallet backend behind the gateway.
    pub fn backend(&self) -> Arc<InMemoryWalletBackend> {
        Arc::clone(&self.backend)
    }

    /// Number of registered agents.
    pub fn agent_count(&self) -> usize {
        self.agents.read().len()
    }

    /// Build an agent labelled `label` that receives on `endpoint`.
    ///
    /// The endpoint channel is created up front so nothing addressed to it
    /// is lost. An endpoint that already has an agent gets that agent back.
    pub async fn agent(
        &self,
        label: &str,
        endpoint: &str,
    ) -> Result<Arc<DidExchangeAgent>, ProtocolError> {
        if let Some(existing) = self.agents.read().get(endpoint) {
            if existing.config().label != label {
                warn!(endpoint, label, existing = %existing.config().label, "Endpoint already served");
            }
            return Ok(Arc::clone(existing));
        }

        self.bus.create(endpoint).await?;
        let agent = Arc::new(DidExchangeAgent::new(
            MachineConfig::new(label, endpoint),
            self.gateway.clone(),
            self.bus.clone(),
            self.config.engine,
        ));
        let agent = Arc::clone(
            self.agents
                .write()
                .entry(endpoint.to_string())
                .or_insert(agent),
        );
        info!(label, endpoint, "Agent ready");
        Ok(agent)
    }

    /// Unregister the agent on `endpoint`; the maintenance loop stops
    /// sweeping it.
    pub fn remove_agent(&self, endpoint: &str) -> Option<Arc<DidExchangeAgent>> {
        let removed = self.agents.write().remove(endpoint);
        if removed.is_some() {
            info!(endpoint, "Agent removed");
        }
        removed
    }

    /// Read the next wire message on `agent`'s endpoint and handle it.
    ///
    /// `Ok(None)` when nothing arrived within `timeout`.
    pub async fn deliver_next(
        &self,
        agent: &DidExchangeAgent,
        handle: &WalletHandle,
        timeout: Duration,
    ) -> Result<Option<Invocation>, ProtocolError> {
        let endpoint = &agent.config().endpoint;
        let Some(wire) = self.bus.read(endpoint, timeout).await? else {
            debug!(channel = %endpoint, "Nothing to deliver");
            return Ok(None);
        };
        agent
            .handle_wired_message(&wire.payload, handle)
            .await
            .map(Some)
    }

    /// Spawn the maintenance loop.
    pub fn start(&self) {
        let mut maintenance = self.maintenance.lock();
        if maintenance.is_some() {
            return;
        }

        let agents = Arc::clone(&self.agents);
        let interval = self.config.maintenance_interval;
        let mut shutdown = self.shutdown_rx.clone();

        *maintenance = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted: usize = agents
                            .read()
                            .values()
                            .map(|agent| agent.evict_expired())
                            .sum();
                        if evicted > 0 {
                            info!(evicted, "Maintenance sweep");
                        }
                    }
                    _ = shutdown.changed() => {
                        info!("Maintenance loop stopping");
                        break;
                    }
                }
            }
        }));
        info!(interval_secs = interval.as_secs(), "Maintenance loop started");
    }

    /// Whether the maintenance loop is running.
    pub fn is_running(&self) -> bool {
        self.maintenance
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the maintenance loop and close every open wallet.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        let task = self.maintenance.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Maintenance loop ended abnormally: {}", e);
            }
        }

        self.gateway.shutdown().await;
        info!("Shutdown complete");
    }
}
