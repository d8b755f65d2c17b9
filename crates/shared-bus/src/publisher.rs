//! # Channel Bus
//!
//! Defines the channel contract and its in-memory implementation.

use crate::subscriber::{ChannelError, ChannelSlot, ReadOnlyChannel};
use crate::ChannelConfig;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::WireMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Named message pipes between protocol participants.
#[async_trait]
pub trait ChannelBus: Send + Sync {
    /// Return a handle bound to `name`, allocating it if needed.
    ///
    /// Idempotent: every call for the same name reads from the same queue.
    ///
    /// # Errors
    ///
    /// `ChannelUnavailable` if the transport cannot allocate the channel.
    async fn create(&self, name: &str) -> Result<ReadOnlyChannel, ChannelError>;

    /// Enqueue a message for `name`.
    ///
    /// Fire-and-forget: never blocks, and a failed delivery is logged rather
    /// than returned because the recipient may simply be offline.
    async fn write(&self, name: &str, content_type: &str, payload: Vec<u8>);

    /// Wait up to `timeout` for the next message on `name`.
    ///
    /// Returns `Ok(None)` when the timeout elapses.
    async fn read(&self, name: &str, timeout: Duration)
        -> Result<Option<WireMessage>, ChannelError>;
}

/// Delivery counters.
#[derive(Debug, Default)]
pub struct BusStats {
    /// Messages accepted into a queue.
    pub delivered: AtomicU64,
    /// Messages dropped on a full queue or unallocatable channel.
    pub dropped: AtomicU64,
}

/// In-memory implementation of the channel bus.
///
/// Each name maps to a bounded tokio queue. Suitable for single-process
/// operation; a distributed deployment would put a broker behind
/// `ChannelBus` instead.
pub struct InMemoryChannelBus {
    /// Queues by channel name.
    channels: RwLock<HashMap<String, Arc<ChannelSlot>>>,

    /// Sizing limits.
    config: ChannelConfig,

    /// Delivery counters.
    stats: BusStats,
}

impl InMemoryChannelBus {
    /// Create a bus with default sizing.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::default())
    }

    /// Create a bus with explicit sizing.
    #[must_use]
    pub fn with_config(config: ChannelConfig) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            config,
            stats: BusStats::default(),
        }
    }

    /// Look up or allocate the queue for `name`.
    fn slot(&self, name: &str) -> Result<Arc<ChannelSlot>, ChannelError> {
        if let Some(slot) = self.channels.read().get(name) {
            return Ok(slot.clone());
        }

        let mut channels = self.channels.write();
        if let Some(slot) = channels.get(name) {
            return Ok(slot.clone());
        }
        if channels.len() >= self.config.max_channels {
            return Err(ChannelError::ChannelUnavailable(format!(
                "{name}: limit of {} channels reached",
                self.config.max_channels
            )));
        }

        let slot = Arc::new(ChannelSlot::new(name, self.config.capacity));
        channels.insert(name.to_string(), slot.clone());
        debug!(channel = %name, "Channel allocated");
        Ok(slot)
    }

    /// Number of live channel names.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.read().len()
    }

    /// Messages buffered on `name`, zero if unknown.
    #[must_use]
    pub fn pending(&self, name: &str) -> usize {
        self.channels
            .read()
            .get(name)
            .map_or(0, |slot| slot.pending())
    }

    /// Delivery counters.
    #[must_use]
    pub fn stats(&self) -> &BusStats {
        &self.stats
    }

    /// Forget `name` and any messages still queued on it.
    ///
    /// Outstanding `ReadOnlyChannel` handles keep their queue but no longer
    /// receive new writes.
    pub fn remove(&self, name: &str) -> bool {
        self.channels.write().remove(name).is_some()
    }

    /// Sizing limits.
    #[must_use]
    pub fn config(&self) -> ChannelConfig {
        self.config
    }
}

impl Default for InMemoryChannelBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelBus for InMemoryChannelBus {
    async fn create(&self, name: &str) -> Result<ReadOnlyChannel, ChannelError> {
        self.slot(name).map(ReadOnlyChannel::new)
    }

    async fn write(&self, name: &str, content_type: &str, payload: Vec<u8>) {
        let size = payload.len();
        let slot = match self.slot(name) {
            Ok(slot) => slot,
            Err(e) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(channel = %name, error = %e, "Message dropped (channel unavailable)");
                return;
            }
        };

        match slot.sender().try_send(WireMessage::new(content_type, payload)) {
            Ok(()) => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                debug!(channel = %name, content_type = %content_type, bytes = size, "Message enqueued");
            }
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    channel = %name,
                    capacity = self.config.capacity,
                    "Message dropped (channel full)"
                );
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(channel = %name, "Message dropped (channel closed)");
            }
        }
    }

    async fn read(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<WireMessage>, ChannelError> {
        let slot = self.slot(name)?;
        Ok(slot.read(timeout).await)
    }
}
