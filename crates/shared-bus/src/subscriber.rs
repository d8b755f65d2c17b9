//! # Channel Readers
//!
//! Defines the receiving side of a named channel.

use shared_types::WireMessage;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// Errors from channel operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The transport could not allocate the channel.
    #[error("Channel unavailable: {0}")]
    ChannelUnavailable(String),
}

/// Queue backing one channel name.
///
/// The slot keeps its own sender so the queue never reports closed while
/// the bus still tracks the name.
pub(crate) struct ChannelSlot {
    name: String,
    sender: mpsc::Sender<WireMessage>,
    receiver: Mutex<mpsc::Receiver<WireMessage>>,
}

impl ChannelSlot {
    pub(crate) fn new(name: &str, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            name: name.to_string(),
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    pub(crate) fn sender(&self) -> &mpsc::Sender<WireMessage> {
        &self.sender
    }

    /// Messages waiting to be read.
    pub(crate) fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Wait up to `timeout` for the next message.
    ///
    /// Time spent queueing behind other readers counts against the timeout.
    pub(crate) async fn read(&self, timeout: Duration) -> Option<WireMessage> {
        let next = async {
            let mut receiver = self.receiver.lock().await;
            receiver.recv().await
        };

        match tokio::time::timeout(timeout, next).await {
            Ok(message) => message,
            Err(_) => {
                debug!(channel = %self.name, timeout_ms = millis(timeout), "Channel read timed out");
                None
            }
        }
    }
}

/// Whole milliseconds in `timeout`, saturating at `u64::MAX`.
fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

/// A handle bound to one channel name.
///
/// Cloning the handle shares the same queue; every message is delivered to
/// exactly one reader.
#[derive(Clone)]
pub struct ReadOnlyChannel {
    slot: Arc<ChannelSlot>,
}

impl ReadOnlyChannel {
    pub(crate) fn new(slot: Arc<ChannelSlot>) -> Self {
        Self { slot }
    }

    /// The channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.slot.name
    }

    /// Read the next message.
    ///
    /// # Returns
    ///
    /// - `Some(message)` - The oldest undelivered message
    /// - `None` - Nothing arrived within `timeout`
    pub async fn read(&self, timeout: Duration) -> Option<WireMessage> {
        self.slot.read(timeout).await
    }

    /// Messages currently buffered.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.slot.pending()
    }
}

impl std::fmt::Debug for ReadOnlyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOnlyChannel")
            .field("name", &self.slot.name)
            .field("pending", &self.slot.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_read_returns_queued_message() {
        let slot = Arc::new(ChannelSlot::new("chan", 4));
        slot.sender()
            .try_send(WireMessage::new("application/json", b"{}".to_vec()))
            .unwrap();

        let channel = ReadOnlyChannel::new(slot);
        assert_eq!(channel.pending(), 1);

        let message = channel.read(Duration::from_millis(100)).await.unwrap();
        assert_eq!(message.payload, b"{}");
        assert_eq!(channel.pending(), 0);
    }

    #[tokio::test]
    async fn test_read_times_out_with_none() {
        let channel = ReadOnlyChannel::new(Arc::new(ChannelSlot::new("empty", 4)));

        let started = Instant::now();
        let result = channel.read(Duration::from_millis(50)).await;

        assert!(result.is_none());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_millis_saturates() {
        assert_eq!(millis(Duration::from_millis(250)), 250);
        assert_eq!(millis(Duration::from_secs(u64::MAX)), u64::MAX);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[tokio::test]
    async fn test_clones_share_one_queue() {
        let slot = Arc::new(ChannelSlot::new("shared", 4));
        let first = ReadOnlyChannel::new(slot.clone());
        let second = first.clone();

        slot.sender()
            .try_send(WireMessage::new("t", b"only".to_vec()))
            .unwrap();

        assert!(first.read(Duration::from_millis(50)).await.is_some());
        assert!(second.read(Duration::from_millis(50)).await.is_none());
    }
}
