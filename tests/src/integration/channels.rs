//! # Channel Tests
//!
//! Timed reads and per-name ordering of the in-memory bus, seen from the
//! outside of the crate.

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use shared_bus::{ChannelBus, ChannelConfig, ChannelError, InMemoryChannelBus};

#[cfg(test)]
use shared_types::WIRE_CONTENT_TYPE;

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_quiet_read_returns_none_after_timeout() {
        let bus = InMemoryChannelBus::new();
        let channel = bus.create("quiet").await.unwrap();

        let started = Instant::now();
        let message = channel.read(Duration::from_secs(1)).await;
        let elapsed = started.elapsed();

        assert!(message.is_none());
        assert!(elapsed >= Duration::from_millis(950), "returned after {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1500), "returned after {elapsed:?}");
    }

    #[tokio::test]
    async fn test_order_preserved_across_producers_per_name() {
        let bus = Arc::new(InMemoryChannelBus::new());
        let channel = bus.create("ordered").await.unwrap();

        for i in 0u8..20 {
            bus.write("ordered", WIRE_CONTENT_TYPE, vec![i]).await;
            bus.write("elsewhere", WIRE_CONTENT_TYPE, vec![i]).await;
        }

        for i in 0u8..20 {
            let message = channel.read(Duration::from_millis(100)).await.unwrap();
            assert_eq!(message.payload, vec![i]);
        }
        assert_eq!(bus.pending("elsewhere"), 20);
    }

    #[tokio::test]
    async fn test_reader_wakes_on_write_from_another_task() {
        let bus = Arc::new(InMemoryChannelBus::new());
        let channel = bus.create("late").await.unwrap();

        let writer = Arc::clone(&bus);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.write("late", WIRE_CONTENT_TYPE, b"hello".to_vec()).await;
        });

        let message = channel.read(Duration::from_secs(1)).await.unwrap();
        assert_eq!(message.payload, b"hello");
        assert_eq!(message.content_type, WIRE_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_channel_limit_surfaces_unavailable() {
        let bus = InMemoryChannelBus::with_config(ChannelConfig {
            capacity: 4,
            max_channels: 1,
        });
        bus.create("only").await.unwrap();

        let err = bus.create("second").await.unwrap_err();
        assert!(matches!(err, ChannelError::ChannelUnavailable(_)));
    }
}
