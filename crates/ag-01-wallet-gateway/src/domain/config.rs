//! Gateway configuration.

use std::time::Duration;

/// Default timeout for ordinary calls (DID, sign, pack, pairwise).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for create/open/close/delete.
pub const DEFAULT_LIFECYCLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default depth of each worker's request queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Timeouts and sizing for the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Timeout for ordinary worker calls.
    pub request_timeout: Duration,
    /// Timeout for wallet lifecycle calls.
    pub lifecycle_timeout: Duration,
    /// Bounded queue depth per worker.
    pub queue_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            lifecycle_timeout: DEFAULT_LIFECYCLE_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl GatewayConfig {
    /// Override the ordinary call timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override the lifecycle call timeout.
    #[must_use]
    pub fn with_lifecycle_timeout(mut self, timeout: Duration) -> Self {
        self.lifecycle_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_class_is_longer() {
        let config = GatewayConfig::default();
        assert!(config.lifecycle_timeout > config.request_timeout);
        assert_eq!(config.queue_capacity, 64);
    }
}
