//! # Error Types
//!
//! The wallet failure taxonomy surfaced by the wallet gateway.

use thiserror::Error;

/// Errors reported by the wallet gateway and its worker.
///
/// Every variant is a distinct kind so callers can branch without parsing
/// messages. `AgentTimeout` is fatal to the current protocol step but not
/// necessarily to the wallet: the worker may still be processing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalletError {
    /// No wallet with this name exists in the backend.
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    /// A wallet with this name already exists.
    #[error("Wallet already exists: {0}")]
    WalletAlreadyExists(String),

    /// A record inside the wallet (key, DID, pairwise) is absent.
    #[error("Wallet item not found: {0}")]
    WalletItemNotFound(String),

    /// A data operation was issued against a wallet that is not open.
    #[error("Wallet is not open: {0}")]
    WalletNotOpen(String),

    /// The supplied passphrase does not unlock the wallet.
    #[error("Access denied to wallet {0}")]
    AccessDenied(String),

    /// The wallet worker did not answer within the deadline.
    #[error("Wallet agent timed out after {timeout_ms}ms during {operation}")]
    AgentTimeout {
        /// Operation that was in flight.
        operation: String,
        /// Deadline that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// Any other failure reported by the worker or backend.
    #[error("Wallet operation failed: {0}")]
    WalletOperationFailed(String),
}

impl WalletError {
    /// Returns `true` for `AgentTimeout`.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::AgentTimeout { .. })
    }

    /// Returns `true` for validation-style failures that an outer transport
    /// layer should report as client errors.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::WalletNotFound(_)
                | Self::WalletAlreadyExists(_)
                | Self::WalletItemNotFound(_)
                | Self::WalletNotOpen(_)
                | Self::AccessDenied(_)
        )
    }
}
