//! # AG-01 Wallet Process Gateway
//!
//! Presents wallet and crypto operations as request/response calls against a
//! long-lived worker per wallet. Callers never see the worker's concurrency.
//!
//! ## Worker Model
//!
//! ```text
//!  caller ──┐                                   ┌──────────────────────┐
//!  caller ──┼──► WalletGateway ──mpsc (bounded)──► worker "alice"       │
//!  caller ──┘      │  registry by name           │  owns Box<OpenWallet>│
//!                  │                             └──────────────────────┘
//!                  └─ oneshot reply, bounded by timeout
//! ```
//!
//! - One worker per wallet name. Every call for that name is serialized by
//!   the worker's single-consumer loop.
//! - `ensure_open` is race-safe: the first caller opens, concurrent callers
//!   wait for that open instead of issuing their own.
//! - Every call carries a timeout. Lifecycle calls (create/open/close/delete)
//!   use the longer `lifecycle_timeout` class. Expiry surfaces as
//!   `WalletError::AgentTimeout` and does not roll back work the worker
//!   already performed.
//!
//! ## Error Taxonomy
//!
//! | Kind | Raised when |
//! |------|-------------|
//! | `WalletNotFound` | No wallet with that name exists |
//! | `WalletAlreadyExists` | `create` on an existing name |
//! | `WalletItemNotFound` | DID, key or pairwise record missing |
//! | `WalletNotOpen` | Worker went away between open and call |
//! | `AccessDenied` | Passphrase mismatch |
//! | `AgentTimeout` | Call exceeded its timeout class |
//! | `WalletOperationFailed` | Anything else the worker reports |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! domain/   - GatewayConfig, WalletRequest/WalletResponse, stats
//! ports/    - WalletBackend, OpenWallet (the external wallet store)
//! service/  - WalletGateway registry and the worker loop
//! adapters/ - InMemoryWalletBackend
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryWalletBackend;
pub use domain::{GatewayConfig, GatewayStats, UnpackedMessage, WalletRequest, WalletResponse};
pub use ports::{OpenWallet, WalletBackend};
pub use service::WalletGateway;
