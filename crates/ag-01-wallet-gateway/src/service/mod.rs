//! Service layer: the gateway registry and its workers.

mod gateway;
mod worker;

#[cfg(test)]
mod tests;

pub use gateway::WalletGateway;
