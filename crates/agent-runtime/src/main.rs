//! # Pairwise Agent Runtime
//!
//! Runs a loopback DID-exchange handshake between two local agents and
//! logs the resulting pairwise records.
//!
//! ```text
//! Inviter (inviter-chan)                     Invitee (invitee-chan)
//!   generate_invite_link ──── ?c_i=... ────► receive_invite_link
//!                        ◄─── request ─────
//!                        ──── response ────►
//!                        ◄─── ack ─────────
//! ```

use std::time::Duration;

use agent_runtime::{init_tracing, AgentConfig, AgentRuntime};
use ag_02_did_exchange::Invocation;
use anyhow::{bail, Context, Result};
use shared_types::WalletHandle;
use tracing::info;

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AgentConfig::load_config();
    init_tracing(&config)?;
    config.validate().context("Invalid configuration")?;

    let runtime = AgentRuntime::new(config);
    runtime.start();

    let result = loopback_handshake(&runtime).await;
    runtime.shutdown().await;
    result
}

async fn loopback_handshake(runtime: &AgentRuntime) -> Result<()> {
    let gateway = runtime.gateway();
    let inviter_wallet = WalletHandle::new("inviter-wallet", "inviter-pass");
    let invitee_wallet = WalletHandle::new("invitee-wallet", "invitee-pass");
    for handle in [&inviter_wallet, &invitee_wallet] {
        gateway
            .create(handle)
            .await
            .with_context(|| format!("Failed to create wallet {}", handle.name()))?;
    }

    let inviter = runtime.agent("Inviter", "inviter-chan").await?;
    let invitee = runtime.agent("Invitee", "invitee-chan").await?;

    let (link, invitation) = inviter
        .generate_invite_link(&inviter_wallet)
        .await
        .context("Failed to generate invitation")?;
    info!(invitation_id = %invitation.id, %link, "Invitation generated");

    let thread = invitee
        .receive_invite_link(&link, &invitee_wallet)
        .await
        .context("Failed to accept invitation")?;
    info!(%thread, "Connection request sent");

    let steps = [
        (&inviter, &inviter_wallet, "request"),
        (&invitee, &invitee_wallet, "response"),
        (&inviter, &inviter_wallet, "ack"),
    ];
    for (agent, handle, expected) in steps {
        match runtime
            .deliver_next(agent, handle, DELIVERY_TIMEOUT)
            .await
            .with_context(|| format!("Failed to handle {expected}"))?
        {
            Some(Invocation::Pending) => info!(label = %agent.config().label, expected, "Handled"),
            Some(Invocation::Done) => {
                info!(label = %agent.config().label, expected, "Handshake complete")
            }
            None => bail!("No {expected} arrived within {DELIVERY_TIMEOUT:?}"),
        }
    }

    for handle in [&inviter_wallet, &invitee_wallet] {
        for record in gateway.list_pairwise(handle).await? {
            info!(
                wallet = %handle.name(),
                my_did = %record.my_did,
                their_did = %record.their_did,
                metadata = %serde_json::Value::Object(record.metadata),
                "Pairwise connection"
            );
        }
    }
    Ok(())
}
