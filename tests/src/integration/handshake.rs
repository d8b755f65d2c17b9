//! # End-to-End Handshake Tests
//!
//! Full DID exchange between agents sharing one runtime:
//!
//! ```text
//! [Inviter] ──invitation (out-of-band)──► [Invitee]
//!     ▲  │                                   │  ▲
//!     │  └──────── response ─────────────────┼──┘
//!     └─────────── request, ack ─────────────┘
//!          (packed, via inviter-chan / invitee-chan)
//! ```
//!
//! ## Test Categories
//!
//! 1. **Happy Path**: one inviter, one invitee, matching pairwise records
//! 2. **Concurrent Handshakes**: many invitees against one inviter
//! 3. **Terminal Replays**: resent messages fail with `MachineIsDone`

#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use std::time::Duration;

#[cfg(test)]
use agent_runtime::{AgentConfig, AgentRuntime};

#[cfg(test)]
use ag_02_did_exchange::{DidExchangeAgent, Invocation, ProtocolError};

#[cfg(test)]
use shared_bus::ChannelBus;

#[cfg(test)]
use shared_types::WalletHandle;

#[cfg(test)]
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(1);

/// An agent together with the wallet it runs under.
#[cfg(test)]
struct Party {
    agent: Arc<DidExchangeAgent>,
    wallet: WalletHandle,
}

#[cfg(test)]
async fn party(runtime: &AgentRuntime, label: &str, endpoint: &str) -> Party {
    let wallet = WalletHandle::new(format!("{endpoint}-wallet"), format!("{label}-pass"));
    runtime.gateway().create(&wallet).await.unwrap();
    let agent = runtime.agent(label, endpoint).await.unwrap();
    Party { agent, wallet }
}

#[cfg(test)]
async fn deliver(runtime: &AgentRuntime, party: &Party) -> Result<Invocation, ProtocolError> {
    runtime
        .deliver_next(&party.agent, &party.wallet, DELIVERY_TIMEOUT)
        .await
        .map(|outcome| outcome.expect("a message was due"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inviter_and_invitee_end_with_one_matching_pairwise() {
        let runtime = AgentRuntime::new(AgentConfig::default());
        let inviter = party(&runtime, "Inviter", "inviter-chan").await;
        let invitee = party(&runtime, "Invitee", "invitee-chan").await;

        let (link, _) = inviter
            .agent
            .generate_invite_link(&inviter.wallet)
            .await
            .unwrap();
        let base = format!("https://inviter.example/connect{link}");
        invitee
            .agent
            .receive_invite_link(&base, &invitee.wallet)
            .await
            .unwrap();

        assert_eq!(deliver(&runtime, &inviter).await.unwrap(), Invocation::Pending);
        assert_eq!(deliver(&runtime, &invitee).await.unwrap(), Invocation::Done);
        assert_eq!(deliver(&runtime, &inviter).await.unwrap(), Invocation::Done);

        let gateway = runtime.gateway();
        let inviter_records = gateway.list_pairwise(&inviter.wallet).await.unwrap();
        let invitee_records = gateway.list_pairwise(&invitee.wallet).await.unwrap();
        assert_eq!(inviter_records.len(), 1);
        assert_eq!(invitee_records.len(), 1);
        assert_eq!(inviter_records[0].their_did, invitee_records[0].my_did);
        assert_eq!(inviter_records[0].my_did, invitee_records[0].their_did);
        assert_eq!(invitee_records[0].their_verkey, inviter_records[0].my_verkey);
        assert_eq!(invitee_records[0].metadata["their_endpoint"], "inviter-chan");
        assert_eq!(inviter_records[0].metadata["their_endpoint"], "invitee-chan");

        // Nothing else is in flight
        let bus = runtime.bus();
        assert_eq!(bus.pending("inviter-chan"), 0);
        assert_eq!(bus.pending("invitee-chan"), 0);
    }

    #[tokio::test]
    async fn test_one_inviter_many_invitees() {
        let runtime = AgentRuntime::new(AgentConfig::default());
        let inviter = party(&runtime, "Inviter", "inviter-chan").await;
        let mut invitees = Vec::new();
        for i in 0..3 {
            invitees.push(party(&runtime, &format!("Invitee {i}"), &format!("invitee-{i}")).await);
        }

        for invitee in &invitees {
            let (link, _) = inviter
                .agent
                .generate_invite_link(&inviter.wallet)
                .await
                .unwrap();
            invitee
                .agent
                .receive_invite_link(&link, &invitee.wallet)
                .await
                .unwrap();
        }
        for _ in &invitees {
            assert_eq!(deliver(&runtime, &inviter).await.unwrap(), Invocation::Pending);
        }
        for invitee in &invitees {
            assert_eq!(deliver(&runtime, invitee).await.unwrap(), Invocation::Done);
        }
        for _ in &invitees {
            assert_eq!(deliver(&runtime, &inviter).await.unwrap(), Invocation::Done);
        }

        let gateway = runtime.gateway();
        let records = gateway.list_pairwise(&inviter.wallet).await.unwrap();
        assert_eq!(records.len(), invitees.len());
        for invitee in &invitees {
            let theirs = gateway.list_pairwise(&invitee.wallet).await.unwrap();
            assert_eq!(theirs.len(), 1);
            assert!(records.iter().any(|record| record.their_did == theirs[0].my_did));
        }
    }

    #[tokio::test]
    async fn test_replayed_messages_hit_terminal_instances() {
        let runtime = AgentRuntime::new(AgentConfig::default());
        let bus = runtime.bus();
        let inviter = party(&runtime, "Inviter", "inviter-chan").await;
        let invitee = party(&runtime, "Invitee", "invitee-chan").await;

        let (link, _) = inviter
            .agent
            .generate_invite_link(&inviter.wallet)
            .await
            .unwrap();
        invitee
            .agent
            .receive_invite_link(&link, &invitee.wallet)
            .await
            .unwrap();

        // Deliver by hand so the payloads can be replayed
        let request = bus.read("inviter-chan", DELIVERY_TIMEOUT).await.unwrap().unwrap();
        inviter
            .agent
            .handle_wired_message(&request.payload, &inviter.wallet)
            .await
            .unwrap();
        let response = bus.read("invitee-chan", DELIVERY_TIMEOUT).await.unwrap().unwrap();
        invitee
            .agent
            .handle_wired_message(&response.payload, &invitee.wallet)
            .await
            .unwrap();
        let ack = bus.read("inviter-chan", DELIVERY_TIMEOUT).await.unwrap().unwrap();
        inviter
            .agent
            .handle_wired_message(&ack.payload, &inviter.wallet)
            .await
            .unwrap();

        let replays = [
            (&inviter, &request.payload),
            (&invitee, &response.payload),
            (&inviter, &ack.payload),
        ];
        for (party, payload) in replays {
            let err = party
                .agent
                .handle_wired_message(payload, &party.wallet)
                .await
                .unwrap_err();
            assert!(err.is_terminal(), "expected MachineIsDone, got {err}");
        }
        assert_eq!(
            runtime.gateway().list_pairwise(&inviter.wallet).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_maintenance_loop_runs_alongside_handshakes() {
        let config = AgentConfig {
            maintenance_interval: Duration::from_millis(5),
            ..AgentConfig::default()
        };
        let runtime = AgentRuntime::new(config);
        runtime.start();
        let inviter = party(&runtime, "Inviter", "inviter-chan").await;
        let invitee = party(&runtime, "Invitee", "invitee-chan").await;

        let (link, _) = inviter
            .agent
            .generate_invite_link(&inviter.wallet)
            .await
            .unwrap();
        invitee
            .agent
            .receive_invite_link(&link, &invitee.wallet)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(deliver(&runtime, &inviter).await.unwrap(), Invocation::Pending);
        assert_eq!(deliver(&runtime, &invitee).await.unwrap(), Invocation::Done);
        assert_eq!(deliver(&runtime, &inviter).await.unwrap(), Invocation::Done);

        runtime.shutdown().await;
        assert!(!runtime.gateway().is_open("inviter-chan-wallet").await);
    }
}
