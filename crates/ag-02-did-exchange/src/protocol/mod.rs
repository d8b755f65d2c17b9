//! The connections/1.0 handshake on top of the engine.

mod agent;
mod invitation;
mod invitee;
mod inviter;


pub use agent::DidExchangeAgent;
pub use invitation::{
    generate_invite_link, generate_invite_message, invite_link_fragment, parse_invite_link,
    INVITE_PARAM,
};
pub use invitee::InviteeMachine;
pub use inviter::InviterMachine;

use serde_json::Value;
use shared_types::Metadata;
use std::time::{SystemTime, UNIX_EPOCH};

/// Pairwise status while the inviter waits for the ack.
pub const STATUS_RESPONSE_SENT: &str = "response_sent";
/// Pairwise status once both sides are done.
pub const STATUS_COMPLETE: &str = "complete";

/// Metadata stored with every pairwise record.
pub(crate) fn pairwise_metadata(
    label: &str,
    endpoint: &str,
    status: &str,
    thread_id: &str,
) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("label".into(), Value::from(label));
    metadata.insert("their_endpoint".into(), Value::from(endpoint));
    metadata.insert("status".into(), Value::from(status));
    metadata.insert("thread_id".into(), Value::from(thread_id));
    metadata
}

pub(crate) fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}
