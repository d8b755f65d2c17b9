//! Out-of-band invitations and invite links.

use crate::domain::messages::decode_b64;
use crate::domain::{DidExchangeMessage, ProtocolError};
use crate::ports::WalletPort;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use shared_types::{Invitation, WalletHandle};
use tracing::debug;
use uuid::Uuid;

/// Query parameter carrying the encoded invitation.
pub const INVITE_PARAM: &str = "c_i";

/// Mint an invitation under a fresh connection key.
///
/// Touches no state machine; the caller decides who answers requests
/// addressed to the returned key.
pub async fn generate_invite_message(
    wallet: &dyn WalletPort,
    handle: &WalletHandle,
    label: &str,
    endpoint: &str,
) -> Result<Invitation, ProtocolError> {
    let key = wallet.create_and_store_my_did(handle).await?;
    let invitation = Invitation::new(Uuid::new_v4().to_string(), label, endpoint, key.verkey);
    debug!(invitation_id = %invitation.id, endpoint, "Generated invitation");
    Ok(invitation)
}

/// Mint an invitation and wrap it as a `?c_i=` link fragment.
pub async fn generate_invite_link(
    wallet: &dyn WalletPort,
    handle: &WalletHandle,
    label: &str,
    endpoint: &str,
) -> Result<(String, Invitation), ProtocolError> {
    let invitation = generate_invite_message(wallet, handle, label, endpoint).await?;
    let fragment = invite_link_fragment(&invitation)?;
    Ok((fragment, invitation))
}

/// `?c_i=<base64url(JSON)>` for an existing invitation.
pub fn invite_link_fragment(invitation: &Invitation) -> Result<String, ProtocolError> {
    let json = serde_json::to_vec(&DidExchangeMessage::Invitation(invitation.clone()))?;
    Ok(format!("?{INVITE_PARAM}={}", URL_SAFE_NO_PAD.encode(json)))
}

/// Extract the invitation from any URL (or bare fragment) with a `c_i`
/// query parameter.
pub fn parse_invite_link(link: &str) -> Result<Invitation, ProtocolError> {
    let query = link
        .split_once('?')
        .map_or(link, |(_, query)| query)
        .split('#')
        .next()
        .unwrap_or_default();

    let encoded = query
        .split('&')
        .find_map(|pair| pair.strip_prefix(INVITE_PARAM)?.strip_prefix('='))
        .ok_or_else(|| ProtocolError::InvalidInvitation("link has no c_i parameter".into()))?;

    let json = decode_b64(encoded.trim_end_matches("%3D"))
        .map_err(|e| ProtocolError::InvalidInvitation(e.to_string()))?;
    match serde_json::from_slice(&json) {
        Ok(DidExchangeMessage::Invitation(invitation)) => Ok(invitation),
        Ok(other) => Err(ProtocolError::InvalidInvitation(format!(
            "link carries a {} message",
            other.kind()
        ))),
        Err(e) => Err(ProtocolError::InvalidInvitation(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::messages::Ack;

    fn invitation() -> Invitation {
        Invitation::new("inv-1", "Inviter", "inviter-chan", "Key1".into())
    }

    #[test]
    fn test_fragment_is_url_safe() {
        let fragment = invite_link_fragment(&invitation()).unwrap();

        assert!(fragment.starts_with("?c_i="));
        assert!(fragment[5..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_parse_full_link() {
        let link = format!(
            "https://agent.example/invite{}&lang=en",
            invite_link_fragment(&invitation()).unwrap()
        );
        assert_eq!(parse_invite_link(&link).unwrap(), invitation());
    }

    #[test]
    fn test_parse_tolerates_padding() {
        let json = serde_json::to_vec(&DidExchangeMessage::Invitation(invitation())).unwrap();
        let padded = base64::engine::general_purpose::URL_SAFE.encode(json);
        let link = format!("http://x/?c_i={padded}");

        assert_eq!(parse_invite_link(&link).unwrap(), invitation());
    }

    #[test]
    fn test_parse_rejects_missing_param() {
        assert!(matches!(
            parse_invite_link("https://agent.example/invite?foo=bar"),
            Err(ProtocolError::InvalidInvitation(_))
        ));
    }

    #[test]
    fn test_parse_rejects_other_messages() {
        let json = serde_json::to_vec(&DidExchangeMessage::Ack(Ack::ok("a", "t"))).unwrap();
        let link = format!("?c_i={}", URL_SAFE_NO_PAD.encode(json));

        assert!(matches!(
            parse_invite_link(&link),
            Err(ProtocolError::InvalidInvitation(_))
        ));
    }
}
