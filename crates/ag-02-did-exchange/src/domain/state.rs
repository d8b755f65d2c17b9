//! Handshake states. Both machines only ever move forward.

use std::fmt;

/// Inviter side of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InviterState {
    Start,
    InviteSent,
    RequestReceived,
    ResponseSent,
    AckReceived,
}

impl InviterState {
    /// Wire-style name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::InviteSent => "INVITE_SENT",
            Self::RequestReceived => "REQUEST_RECEIVED",
            Self::ResponseSent => "RESPONSE_SENT",
            Self::AckReceived => "ACK_RECEIVED",
        }
    }
}

impl fmt::Display for InviterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invitee side of the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InviteeState {
    Start,
    InviteReceived,
    RequestSent,
    ResponseReceived,
}

impl InviteeState {
    /// Wire-style name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::InviteReceived => "INVITE_RECEIVED",
            Self::RequestSent => "REQUEST_SENT",
            Self::ResponseReceived => "RESPONSE_RECEIVED",
        }
    }
}

impl fmt::Display for InviteeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_ordered_forward() {
        assert!(InviterState::Start < InviterState::InviteSent);
        assert!(InviterState::ResponseSent < InviterState::AckReceived);
        assert!(InviteeState::RequestSent < InviteeState::ResponseReceived);
        assert_eq!(InviterState::ResponseSent.to_string(), "RESPONSE_SENT");
    }
}
