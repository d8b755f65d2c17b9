//! Connections/1.0 message formats.
//!
//! Messages are JSON objects discriminated by `@type`:
//!
//! | `@type` suffix | Sent by | Carries |
//! |----------------|---------|---------|
//! | `connections/1.0/invitation` | Inviter (out-of-band) | connection key, endpoint |
//! | `connections/1.0/request` | Invitee | DID and DIDDoc |
//! | `connections/1.0/response` | Inviter | DID and DIDDoc, signed by the invitation key |
//! | `notification/1.0/ack` | Invitee | thread id |

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use shared_types::{Did, Invitation, Verkey};

use super::ProtocolError;

/// `@type` of an invitation.
pub const INVITATION_TYPE: &str = "https://didcomm.org/connections/1.0/invitation";
/// `@type` of a connection request.
pub const REQUEST_TYPE: &str = "https://didcomm.org/connections/1.0/request";
/// `@type` of a connection response.
pub const RESPONSE_TYPE: &str = "https://didcomm.org/connections/1.0/response";
/// `@type` of an acknowledgement.
pub const ACK_TYPE: &str = "https://didcomm.org/notification/1.0/ack";
/// `@type` of the response signature block.
pub const SIGNATURE_TYPE: &str = "https://didcomm.org/signature/1.0/ed25519Sha512_single";

const DID_CONTEXT: &str = "https://w3id.org/did/v1";
const KEY_TYPE: &str = "Ed25519VerificationKey2018";
const AUTHENTICATION_TYPE: &str = "Ed25519SignatureAuthentication2018";
const SERVICE_TYPE: &str = "IndyAgent";
const TIMESTAMP_LEN: usize = 8;

/// Any message of the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum DidExchangeMessage {
    /// Out-of-band invitation.
    #[serde(rename = "https://didcomm.org/connections/1.0/invitation")]
    Invitation(Invitation),
    /// Invitee's connection request.
    #[serde(rename = "https://didcomm.org/connections/1.0/request")]
    Request(ConnectionRequest),
    /// Inviter's signed response.
    #[serde(rename = "https://didcomm.org/connections/1.0/response")]
    Response(ConnectionResponse),
    /// Invitee's final acknowledgement.
    #[serde(rename = "https://didcomm.org/notification/1.0/ack")]
    Ack(Ack),
}

impl DidExchangeMessage {
    /// Short name of the message kind, used in violations and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Invitation(_) => "invitation",
            Self::Request(_) => "request",
            Self::Response(_) => "response",
            Self::Ack(_) => "ack",
        }
    }

    /// Thread the message belongs to.
    #[must_use]
    pub fn thread_id(&self) -> &str {
        match self {
            Self::Invitation(invitation) => &invitation.id,
            Self::Request(request) => &request.id,
            Self::Response(response) => &response.thread.thid,
            Self::Ack(ack) => &ack.thread.thid,
        }
    }
}

/// Reference to the thread a reply belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Thread id (the request's `@id`).
    pub thid: String,
}

/// A DID with its DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Sender's DID for this relationship.
    #[serde(rename = "DID")]
    pub did: Did,
    /// Document describing the DID's key and endpoint.
    #[serde(rename = "DIDDoc")]
    pub did_doc: DidDoc,
}

impl Connection {
    /// Connection block for `did`/`verkey` reachable at `endpoint`.
    pub fn new(did: &str, verkey: &str, endpoint: &str) -> Self {
        Self {
            did: did.to_string(),
            did_doc: DidDoc::new(did, verkey, endpoint),
        }
    }
}

/// Minimal DID document: one key, one authentication entry, one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDoc {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: Did,
    #[serde(rename = "publicKey")]
    pub public_key: Vec<PublicKeyEntry>,
    #[serde(default)]
    pub authentication: Vec<AuthenticationEntry>,
    pub service: Vec<ServiceEntry>,
}

/// A key listed in a DID document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub key_type: String,
    pub controller: Did,
    #[serde(rename = "publicKeyBase58")]
    pub public_key_base58: Verkey,
}

/// Authentication reference to a listed key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationEntry {
    #[serde(rename = "type")]
    pub auth_type: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

/// Where and how to reach the DID subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub priority: u32,
    #[serde(rename = "recipientKeys")]
    pub recipient_keys: Vec<Verkey>,
    #[serde(rename = "routingKeys", default)]
    pub routing_keys: Vec<Verkey>,
    #[serde(rename = "serviceEndpoint")]
    pub service_endpoint: String,
}

impl DidDoc {
    /// Document for `did` controlling `verkey`, served at `endpoint`.
    pub fn new(did: &str, verkey: &str, endpoint: &str) -> Self {
        let key_id = format!("did:sov:{did}#1");
        Self {
            context: DID_CONTEXT.to_string(),
            id: format!("did:sov:{did}"),
            public_key: vec![PublicKeyEntry {
                id: key_id.clone(),
                key_type: KEY_TYPE.to_string(),
                controller: format!("did:sov:{did}"),
                public_key_base58: verkey.to_string(),
            }],
            authentication: vec![AuthenticationEntry {
                auth_type: AUTHENTICATION_TYPE.to_string(),
                public_key: key_id,
            }],
            service: vec![ServiceEntry {
                id: format!("did:sov:{did};indy"),
                service_type: SERVICE_TYPE.to_string(),
                priority: 0,
                recipient_keys: vec![verkey.to_string()],
                routing_keys: Vec::new(),
                service_endpoint: endpoint.to_string(),
            }],
        }
    }

    /// First listed verkey.
    #[must_use]
    pub fn verkey(&self) -> Option<&str> {
        self.public_key
            .first()
            .map(|key| key.public_key_base58.as_str())
    }

    /// Endpoint of the first service.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.service
            .first()
            .map(|service| service.service_endpoint.as_str())
    }
}

/// Invitee's request to connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    /// Message id; also the thread id of the handshake.
    #[serde(rename = "@id")]
    pub id: String,
    /// Invitee's label.
    pub label: String,
    /// Invitee's DID material.
    pub connection: Connection,
}

/// Inviter's response carrying its signed DID material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionResponse {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "~thread")]
    pub thread: Thread,
    #[serde(rename = "connection~sig")]
    pub connection_sig: SignatureField,
}

/// Detached signature over a timestamped connection block.
///
/// `sig_data` is base64url of an 8-byte big-endian unix timestamp followed
/// by the connection JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureField {
    #[serde(rename = "@type")]
    pub sig_type: String,
    /// Signature over the decoded `sig_data`, base64url.
    pub signature: String,
    /// Signed bytes, base64url.
    pub sig_data: String,
    /// Verkey that produced the signature.
    pub signer: Verkey,
}

impl SignatureField {
    /// Bytes that must be signed for `connection` at `timestamp`.
    pub fn signing_input(connection: &Connection, timestamp: u64) -> Result<Vec<u8>, ProtocolError> {
        let mut data = timestamp.to_be_bytes().to_vec();
        data.extend(serde_json::to_vec(connection)?);
        Ok(data)
    }

    /// Assemble the block from already-signed bytes.
    pub fn new(signing_input: &[u8], signature: &[u8], signer: &str) -> Self {
        Self {
            sig_type: SIGNATURE_TYPE.to_string(),
            signature: URL_SAFE_NO_PAD.encode(signature),
            sig_data: URL_SAFE_NO_PAD.encode(signing_input),
            signer: signer.to_string(),
        }
    }

    /// Decoded signed bytes and signature.
    pub fn decode(&self) -> Result<(Vec<u8>, Vec<u8>), ProtocolError> {
        let data = decode_b64(&self.sig_data)?;
        let signature = decode_b64(&self.signature)?;
        Ok((data, signature))
    }

    /// The connection block inside decoded signed bytes.
    pub fn connection(signed: &[u8]) -> Result<Connection, ProtocolError> {
        if signed.len() <= TIMESTAMP_LEN {
            return Err(ProtocolError::MalformedMessage(
                "sig_data shorter than its timestamp".into(),
            ));
        }
        Ok(serde_json::from_slice(&signed[TIMESTAMP_LEN..])?)
    }
}

/// Tolerates padded input from other agents.
pub(crate) fn decode_b64(value: &str) -> Result<Vec<u8>, ProtocolError> {
    URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|e| ProtocolError::MalformedMessage(format!("base64: {e}")))
}

/// Final acknowledgement from the invitee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(rename = "@id")]
    pub id: String,
    pub status: String,
    #[serde(rename = "~thread")]
    pub thread: Thread,
}

impl Ack {
    /// Successful acknowledgement for `thid`.
    pub fn ok(id: impl Into<String>, thid: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: "OK".to_string(),
            thread: Thread { thid: thid.into() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invitation_carries_type_tag() {
        let invitation = Invitation::new("inv-1", "Inviter", "inviter-chan", "Key1".into());
        let json = serde_json::to_value(DidExchangeMessage::Invitation(invitation)).unwrap();

        assert_eq!(json["@type"], INVITATION_TYPE);
        assert_eq!(json["@id"], "inv-1");
        assert_eq!(json["recipientKeys"][0], "Key1");
    }

    #[test]
    fn test_request_parses_from_wire_json() {
        let wire = json!({
            "@type": REQUEST_TYPE,
            "@id": "thread-1",
            "label": "Invitee",
            "connection": {
                "DID": "Did1",
                "DIDDoc": DidDoc::new("Did1", "Verkey1", "invitee-chan"),
            }
        });

        let message: DidExchangeMessage = serde_json::from_value(wire).unwrap();
        let DidExchangeMessage::Request(request) = &message else {
            panic!("expected request, got {}", message.kind());
        };
        assert_eq!(message.thread_id(), "thread-1");
        assert_eq!(request.connection.did_doc.verkey(), Some("Verkey1"));
        assert_eq!(request.connection.did_doc.endpoint(), Some("invitee-chan"));
    }

    #[test]
    fn test_ack_thread_field() {
        let json = serde_json::to_value(DidExchangeMessage::Ack(Ack::ok("a-1", "thread-1"))).unwrap();

        assert_eq!(json["@type"], ACK_TYPE);
        assert_eq!(json["~thread"]["thid"], "thread-1");
        assert_eq!(json["status"], "OK");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let wire = json!({"@type": "https://didcomm.org/trust_ping/1.0/ping", "@id": "x"});
        assert!(serde_json::from_value::<DidExchangeMessage>(wire).is_err());
    }

    #[test]
    fn test_signature_block_carries_connection() {
        let connection = Connection::new("Did1", "Verkey1", "inviter-chan");
        let input = SignatureField::signing_input(&connection, 1_700_000_000).unwrap();
        let field = SignatureField::new(&input, &[7u8; 64], "Signer");

        let (data, signature) = field.decode().unwrap();
        assert_eq!(data, input);
        assert_eq!(signature, vec![7u8; 64]);
        assert_eq!(&data[..8], &1_700_000_000u64.to_be_bytes());
        assert_eq!(SignatureField::connection(&data).unwrap(), connection);
    }

    #[test]
    fn test_truncated_sig_data_rejected() {
        assert!(matches!(
            SignatureField::connection(&[0u8; 8]),
            Err(ProtocolError::MalformedMessage(_))
        ));
    }
}
