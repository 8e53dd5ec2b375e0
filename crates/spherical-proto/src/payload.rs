//! Gateway payload definitions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::{decode_frame, encode_frame};
use crate::error::ProtoError;

/// Numeric payload identifiers carried in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum PayloadId {
    /// Client hello carrying the session token.
    Hello = 0,
    /// Server acceptance carrying the heartbeat interval.
    Accepted = 1,
    /// Heartbeat, echoed by the client.
    Heartbeat = 2,
    /// Request to join a guild on another node.
    JoinGuild = 3,
    /// Session is ready.
    Ready = 4,
    /// A guild changed.
    GuildUpdate = 5,
}

impl From<PayloadId> for u16 {
    fn from(id: PayloadId) -> Self {
        id as Self
    }
}

impl TryFrom<u16> for PayloadId {
    type Error = ProtoError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Hello),
            1 => Ok(Self::Accepted),
            2 => Ok(Self::Heartbeat),
            3 => Ok(Self::JoinGuild),
            4 => Ok(Self::Ready),
            5 => Ok(Self::GuildUpdate),
            other => Err(ProtoError::UnknownPayloadId(other)),
        }
    }
}

/// Body of [`Payload::Hello`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloBody {
    /// Session token. Sent as nil when the client has none.
    pub token: Option<String>,
    /// Whether the token is a cross node token.
    pub cross_node: bool,
}

/// Body of [`Payload::Accepted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedBody {
    /// Server heartbeat interval in milliseconds.
    pub heartbeat_interval: u64,
}

/// Body of [`Payload::Heartbeat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatBody {
    /// Opaque heartbeat identifier.
    pub id: String,
}

/// Body of [`Payload::JoinGuild`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGuildBody {
    /// Node hosting the guild.
    pub hostname: String,
    /// Invite code for the guild.
    pub invite_code: String,
    /// Correlation id for the reply.
    pub reply_id: String,
}

impl JoinGuildBody {
    /// Build a join request with a fresh correlation id.
    #[must_use]
    pub fn new(hostname: impl Into<String>, invite_code: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            invite_code: invite_code.into(),
            reply_id: Uuid::new_v4().to_string(),
        }
    }
}

/// A guild as reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Guild {
    /// Guild id, unique per hostname.
    pub id: u64,
    /// Node hosting the guild.
    pub hostname: String,
    /// Whether the hosting node could be reached.
    pub available: bool,
}

/// Body of [`Payload::Ready`].
///
/// The ready body is not finalized; unknown fields are ignored and missing
/// lists decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadyBody {
    /// Guilds whose nodes answered in time.
    pub available_guilds: Vec<Guild>,
    /// Guilds whose nodes did not answer.
    pub unavailable_guilds: Vec<Guild>,
}

/// A typed gateway payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Client hello.
    Hello(HelloBody),
    /// Server acceptance.
    Accepted(AcceptedBody),
    /// Heartbeat.
    Heartbeat(HeartbeatBody),
    /// Join guild request.
    JoinGuild(JoinGuildBody),
    /// Session ready.
    Ready(ReadyBody),
    /// Guild update.
    GuildUpdate(Guild),
}

impl Payload {
    /// Hello for a regular (not cross node) session.
    #[must_use]
    pub const fn hello(token: Option<String>) -> Self {
        Self::Hello(HelloBody {
            token,
            cross_node: false,
        })
    }

    /// Heartbeat with the given id.
    #[must_use]
    pub fn heartbeat(id: impl Into<String>) -> Self {
        Self::Heartbeat(HeartbeatBody { id: id.into() })
    }

    /// Join guild request with a fresh correlation id.
    #[must_use]
    pub fn join_guild(hostname: impl Into<String>, invite_code: impl Into<String>) -> Self {
        Self::JoinGuild(JoinGuildBody::new(hostname, invite_code))
    }

    /// Payload id written in the frame header.
    #[must_use]
    pub const fn id(&self) -> PayloadId {
        match self {
            Self::Hello(_) => PayloadId::Hello,
            Self::Accepted(_) => PayloadId::Accepted,
            Self::Heartbeat(_) => PayloadId::Heartbeat,
            Self::JoinGuild(_) => PayloadId::JoinGuild,
            Self::Ready(_) => PayloadId::Ready,
            Self::GuildUpdate(_) => PayloadId::GuildUpdate,
        }
    }

    /// Encode to a wire frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be serialized.
    pub fn encode(&self) -> Result<Vec<u8>, ProtoError> {
        let id = u16::from(self.id());
        match self {
            Self::Hello(body) => encode_frame(id, body),
            Self::Accepted(body) => encode_frame(id, body),
            Self::Heartbeat(body) => encode_frame(id, body),
            Self::JoinGuild(body) => encode_frame(id, body),
            Self::Ready(body) => encode_frame(id, body),
            Self::GuildUpdate(body) => encode_frame(id, body),
        }
    }

    /// Decode a wire frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is truncated, the id is unknown, or the
    /// body does not match the shape the id requires.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtoError> {
        let frame = decode_frame(bytes)?;
        let payload = match PayloadId::try_from(frame.id)? {
            PayloadId::Hello => Self::Hello(frame.body()?),
            PayloadId::Accepted => Self::Accepted(frame.body()?),
            PayloadId::Heartbeat => Self::Heartbeat(frame.body()?),
            PayloadId::JoinGuild => Self::JoinGuild(frame.body()?),
            PayloadId::Ready => Self::Ready(frame.body()?),
            PayloadId::GuildUpdate => Self::GuildUpdate(frame.body()?),
        };
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::HEADER_LEN;
    use proptest::prelude::*;
    use serde::de::IgnoredAny;
    use std::collections::BTreeMap;
    use test_case::test_case;

    #[test_case(PayloadId::Hello, 0)]
    #[test_case(PayloadId::Accepted, 1)]
    #[test_case(PayloadId::Heartbeat, 2)]
    #[test_case(PayloadId::JoinGuild, 3)]
    #[test_case(PayloadId::Ready, 4)]
    #[test_case(PayloadId::GuildUpdate, 5)]
    fn test_payload_id_numbering(id: PayloadId, raw: u16) {
        assert_eq!(u16::from(id), raw);
        assert_eq!(PayloadId::try_from(raw).expect("known id"), id);
    }

    #[test]
    fn test_payload_id_unknown() {
        let err = PayloadId::try_from(6).unwrap_err();
        assert!(matches!(err, ProtoError::UnknownPayloadId(6)));
    }

    #[test]
    fn test_hello_header_and_fields() {
        let bytes = Payload::hello(Some("tok".to_string()))
            .encode()
            .expect("encode");
        assert_eq!(&bytes[..HEADER_LEN], &[0, 0]);

        let fields: BTreeMap<String, IgnoredAny> =
            rmp_serde::from_slice(&bytes[HEADER_LEN..]).expect("map");
        assert!(fields.contains_key("token"));
        assert!(fields.contains_key("cross_node"));
    }

    #[test]
    fn test_hello_without_token_is_nil() {
        let payload = Payload::hello(None);
        let decoded = Payload::decode(&payload.encode().expect("encode")).expect("decode");
        assert_eq!(decoded, payload);
        if let Payload::Hello(body) = decoded {
            assert!(body.token.is_none());
            assert!(!body.cross_node);
        } else {
            panic!("expected Hello");
        }
    }

    #[test]
    fn test_accepted_decodes_interval() {
        let bytes = encode_frame(
            1,
            &AcceptedBody {
                heartbeat_interval: 30_000,
            },
        )
        .expect("encode");
        let payload = Payload::decode(&bytes).expect("decode");
        assert_eq!(
            payload,
            Payload::Accepted(AcceptedBody {
                heartbeat_interval: 30_000
            })
        );
    }

    #[test]
    fn test_ready_tolerates_empty_map() {
        let empty: BTreeMap<String, u8> = BTreeMap::new();
        let bytes = encode_frame(4, &empty).expect("encode");
        let payload = Payload::decode(&bytes).expect("decode");
        assert_eq!(payload, Payload::Ready(ReadyBody::default()));
    }

    #[test]
    fn test_ready_ignores_unknown_fields() {
        let mut body = BTreeMap::new();
        body.insert("session_id", "abc");
        let bytes = encode_frame(4, &body).expect("encode");
        assert!(matches!(
            Payload::decode(&bytes).expect("decode"),
            Payload::Ready(_)
        ));
    }

    #[test]
    fn test_join_guild_has_unique_reply_ids() {
        let a = JoinGuildBody::new("node.example.com", "invite");
        let b = JoinGuildBody::new("node.example.com", "invite");
        assert_ne!(a.reply_id, b.reply_id);
        assert!(Uuid::parse_str(&a.reply_id).is_ok());
    }

    #[test]
    fn test_decode_rejects_unknown_id() {
        let bytes = encode_frame(99, &()).expect("encode");
        let err = Payload::decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtoError::UnknownPayloadId(99)));
    }

    #[test]
    fn test_decode_rejects_truncated() {
        let err = Payload::decode(&[2]).unwrap_err();
        assert!(matches!(err, ProtoError::Truncated(1)));
    }

    #[test]
    fn test_decode_rejects_mismatched_body() {
        // A heartbeat body under the accepted id.
        let bytes = encode_frame(
            1,
            &HeartbeatBody {
                id: "abc".to_string(),
            },
        )
        .expect("encode");
        let err = Payload::decode(&bytes).unwrap_err();
        assert!(matches!(err, ProtoError::Decoding(_)));
    }

    fn arb_guild() -> impl Strategy<Value = Guild> {
        (any::<u64>(), "[a-z.]{0,16}", any::<bool>()).prop_map(|(id, hostname, available)| {
            Guild {
                id,
                hostname,
                available,
            }
        })
    }

    fn arb_payload() -> impl Strategy<Value = Payload> {
        prop_oneof![
            proptest::option::of(".{0,32}").prop_map(Payload::hello),
            any::<u64>().prop_map(|ms| Payload::Accepted(AcceptedBody {
                heartbeat_interval: ms
            })),
            ".{0,32}".prop_map(Payload::heartbeat),
            (".{0,16}", ".{0,16}", ".{0,16}").prop_map(|(hostname, invite_code, reply_id)| {
                Payload::JoinGuild(JoinGuildBody {
                    hostname,
                    invite_code,
                    reply_id,
                })
            }),
            (
                proptest::collection::vec(arb_guild(), 0..4),
                proptest::collection::vec(arb_guild(), 0..4)
            )
                .prop_map(|(available_guilds, unavailable_guilds)| {
                    Payload::Ready(ReadyBody {
                        available_guilds,
                        unavailable_guilds,
                    })
                }),
            arb_guild().prop_map(Payload::GuildUpdate),
        ]
    }

    proptest! {
        #[test]
        fn payload_roundtrip(payload in arb_payload()) {
            let bytes = payload.encode().unwrap();
            prop_assert_eq!(u16::from_be_bytes([bytes[0], bytes[1]]), u16::from(payload.id()));
            prop_assert_eq!(Payload::decode(&bytes).unwrap(), payload);
        }

        #[test]
        fn short_frames_never_decode(bytes in proptest::collection::vec(any::<u8>(), 0..2)) {
            prop_assert!(matches!(Payload::decode(&bytes), Err(ProtoError::Truncated(_))));
        }
    }
}
