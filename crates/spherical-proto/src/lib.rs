//! # spherical-proto
//!
//! Wire protocol definitions for the Spherical gateway.
//!
//! A frame is a 2-byte big-endian payload id followed by a MessagePack body.
//! [`codec`] handles the framing without looking at body shapes, [`payload`]
//! layers the typed payloads on top of it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod close;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod payload;

pub use close::CloseReason;
pub use codec::{decode_frame, encode_frame, Frame, HEADER_LEN};
pub use endpoint::{gateway_url, GATEWAY_PATH};
pub use error::ProtoError;
pub use payload::{
    AcceptedBody, Guild, HeartbeatBody, HelloBody, JoinGuildBody, Payload, PayloadId, ReadyBody,
};
