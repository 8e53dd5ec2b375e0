//! Error types for the spherical-proto crate.

use thiserror::Error;

/// Errors that can occur while encoding or decoding gateway traffic.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// Frame is shorter than the id header.
    #[error("frame too short: expected at least 2 header bytes, got {0}")]
    Truncated(usize),

    /// Header carries an id no payload is defined for.
    #[error("unknown payload id: {0}")]
    UnknownPayloadId(u16),

    /// Failed to serialize a payload body.
    #[error("encoding error: {0}")]
    Encoding(#[from] rmp_serde::encode::Error),

    /// Failed to deserialize a payload body.
    #[error("decoding error: {0}")]
    Decoding(#[from] rmp_serde::decode::Error),

    /// Close frame reason was not a valid close payload.
    #[error("invalid close reason: {0}")]
    CloseReason(#[from] serde_json::Error),

    /// Gateway endpoint could not be derived from a base URL.
    #[error("invalid gateway endpoint: {0}")]
    Endpoint(String),
}
