//! Error types for spherical-client.

use spherical_proto::ProtoError;
use thiserror::Error;

/// Errors that can occur in client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No transport is open.
    #[error("gateway not connected")]
    NotConnected,

    /// The transport rejected an outbound frame.
    #[error("gateway transport failed: {0}")]
    Transport(String),

    /// The task owning the gateway connection has stopped.
    #[error("gateway task has stopped")]
    GatewayStopped,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Token store error.
    #[error("token store error: {0}")]
    TokenStore(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtoError),
}
