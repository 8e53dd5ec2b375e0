//! Close frame reasons sent by the gateway.

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;

/// Reason used when the close frame text cannot be parsed.
pub const UNKNOWN_CLOSE_REASON: &str = "unable to determine reason from payload";

/// Structured reason carried in a close frame, encoded as JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseReason {
    /// Human readable reason.
    pub reason: String,
    /// Whether the client should reconnect.
    pub reconnect: bool,
}

impl Default for CloseReason {
    fn default() -> Self {
        Self {
            reason: UNKNOWN_CLOSE_REASON.to_string(),
            reconnect: false,
        }
    }
}

impl CloseReason {
    /// Create a close reason.
    #[must_use]
    pub fn new(reason: impl Into<String>, reconnect: bool) -> Self {
        Self {
            reason: reason.into(),
            reconnect,
        }
    }

    /// Parse the JSON close text.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::CloseReason`] if the text is not a close payload.
    pub fn parse(text: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse the close text, falling back to a non-reconnecting reason.
    #[must_use]
    pub fn from_close_text(text: &str) -> Self {
        Self::parse(text).unwrap_or_default()
    }

    /// Serialize to the JSON text placed in a close frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtoError::CloseReason`] if serialization fails.
    pub fn to_close_text(&self) -> Result<String, ProtoError> {
        Ok(serde_json::to_string(self)?)
    }
}
