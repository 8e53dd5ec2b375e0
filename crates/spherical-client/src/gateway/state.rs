//! Connection state types.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// State of the gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport has been opened, or the connection was shut down.
    Closed,
    /// Transport opened; waiting for the ready payload.
    Negotiating,
    /// Session is ready.
    Ready,
    /// Transport failed or was closed by the server.
    Unhealthy,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Negotiating => "negotiating",
            Self::Ready => "ready",
            Self::Unhealthy => "unhealthy",
        };
        f.write_str(name)
    }
}

/// Atomic wrapper for connection state.
///
/// Written only by the task that owns the connection; read by any handle.
#[derive(Debug)]
pub struct AtomicConnectionState(AtomicU8);

impl AtomicConnectionState {
    /// Create a new atomic state.
    #[must_use]
    pub const fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Load the current state.
    #[must_use]
    pub fn load(&self) -> ConnectionState {
        match self.0.load(Ordering::SeqCst) {
            0 => ConnectionState::Closed,
            1 => ConnectionState::Negotiating,
            2 => ConnectionState::Ready,
            _ => ConnectionState::Unhealthy,
        }
    }

    /// Store a new state.
    pub fn store(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

impl Default for AtomicConnectionState {
    fn default() -> Self {
        Self::new(ConnectionState::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_enum() {
        assert_eq!(ConnectionState::Closed as u8, 0);
        assert_eq!(ConnectionState::Negotiating as u8, 1);
        assert_eq!(ConnectionState::Ready as u8, 2);
        assert_eq!(ConnectionState::Unhealthy as u8, 3);
    }

    #[test]
    fn test_atomic_connection_state() {
        let state = AtomicConnectionState::default();
        assert_eq!(state.load(), ConnectionState::Closed);

        state.store(ConnectionState::Negotiating);
        assert_eq!(state.load(), ConnectionState::Negotiating);

        state.store(ConnectionState::Ready);
        assert_eq!(state.load(), ConnectionState::Ready);

        state.store(ConnectionState::Unhealthy);
        assert_eq!(state.load(), ConnectionState::Unhealthy);
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Negotiating.to_string(), "negotiating");
        assert_eq!(ConnectionState::Unhealthy.to_string(), "unhealthy");
    }
}
