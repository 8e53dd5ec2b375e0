//! Inbound heartbeat watchdog.
//!
//! The gateway sends a heartbeat every `heartbeat_interval` once the session
//! is ready. If nothing at all arrives for `interval * timeout_multiplier`,
//! the transport is considered dead.

use std::time::Duration;

use tokio::time::Instant;

/// Configuration for the inbound watchdog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Multiple of the server heartbeat interval to wait for inbound traffic.
    /// Zero disables the watchdog.
    pub timeout_multiplier: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            timeout_multiplier: 3,
        }
    }
}

/// Deadline tracker for inbound traffic.
#[derive(Debug)]
pub struct InboundWatchdog {
    config: HeartbeatConfig,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
}

impl InboundWatchdog {
    /// Create a disarmed watchdog.
    #[must_use]
    pub const fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            timeout: None,
            deadline: None,
        }
    }

    /// Arm the watchdog for the given server heartbeat interval.
    pub fn arm(&mut self, interval: Duration, now: Instant) {
        if self.config.timeout_multiplier == 0 || interval.is_zero() {
            self.clear();
            return;
        }
        let timeout = interval.saturating_mul(self.config.timeout_multiplier);
        self.timeout = Some(timeout);
        self.deadline = Some(now + timeout);
    }

    /// Record inbound traffic, pushing the deadline out.
    pub fn feed(&mut self, now: Instant) {
        if let Some(timeout) = self.timeout {
            self.deadline = Some(now + timeout);
        }
    }

    /// Disarm the watchdog.
    pub fn clear(&mut self) {
        self.timeout = None;
        self.deadline = None;
    }

    /// Current deadline, if armed.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the deadline has passed.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }
}
