//! Gateway connection state machine.
//!
//! [`GatewayConnection`] does no IO of its own. It opens transports through a
//! [`Connector`], is fed [`ConnectionEvent`]s and timer ticks by its driver
//! (see [`super::GatewayHandle`]), and fans lifecycle changes out to the
//! registered handlers. Everything runs on the driver's single task, so one
//! inbound frame is fully handled (echo, state change, handler fan-out) before
//! the next is looked at.

use std::sync::Arc;
use std::time::Duration;

use spherical_proto::{CloseReason, JoinGuildBody, Payload};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::error::ClientError;
use crate::registry::{CallbackHandle, CallbackRegistry};
use crate::token::TokenStore;

use super::heartbeat::{HeartbeatConfig, InboundWatchdog};
use super::reconnect::ReconnectConfig;
use super::state::{AtomicConnectionState, ConnectionState};
use super::transport::{
    ConnectionEvent, ConnectionEvents, Connector, EventSink, Transport, TransportEvent,
};

/// Handle of a registered ready handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadyHandlerId(CallbackHandle);

/// Handle of a registered disconnect handler.
///
/// A disconnect handler lives in both the no-reconnect and the reconnect
/// registries; the id holds both entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisconnectHandlerId {
    no_reconnect: CallbackHandle,
    reconnect: CallbackHandle,
}

/// Tunables for a gateway connection.
#[derive(Debug, Clone, Default)]
pub struct GatewayOptions {
    /// Retry policy after failures.
    pub reconnect: ReconnectConfig,
    /// Inbound watchdog policy.
    pub heartbeat: HeartbeatConfig,
}

/// The gateway connection state machine.
pub struct GatewayConnection {
    connector: Box<dyn Connector>,
    tokens: Arc<dyn TokenStore>,
    reconnect: ReconnectConfig,
    state: Arc<AtomicConnectionState>,
    heartbeat_interval: Option<Duration>,
    transport: Option<Box<dyn Transport>>,
    generation: u64,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    watchdog: InboundWatchdog,
    failures: u32,
    retry_at: Option<Instant>,
    ready_handlers: CallbackRegistry<()>,
    no_reconnect_handlers: CallbackRegistry<()>,
    reconnect_handlers: CallbackRegistry<()>,
}

impl GatewayConnection {
    /// Create a closed connection.
    ///
    /// Returns the connection and the receiver its transports report to. The
    /// driver must feed every received event back through [`Self::handle_event`].
    pub fn new(
        connector: impl Connector + 'static,
        tokens: Arc<dyn TokenStore>,
        options: GatewayOptions,
    ) -> (Self, ConnectionEvents) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connection = Self {
            connector: Box::new(connector),
            tokens,
            reconnect: options.reconnect,
            state: Arc::new(AtomicConnectionState::default()),
            heartbeat_interval: None,
            transport: None,
            generation: 0,
            events_tx,
            watchdog: InboundWatchdog::new(options.heartbeat),
            failures: 0,
            retry_at: None,
            ready_handlers: CallbackRegistry::new(),
            no_reconnect_handlers: CallbackRegistry::new(),
            reconnect_handlers: CallbackRegistry::new(),
        };
        (connection, events_rx)
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.load()
    }

    /// Shared view of the state for readers on other tasks.
    #[must_use]
    pub fn shared_state(&self) -> Arc<AtomicConnectionState> {
        Arc::clone(&self.state)
    }

    /// Heartbeat interval announced by the server, once accepted.
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat_interval
    }

    /// Whether a transport object exists (opening or open).
    #[must_use]
    pub const fn has_transport(&self) -> bool {
        self.transport.is_some()
    }

    /// Generation of the current (or most recent) transport.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Open a transport unless one already exists.
    pub fn start(&mut self) {
        if self.transport.is_some() {
            trace!(state = %self.state(), "start ignored, transport already present");
            return;
        }

        self.generation += 1;
        self.heartbeat_interval = None;
        self.watchdog.clear();
        self.retry_at = None;
        self.set_state(ConnectionState::Negotiating);

        debug!(generation = self.generation, "starting gateway transport");
        let sink = EventSink::new(self.generation, self.events_tx.clone());
        self.transport = Some(self.connector.open(sink));
    }

    /// Close the transport and cancel pending retries. No handlers run.
    pub fn shutdown(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        // Invalidate anything the old transport still has in flight.
        self.generation += 1;
        self.heartbeat_interval = None;
        self.watchdog.clear();
        self.retry_at = None;
        self.failures = 0;
        self.set_state(ConnectionState::Closed);
        info!("gateway connection shut down");
    }

    /// Encode and send a payload.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotConnected`] if there is no transport, or an
    /// encoding/transport error.
    pub fn send(&mut self, payload: &Payload) -> Result<(), ClientError> {
        let transport = self.transport.as_mut().ok_or(ClientError::NotConnected)?;
        let frame = payload.encode()?;
        transport.send(frame)
    }

    /// Send a join guild request and return its correlation id.
    ///
    /// # Errors
    ///
    /// Same as [`Self::send`].
    pub fn join_guild(
        &mut self,
        hostname: impl Into<String>,
        invite_code: impl Into<String>,
    ) -> Result<String, ClientError> {
        let body = JoinGuildBody::new(hostname, invite_code);
        let reply_id = body.reply_id.clone();
        self.send(&Payload::JoinGuild(body))?;
        Ok(reply_id)
    }

    /// Register a handler run each time the session becomes ready.
    pub fn add_ready_handler<F>(&mut self, handler: F) -> ReadyHandlerId
    where
        F: FnMut() + Send + 'static,
    {
        ReadyHandlerId(self.ready_handlers.register(handler))
    }

    /// Remove a ready handler. Unknown ids are ignored.
    pub fn remove_ready_handler(&mut self, id: ReadyHandlerId) {
        self.ready_handlers.unregister(id.0);
    }

    /// Register a handler run on disconnect with the server's reconnect intent.
    pub fn add_disconnect_handler<F>(&mut self, handler: F) -> DisconnectHandlerId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        let on_final = Arc::clone(&handler);
        let no_reconnect = self.no_reconnect_handlers.register(move || on_final(false));
        let reconnect = self.reconnect_handlers.register(move || handler(true));
        DisconnectHandlerId {
            no_reconnect,
            reconnect,
        }
    }

    /// Remove a disconnect handler. Unknown ids are ignored.
    pub fn remove_disconnect_handler(&mut self, id: DisconnectHandlerId) {
        self.no_reconnect_handlers.unregister(id.no_reconnect);
        self.reconnect_handlers.unregister(id.reconnect);
    }

    /// Earliest timer the driver has to wake up for.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.watchdog.deadline(), self.retry_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fire any timers due at `now`.
    pub fn poll_timers(&mut self, now: Instant) {
        if self.watchdog.is_expired(now) {
            warn!(
                interval = ?self.heartbeat_interval,
                "no inbound traffic from gateway, dropping transport"
            );
            if let Some(mut transport) = self.transport.take() {
                transport.close();
            }
            self.on_error("inbound heartbeat timed out", now);
        }

        if self.retry_at.is_some_and(|at| now >= at) {
            self.retry_at = None;
            debug!(attempt = self.failures, "retry delay elapsed");
            self.start();
        }
    }

    /// Apply one transport event.
    pub fn handle_event(&mut self, event: ConnectionEvent, now: Instant) {
        if event.generation != self.generation || self.transport.is_none() {
            trace!(
                generation = event.generation,
                current = self.generation,
                "dropping event from stale transport"
            );
            return;
        }

        match event.event {
            TransportEvent::Open => self.on_open(),
            TransportEvent::Frame(frame) => self.on_frame(frame, now),
            TransportEvent::Error(error) => {
                self.transport = None;
                self.on_error(&error, now);
            }
            TransportEvent::Closed(text) => self.on_close(&text, now),
        }
    }

    fn on_open(&mut self) {
        debug!(generation = self.generation, "gateway transport open, sending hello");
        let hello = Payload::hello(self.tokens.get());
        if let Err(e) = self.send(&hello) {
            warn!(error = %e, "failed to send hello");
        }
    }

    fn on_frame(&mut self, frame: Vec<u8>, now: Instant) {
        self.watchdog.feed(now);

        let payload = match Payload::decode(&frame) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, len = frame.len(), "dropping undecodable gateway frame");
                return;
            }
        };

        match payload {
            Payload::Accepted(body) => {
                let interval = Duration::from_millis(body.heartbeat_interval);
                info!(interval_ms = body.heartbeat_interval, "gateway accepted session");
                self.heartbeat_interval = Some(interval);
            }
            Payload::Heartbeat(body) => {
                trace!(id = %body.id, "echoing heartbeat");
                if let Some(transport) = self.transport.as_mut() {
                    if let Err(e) = transport.send(frame) {
                        warn!(error = %e, "failed to echo heartbeat");
                    }
                }
            }
            Payload::Ready(body) => {
                info!(
                    available = body.available_guilds.len(),
                    unavailable = body.unavailable_guilds.len(),
                    "gateway session ready"
                );
                self.set_state(ConnectionState::Ready);
                self.failures = 0;
                if let Some(interval) = self.heartbeat_interval {
                    self.watchdog.arm(interval, now);
                }
                self.ready_handlers.run_all();
            }
            other => {
                debug!(id = ?other.id(), "ignoring unhandled gateway payload");
            }
        }
    }

    fn on_error(&mut self, error: &str, now: Instant) {
        warn!(%error, generation = self.generation, "gateway transport error");
        self.watchdog.clear();
        self.heartbeat_interval = None;
        self.set_state(ConnectionState::Unhealthy);
        self.no_reconnect_handlers.run_all();
        let _ = self.schedule_retry(now);
    }

    fn on_close(&mut self, text: &str, now: Instant) {
        let reason = CloseReason::from_close_text(text);
        info!(
            reason = %reason.reason,
            reconnect = reason.reconnect,
            "gateway closed connection"
        );
        self.watchdog.clear();
        self.heartbeat_interval = None;
        self.transport = None;
        self.set_state(ConnectionState::Unhealthy);

        if reason.reconnect && self.schedule_retry(now) {
            self.reconnect_handlers.run_all();
        } else {
            self.retry_at = None;
            self.failures = 0;
            self.no_reconnect_handlers.run_all();
        }
    }

    /// Returns `false` once retries are exhausted.
    fn schedule_retry(&mut self, now: Instant) -> bool {
        self.failures = self.failures.saturating_add(1);
        if !self.reconnect.should_reconnect(self.failures) {
            warn!(attempts = self.failures, "giving up on gateway reconnection");
            return false;
        }

        let delay = self.reconnect.delay_for_attempt(self.failures);
        if delay.is_zero() {
            self.start();
        } else {
            debug!(attempt = self.failures, ?delay, "scheduling gateway reconnect");
            self.retry_at = Some(now + delay);
        }
        true
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.load();
        if previous != state {
            trace!(from = %previous, to = %state, "gateway state change");
            self.state.store(state);
        }
    }
}

impl std::fmt::Debug for GatewayConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConnection")
            .field("state", &self.state.load())
            .field("generation", &self.generation)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("has_transport", &self.transport.is_some())
            .field("failures", &self.failures)
            .field("ready_handlers", &self.ready_handlers.len())
            .field("no_reconnect_handlers", &self.no_reconnect_handlers.len())
            .field("reconnect_handlers", &self.reconnect_handlers.len())
            .finish_non_exhaustive()
    }
}
