//! Gateway connection.
//!
//! Keeps one persistent session with the Spherical gateway, reconnecting
//! with backoff and notifying registered handlers as the session becomes
//! ready or drops.

mod connection;
mod handle;
mod heartbeat;
mod reconnect;
mod state;
mod transport;
mod ws;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{DisconnectHandlerId, GatewayConnection, GatewayOptions, ReadyHandlerId};
pub use handle::{DisconnectSubscription, GatewayHandle, ReadySubscription};
pub use heartbeat::{HeartbeatConfig, InboundWatchdog};
pub use reconnect::ReconnectConfig;
pub use state::{AtomicConnectionState, ConnectionState};
pub use transport::{
    ConnectionEvent, ConnectionEvents, Connector, EventSink, Transport, TransportEvent,
};
pub use ws::WsConnector;
