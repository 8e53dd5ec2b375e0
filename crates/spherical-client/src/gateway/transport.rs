//! Transport abstraction between the connection state machine and a socket.

use tokio::sync::mpsc;

use crate::error::ClientError;

/// Something that happened on a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket is open.
    Open,
    /// A binary frame arrived.
    Frame(Vec<u8>),
    /// The socket failed.
    Error(String),
    /// The socket closed; carries the close frame reason text.
    Closed(String),
}

/// A transport event tagged with the generation of the transport it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    /// Generation of the emitting transport.
    pub generation: u64,
    /// The event.
    pub event: TransportEvent,
}

/// Receiving side of the connection event channel.
pub type ConnectionEvents = mpsc::UnboundedReceiver<ConnectionEvent>;

/// Handed to a transport so it can report events for its own generation.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl EventSink {
    pub(crate) const fn new(generation: u64, tx: mpsc::UnboundedSender<ConnectionEvent>) -> Self {
        Self { generation, tx }
    }

    /// Generation this sink reports for.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Report an event. Returns `false` if the connection is gone.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(ConnectionEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// An open (or opening) socket.
pub trait Transport: Send {
    /// Queue a frame for sending. Frames are written in call order.
    fn send(&mut self, frame: Vec<u8>) -> Result<(), ClientError>;

    /// Close the socket. No further events are expected afterwards.
    fn close(&mut self);
}

/// Opens transports.
pub trait Connector: Send {
    /// Start opening a transport that reports through `sink`.
    ///
    /// Must not block; connection progress is reported as events.
    fn open(&mut self, sink: EventSink) -> Box<dyn Transport>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_tags_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(7, tx);

        assert!(sink.emit(TransportEvent::Open));

        let event = rx.try_recv().expect("event queued");
        assert_eq!(
            event,
            ConnectionEvent {
                generation: 7,
                event: TransportEvent::Open,
            }
        );
        assert_eq!(sink.generation(), 7);
    }

    #[test]
    fn test_sink_reports_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(1, tx);
        drop(rx);
        assert!(!sink.emit(TransportEvent::Error("gone".to_string())));
    }
}
