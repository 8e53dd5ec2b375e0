//! In-memory transport for unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use spherical_proto::Payload;

use crate::error::ClientError;

use super::transport::{Connector, EventSink, Transport, TransportEvent};

/// One transport opened by [`MockConnector`], seen from the server side.
#[derive(Clone)]
pub(crate) struct MockSocket {
    sink: EventSink,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<AtomicBool>,
}

impl MockSocket {
    pub(crate) fn open(&self) {
        self.sink.emit(TransportEvent::Open);
    }

    pub(crate) fn deliver(&self, payload: &Payload) {
        self.deliver_raw(payload.encode().expect("encode payload"));
    }

    pub(crate) fn deliver_raw(&self, frame: Vec<u8>) {
        self.sink.emit(TransportEvent::Frame(frame));
    }

    pub(crate) fn fail(&self, error: &str) {
        self.sink.emit(TransportEvent::Error(error.to_string()));
    }

    pub(crate) fn close_with(&self, reason: &str) {
        self.sink.emit(TransportEvent::Closed(reason.to_string()));
    }

    pub(crate) fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    pub(crate) fn sent_payloads(&self) -> Vec<Payload> {
        self.sent_frames()
            .iter()
            .map(|frame| Payload::decode(frame).expect("client sent a valid frame"))
            .collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockTransport {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    closed: Arc<AtomicBool>,
}

impl Transport for MockTransport {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), ClientError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("closed".to_string()));
        }
        self.sent.lock().push(frame);
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Connector recording every transport it opens.
#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    sockets: Arc<Mutex<Vec<MockSocket>>>,
}

impl MockConnector {
    pub(crate) fn opened(&self) -> usize {
        self.sockets.lock().len()
    }

    pub(crate) fn latest(&self) -> MockSocket {
        let sockets = self.sockets.lock();
        sockets.last().expect("a transport was opened").clone()
    }
}

impl Connector for MockConnector {
    fn open(&mut self, sink: EventSink) -> Box<dyn Transport> {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        self.sockets.lock().push(MockSocket {
            sink,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        });
        Box::new(MockTransport { sent, closed })
    }
}
