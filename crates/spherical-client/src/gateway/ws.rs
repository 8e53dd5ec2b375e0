//! WebSocket transport built on tokio-tungstenite.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};
use url::Url;

use crate::error::ClientError;

use super::transport::{Connector, EventSink, Transport, TransportEvent};

/// Opens WebSocket transports to a fixed gateway URL.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    /// Create a connector for `url` (see [`spherical_proto::gateway_url`]).
    #[must_use]
    pub const fn new(url: Url) -> Self {
        Self { url }
    }

    /// Gateway URL this connector dials.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

impl Connector for WsConnector {
    fn open(&mut self, sink: EventSink) -> Box<dyn Transport> {
        let (tx, rx) = mpsc::unbounded_channel();
        let url = self.url.to_string();
        tokio::spawn(async move {
            socket_task(url, sink, rx).await;
        });
        Box::new(WsTransport { tx })
    }
}

enum Outbound {
    Frame(Vec<u8>),
    Close,
}

/// Handle to a socket task. Dropping it closes the socket.
struct WsTransport {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Transport for WsTransport {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), ClientError> {
        self.tx
            .send(Outbound::Frame(frame))
            .map_err(|_| ClientError::Transport("socket task has exited".to_string()))
    }

    fn close(&mut self) {
        let _ = self.tx.send(Outbound::Close);
    }
}

async fn socket_task(url: String, sink: EventSink, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    let generation = sink.generation();
    debug!(%url, generation, "opening gateway socket");

    let ws_stream = match tokio_tungstenite::connect_async(url.as_str()).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            sink.emit(TransportEvent::Error(format!("failed to connect: {e}")));
            return;
        }
    };

    if !sink.emit(TransportEvent::Open) {
        return;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            out = outbound.recv() => match out {
                Some(Outbound::Frame(frame)) => {
                    if let Err(e) = write.send(Message::Binary(frame)).await {
                        sink.emit(TransportEvent::Error(format!("send failed: {e}")));
                        return;
                    }
                }
                Some(Outbound::Close) | None => {
                    trace!(generation, "closing gateway socket");
                    let _ = write.send(Message::Close(None)).await;
                    return;
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Binary(frame))) => {
                    sink.emit(TransportEvent::Frame(frame));
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.into_owned()).unwrap_or_default();
                    sink.emit(TransportEvent::Closed(reason));
                    // Flush the close reply tungstenite queued to finish the handshake.
                    let _ = write.close().await;
                    return;
                }
                Some(Ok(other)) => {
                    trace!(generation, kind = ?other, "ignoring non-binary message");
                }
                Some(Err(e)) => {
                    sink.emit(TransportEvent::Error(e.to_string()));
                    return;
                }
                None => {
                    sink.emit(TransportEvent::Closed(String::new()));
                    return;
                }
            },
        }
    }
}
