use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Errors raised by a transport while connecting or moving frames.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not establish the connection (DNS, refused, handshake).
    #[error("connect failed: {0}")]
    Connect(String),
    /// The established connection broke (read/write error, protocol violation).
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// What happened on a connection, tagged with the attempt that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEvent {
    pub generation: u64,
    pub kind: ConnectionEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEventKind {
    /// Handshake completed; sends may start.
    Opened,
    /// One inbound text payload, undecoded.
    Frame(String),
    /// The peer (or the transport) ended the connection cleanly.
    Closed,
    /// The connection failed. Carries a human-readable reason.
    Failed(String),
}

/// Handle a transport uses to report events back to the event loop.
///
/// Every event is stamped with the generation of the connection attempt so
/// the manager can drop events from attempts it has already torn down.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: UnboundedSender<ConnectionEvent>,
}

impl EventSink {
    pub fn new(generation: u64, tx: UnboundedSender<ConnectionEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `false` once the event loop has gone away.
    pub fn emit(&self, kind: ConnectionEventKind) -> bool {
        self.tx
            .send(ConnectionEvent {
                generation: self.generation,
                kind,
            })
            .is_ok()
    }

    pub fn opened(&self) -> bool {
        self.emit(ConnectionEventKind::Opened)
    }

    pub fn frame(&self, payload: String) -> bool {
        self.emit(ConnectionEventKind::Frame(payload))
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the name of the transport (for logs).
    fn name(&self) -> &str;

    /// Connects to `url` and pumps frames until either side closes.
    ///
    /// Implementations call `sink.opened()` once connected, `sink.frame()` for
    /// every inbound text payload in arrival order, and write every string
    /// received on `outbound` as one text frame. When `outbound` is closed the
    /// transport closes the connection and returns `Ok(())`. A clean close by
    /// the peer also returns `Ok(())`; anything else is an error. Terminal
    /// events (`Closed` / `Failed`) are emitted by the caller from the return
    /// value, not by the transport.
    async fn run(
        &self,
        url: &str,
        outbound: UnboundedReceiver<String>,
        sink: EventSink,
    ) -> Result<(), TransportError>;
}
