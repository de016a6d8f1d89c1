//! WebSocket transport (tokio-tungstenite).
//!
//! Text frames in both directions. Binary frames are passed on as lossy
//! UTF-8 so the decoder can judge them; ping/pong is left to tungstenite.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::connection::transport::{EventSink, Transport, TransportError};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebSocketTransport {
    connect_timeout: Duration,
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl WebSocketTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    fn name(&self) -> &str {
        "websocket"
    }

    async fn run(
        &self,
        url: &str,
        mut outbound: UnboundedReceiver<String>,
        sink: EventSink,
    ) -> Result<(), TransportError> {
        info!("Connecting to {} (generation {})", url, sink.generation());

        let (stream, response) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| {
                TransportError::Connect(format!(
                    "timed out after {}s",
                    self.connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        debug!("WebSocket handshake complete: HTTP {}", response.status());
        let (mut write, mut read) = stream.split();

        if !sink.opened() {
            // Nobody is listening any more.
            let _ = write.close().await;
            return Ok(());
        }

        let mut sent = 0usize;
        let mut received = 0usize;

        loop {
            tokio::select! {
                next = outbound.recv() => match next {
                    Some(text) => {
                        debug!("Sending frame ({} bytes)", text.len());
                        write
                            .send(WsMessage::Text(text))
                            .await
                            .map_err(|e| TransportError::Protocol(e.to_string()))?;
                        sent += 1;
                    }
                    None => {
                        info!("Outbound channel closed, closing socket ({} sent, {} received)", sent, received);
                        let _ = write.close().await;
                        return Ok(());
                    }
                },
                frame = read.next() => match frame {
                    Some(Ok(WsMessage::Text(text))) => {
                        received += 1;
                        debug!("Received text frame ({} bytes)", text.len());
                        if !sink.frame(text) {
                            return Ok(());
                        }
                    }
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        received += 1;
                        warn!("Received binary frame ({} bytes), forwarding as text", bytes.len());
                        if !sink.frame(String::from_utf8_lossy(&bytes).into_owned()) {
                            return Ok(());
                        }
                    }
                    Some(Ok(WsMessage::Close(frame))) => {
                        info!("Server closed the socket: {:?}", frame);
                        return Ok(());
                    }
                    Some(Ok(_)) => {} // ping / pong / raw frames
                    Some(Err(e)) => {
                        warn!("WebSocket read error: {}", e);
                        return Err(TransportError::Protocol(e.to_string()));
                    }
                    None => {
                        info!("WebSocket stream ended");
                        return Ok(());
                    }
                },
            }
        }
    }
}
