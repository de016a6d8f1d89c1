//! # Connection Manager
//!
//! Owns the one duplex connection of a session.
//!
//! ```text
//!            open()              Opened
//!  Closed ──────────► Connecting ───────► Open
//!  Failed ─┘              │                │ │
//!                         │ Failed         │ │ Closed / Failed / close()
//!                         ▼                ▼ ▼
//!                      Failed          Closed | Failed
//! ```
//!
//! The transport runs as a tokio task and only talks back through
//! `ConnectionEvent`s on an unbounded channel. The event loop feeds those
//! events into [`ConnectionManager::handle_event`] one at a time, so every
//! state change happens on the loop's thread.
//!
//! Replies carry no request id; the manager assumes the next reply answers
//! the most recent send. The session's single-in-flight gate is what makes
//! that assumption hold.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;

use crate::connection::transport::{
    ConnectionEvent, ConnectionEventKind, EventSink, Transport,
};
use crate::connection::wire::{InboundReply, OutboundPayload, decode_reply};
use crate::core::error::{ChatError, NotReadyReason};

/// How long a released transport may take to finish its close handshake
/// before the task is aborted.
pub const CLOSE_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Failed,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "connected",
            ConnectionState::Closed => "closed",
            ConnectionState::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of feeding one event to the manager.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Opened,
    /// A decoded reply, or `MalformedReply` if the frame did not decode.
    Reply(Result<InboundReply, ChatError>),
    /// The peer closed the connection.
    Closed,
    /// The transport failed.
    Failed(String),
}

pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    url: String,
    events: UnboundedSender<ConnectionEvent>,
    state: ConnectionState,
    generation: u64,
    outbound: Option<UnboundedSender<String>>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Creates a manager in the `Closed` state. Nothing connects until `open()`.
    pub fn new(
        transport: Arc<dyn Transport>,
        url: impl Into<String>,
        events: UnboundedSender<ConnectionEvent>,
    ) -> Self {
        Self {
            transport,
            url: url.into(),
            events,
            state: ConnectionState::Closed,
            generation: 0,
            outbound: None,
            task: None,
        }
    }

    /// A new, unopened manager for the same endpoint and event channel.
    ///
    /// Generations keep counting from this manager's, so events still in
    /// flight from this connection are stale to the new one.
    pub fn fresh(&self) -> Self {
        let mut next = Self::new(self.transport.clone(), self.url.clone(), self.events.clone());
        next.generation = self.generation;
        next
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start connecting. No-op while `Connecting` or `Open`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&mut self) {
        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Open) {
            debug!("open() ignored: already {}", self.state);
            return;
        }
        self.release();

        self.generation += 1;
        self.state = ConnectionState::Connecting;
        info!(
            "Opening {} connection to {} (generation {})",
            self.transport.name(),
            self.url,
            self.generation
        );

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let sink = EventSink::new(self.generation, self.events.clone());
        let transport = self.transport.clone();
        let url = self.url.clone();

        let task = tokio::spawn(async move {
            let kind = match transport.run(&url, outbound_rx, sink.clone()).await {
                Ok(()) => ConnectionEventKind::Closed,
                Err(e) => {
                    warn!("Transport error: {}", e);
                    ConnectionEventKind::Failed(e.to_string())
                }
            };
            if !sink.emit(kind) {
                debug!("Terminal event dropped: event loop gone");
            }
        });

        self.outbound = Some(outbound_tx);
        self.task = Some(task);
    }

    /// Queue a payload for transmission. Returns without waiting for a reply.
    pub fn send(&mut self, payload: &OutboundPayload) -> Result<(), ChatError> {
        if self.state != ConnectionState::Open {
            return Err(ChatError::NotReady(NotReadyReason::Disconnected));
        }
        let frame = payload.to_json()?;
        let Some(outbound) = self.outbound.as_ref() else {
            return Err(ChatError::NotReady(NotReadyReason::Disconnected));
        };
        outbound
            .send(frame)
            .map_err(|_| ChatError::NotReady(NotReadyReason::Disconnected))?;
        debug!("Queued payload ({} chars of message)", payload.message().len());
        Ok(())
    }

    /// Apply one transport event. Returns `None` for events that no longer
    /// matter: stale generations and anything after a terminal state.
    pub fn handle_event(&mut self, event: ConnectionEvent) -> Option<Inbound> {
        if event.generation != self.generation {
            debug!(
                "Dropping event from generation {} (current {})",
                event.generation, self.generation
            );
            return None;
        }
        if self.state.is_terminal() {
            debug!("Dropping {:?} after connection {}", event.kind, self.state);
            return None;
        }

        match event.kind {
            ConnectionEventKind::Opened => {
                if self.state != ConnectionState::Connecting {
                    return None;
                }
                info!("Connection open");
                self.state = ConnectionState::Open;
                Some(Inbound::Opened)
            }
            ConnectionEventKind::Frame(raw) => {
                if self.state != ConnectionState::Open {
                    warn!("Frame received while {}, ignored", self.state);
                    return None;
                }
                let reply = decode_reply(&raw);
                if let Err(ref e) = reply {
                    warn!("{} ({} bytes)", e, raw.len());
                }
                Some(Inbound::Reply(reply))
            }
            ConnectionEventKind::Closed => {
                info!("Connection closed by peer");
                self.state = ConnectionState::Closed;
                self.release();
                Some(Inbound::Closed)
            }
            ConnectionEventKind::Failed(reason) => {
                warn!("Connection failed: {}", reason);
                self.state = ConnectionState::Failed;
                self.release();
                Some(Inbound::Failed(reason))
            }
        }
    }

    /// Release the transport. Safe to call any number of times, or never-opened.
    pub fn close(&mut self) {
        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Open) {
            info!("Closing connection (generation {})", self.generation);
            self.state = ConnectionState::Closed;
        }
        self.release();
    }

    fn release(&mut self) {
        // Without a sender the transport sends its close frame and returns.
        self.outbound = None;
        let Some(mut task) = self.task.take() else {
            return;
        };
        if task.is_finished() {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                        debug!("Transport still running after {:?}, aborting", CLOSE_GRACE);
                        task.abort();
                    }
                });
            }
            Err(_) => task.abort(),
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compose::compose;
    use crate::core::llm_config::LlmConfig;
    use crate::test_support::{Script, ScriptedTransport, next_event};

    fn payload(text: &str) -> OutboundPayload {
        compose(text, &LlmConfig::default()).unwrap()
    }

    fn manager_with(
        transport: ScriptedTransport,
    ) -> (ConnectionManager, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionManager::new(Arc::new(transport), "ws://test", tx), rx)
    }

    #[test]
    fn test_new_manager_is_closed_and_cannot_send() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut manager =
            ConnectionManager::new(Arc::new(ScriptedTransport::silent()), "ws://test", tx);
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert_eq!(
            manager.send(&payload("hi")),
            Err(ChatError::NotReady(NotReadyReason::Disconnected))
        );
    }

    #[test]
    fn test_close_without_open_is_harmless() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut manager =
            ConnectionManager::new(Arc::new(ScriptedTransport::silent()), "ws://test", tx);
        manager.close();
        manager.close();
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_open_transitions_to_open() {
        let (mut manager, mut rx) = manager_with(ScriptedTransport::silent());
        manager.open();
        assert_eq!(manager.state(), ConnectionState::Connecting);

        let event = next_event(&mut rx).await;
        assert_eq!(manager.handle_event(event), Some(Inbound::Opened));
        assert_eq!(manager.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let transport = ScriptedTransport::silent();
        let connects = transport.connect_count();
        let (mut manager, mut rx) = manager_with(transport);

        manager.open();
        manager.open();
        let generation = manager.generation();
        let event = next_event(&mut rx).await;
        manager.handle_event(event);
        manager.open();

        assert_eq!(manager.generation(), generation);
        tokio::task::yield_now().await;
        assert_eq!(connects.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_transitions_to_failed() {
        let (mut manager, mut rx) = manager_with(ScriptedTransport::refusing("connection refused"));
        manager.open();

        let event = next_event(&mut rx).await;
        match manager.handle_event(event) {
            Some(Inbound::Failed(reason)) => assert!(reason.contains("connection refused")),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert_eq!(manager.state(), ConnectionState::Failed);
        assert!(manager.send(&payload("hi")).is_err());
    }

    #[tokio::test]
    async fn test_send_then_reply_in_order() {
        let (mut manager, mut rx) = manager_with(ScriptedTransport::new(vec![
            Script::Reply(r#"{"content":"first"}"#.to_string()),
            Script::Reply(r#"{"content":"second"}"#.to_string()),
        ]));
        manager.open();
        let opened = next_event(&mut rx).await;
        manager.handle_event(opened);

        manager.send(&payload("one")).unwrap();
        manager.send(&payload("two")).unwrap();

        let first = next_event(&mut rx).await;
        let second = next_event(&mut rx).await;
        assert_eq!(
            manager.handle_event(first),
            Some(Inbound::Reply(Ok(InboundReply { content: "first".into() })))
        );
        assert_eq!(
            manager.handle_event(second),
            Some(Inbound::Reply(Ok(InboundReply { content: "second".into() })))
        );
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_connection_open() {
        let (mut manager, mut rx) =
            manager_with(ScriptedTransport::new(vec![Script::Reply("not json".to_string())]));
        manager.open();
        let opened = next_event(&mut rx).await;
        manager.handle_event(opened);
        manager.send(&payload("hi")).unwrap();

        let event = next_event(&mut rx).await;
        assert!(matches!(
            manager.handle_event(event),
            Some(Inbound::Reply(Err(ChatError::MalformedReply(_))))
        ));
        assert_eq!(manager.state(), ConnectionState::Open);
        assert!(manager.send(&payload("again")).is_ok());
    }

    #[tokio::test]
    async fn test_peer_close_blocks_further_sends() {
        let (mut manager, mut rx) = manager_with(ScriptedTransport::new(vec![Script::Hangup]));
        manager.open();
        let opened = next_event(&mut rx).await;
        manager.handle_event(opened);
        manager.send(&payload("hi")).unwrap();

        let event = next_event(&mut rx).await;
        assert_eq!(manager.handle_event(event), Some(Inbound::Closed));
        assert_eq!(manager.state(), ConnectionState::Closed);
        assert_eq!(
            manager.send(&payload("again")),
            Err(ChatError::NotReady(NotReadyReason::Disconnected))
        );
    }

    #[tokio::test]
    async fn test_close_twice_matches_close_once() {
        let (mut manager, mut rx) = manager_with(ScriptedTransport::silent());
        manager.open();
        let opened = next_event(&mut rx).await;
        manager.handle_event(opened);

        manager.close();
        let after_first = manager.state();
        manager.close();
        assert_eq!(manager.state(), after_first);
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_events_after_close_are_ignored() {
        let (mut manager, _rx) = manager_with(ScriptedTransport::silent());
        manager.open();
        let generation = manager.generation();
        manager.close();

        let late = ConnectionEvent {
            generation,
            kind: ConnectionEventKind::Frame(r#"{"content":"late"}"#.to_string()),
        };
        assert_eq!(manager.handle_event(late), None);
        let late_failure = ConnectionEvent {
            generation,
            kind: ConnectionEventKind::Failed("aborted".to_string()),
        };
        assert_eq!(manager.handle_event(late_failure), None);
        assert_eq!(manager.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_stale_generation_is_ignored() {
        let (mut manager, _rx) = manager_with(ScriptedTransport::silent());
        manager.open();
        let stale = ConnectionEvent {
            generation: manager.generation() + 7,
            kind: ConnectionEventKind::Opened,
        };
        assert_eq!(manager.handle_event(stale), None);
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_fresh_manager_ignores_previous_connection() {
        let (mut old, mut rx) = manager_with(ScriptedTransport::silent());
        old.open();
        let opened = next_event(&mut rx).await;
        old.handle_event(opened.clone());

        let mut next = old.fresh();
        old.close();
        next.open();
        assert!(next.generation() > opened.generation);
        assert_eq!(next.handle_event(opened), None);
        assert_eq!(next.state(), ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_close_releases_transport() {
        let transport = ScriptedTransport::silent();
        let live = transport.live_count();
        let (mut manager, mut rx) = manager_with(transport);
        manager.open();
        let opened = next_event(&mut rx).await;
        manager.handle_event(opened);
        assert_eq!(live.load(std::sync::atomic::Ordering::SeqCst), 1);

        manager.close();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(live.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_close_lets_transport_finish_cleanly() {
        let transport = ScriptedTransport::silent();
        let clean_exits = transport.clean_exit_count();
        let (mut manager, mut rx) = manager_with(transport);
        manager.open();
        let opened = next_event(&mut rx).await;
        manager.handle_event(opened);

        manager.close();
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(clean_exits.load(std::sync::atomic::Ordering::SeqCst), 1);

        // The transport's own Closed event arrives afterwards and is ignored.
        let closed = next_event(&mut rx).await;
        assert_eq!(closed.kind, ConnectionEventKind::Closed);
        assert_eq!(manager.handle_event(closed), None);
    }
}
